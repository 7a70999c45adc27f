//! Items the registry can hold.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use super::error::RegistryError;
use crate::adapters::{build_server_config, capability_to_tool, AdapterError, ServerConfig, ToolSpec, TransportDescriptor};
use crate::capabilities::{namespaced_name, ResourceRef};
use crate::discovery::DiscoveredAgent;

/// What the registry needs to know about an item to index and filter it.
pub trait RegistryItem: Clone + Send + Sync + 'static {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn tags(&self) -> &BTreeSet<String>;

    /// Certainty that the item is what it claims to be. Explicit
    /// registrations are fully certain.
    fn confidence(&self) -> f64 {
        1.0
    }

    /// File the item was discovered in, if any.
    fn source_path(&self) -> Option<&Path> {
        None
    }
}

impl RegistryItem for DiscoveredAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    fn confidence(&self) -> f64 {
        self.confidence
    }

    fn source_path(&self) -> Option<&Path> {
        Some(&self.source_path)
    }
}

/// A protocol server exposed through the bridge.
///
/// `id` is the content hash produced by [`build_server_config`], so
/// registering the same configuration twice yields the same record id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub endpoints: TransportDescriptor,
    #[serde(default)]
    pub tools: Vec<ToolSpec>,
    #[serde(default)]
    pub resources: Vec<ResourceRef>,
    pub agent_id: String,
}

impl RegistryRecord {
    pub fn from_server_config(
        name: impl Into<String>,
        tags: BTreeSet<String>,
        config: ServerConfig,
    ) -> Self {
        Self {
            id: config.id,
            name: name.into(),
            tags,
            endpoints: config.transport,
            tools: config.tools,
            resources: config.resources,
            agent_id: config.agent_id,
        }
    }

    /// Build a record from a discovered agent.
    ///
    /// Tool names are flattened to `prefix.agent.capability` so records from
    /// different agents can share one tool namespace. The agent must declare
    /// an endpoint.
    pub fn from_discovered(agent: &DiscoveredAgent, prefix: &str) -> Result<Self, RegistryError> {
        let transport = agent
            .endpoint
            .clone()
            .ok_or(AdapterError::MissingField("endpoint"))?;

        let mut tools = Vec::with_capacity(agent.capabilities.len());
        for capability in &agent.capabilities {
            let mut tool = capability_to_tool(capability)?;
            tool.name = namespaced_name(prefix, &agent.id, &tool.name)?;
            tools.push(tool);
        }

        let config = build_server_config(&agent.id, &tools, &[], &transport)?;
        Ok(Self::from_server_config(agent.name.clone(), agent.tags.clone(), config))
    }
}

impl RegistryItem for RegistryRecord {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::Capability;
    use crate::discovery::AgentFormat;

    fn agent() -> DiscoveredAgent {
        DiscoveredAgent::new("research", "Research", AgentFormat::Mcp, "/p/mcp.json", 0.8)
            .with_capability(Capability::new("search", "Web Search").with_description("Search"))
            .with_endpoint(TransportDescriptor::stdio("research-server", vec![]))
    }

    #[test]
    fn test_from_discovered_namespaces_tools() {
        let record = RegistryRecord::from_discovered(&agent(), "ossa").unwrap();
        assert!(record.id.starts_with("srv-"));
        assert_eq!(record.agent_id, "research");
        assert_eq!(record.tools[0].name, "ossa.research.web-search");
        assert!(record.tags.contains("mcp"));

        let again = RegistryRecord::from_discovered(&agent(), "ossa").unwrap();
        assert_eq!(record.id, again.id);
    }

    #[test]
    fn test_from_discovered_requires_endpoint() {
        let mut a = agent();
        a.endpoint = None;
        assert!(matches!(
            RegistryRecord::from_discovered(&a, "ossa"),
            Err(RegistryError::Adapter(AdapterError::MissingField("endpoint")))
        ));
    }
}
