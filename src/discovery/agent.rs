//! Discovered agents and the source formats they come from.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use crate::adapters::TransportDescriptor;
use crate::capabilities::{normalize, Capability};

/// Source ecosystem an agent definition was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentFormat {
    Ossa,
    Mcp,
    LangChain,
    CrewAi,
    OpenAi,
    /// Matched only by the filename heuristic.
    Unknown,
}

impl AgentFormat {
    pub const ALL: [AgentFormat; 6] = [
        AgentFormat::Ossa,
        AgentFormat::Mcp,
        AgentFormat::LangChain,
        AgentFormat::CrewAi,
        AgentFormat::OpenAi,
        AgentFormat::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentFormat::Ossa => "ossa",
            AgentFormat::Mcp => "mcp",
            AgentFormat::LangChain => "langchain",
            AgentFormat::CrewAi => "crewai",
            AgentFormat::OpenAi => "openai",
            AgentFormat::Unknown => "unknown",
        }
    }
}

impl fmt::Display for AgentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One candidate agent definition produced by a discovery pass.
///
/// Snapshots are immutable in practice: the next pass produces new values and
/// the registry merges access statistics onto them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredAgent {
    pub id: String,
    pub name: String,
    pub format: AgentFormat,
    pub source_path: PathBuf,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
    /// Certainty of the discovery method, 0.0 to 1.0.
    pub confidence: f64,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// How to reach the agent's runtime, when the source declares it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<TransportDescriptor>,
    /// Always contains the format name.
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl DiscoveredAgent {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        format: AgentFormat,
        source_path: impl Into<PathBuf>,
        confidence: f64,
    ) -> Self {
        let mut tags = BTreeSet::new();
        tags.insert(format.as_str().to_string());
        Self {
            id: id.into(),
            name: name.into(),
            format,
            source_path: source_path.into(),
            capabilities: Vec::new(),
            confidence: confidence.clamp(0.0, 1.0),
            metadata: Map::new(),
            endpoint: None,
            tags,
        }
    }

    /// Add a capability unless one with the same id is already present.
    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.push_capability(capability);
        self
    }

    pub fn push_capability(&mut self, capability: Capability) {
        if self.capabilities.iter().all(|c| c.id() != capability.id()) {
            self.capabilities.push(capability);
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn with_endpoint(mut self, endpoint: TransportDescriptor) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if !tag.is_empty() {
            self.tags.insert(tag);
        }
        self
    }

    /// Metadata value as a string, if present and a string.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    /// Look a capability up by id, display name, or normalized name.
    pub fn find_capability(&self, key: &str) -> Option<&Capability> {
        self.capabilities
            .iter()
            .find(|c| c.id() == key || c.name == key)
            .or_else(|| {
                let wanted = normalize(key);
                self.capabilities
                    .iter()
                    .find(|c| normalize(c.id()) == wanted || normalize(&c.name) == wanted)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_agent_carries_format_tag_and_clamps() {
        let agent = DiscoveredAgent::new("a", "A", AgentFormat::CrewAi, "agents.yaml", 1.7);
        assert!(agent.tags.contains("crewai"));
        assert_eq!(agent.confidence, 1.0);
    }

    #[test]
    fn test_capabilities_deduplicated_by_id() {
        let agent = DiscoveredAgent::new("a", "A", AgentFormat::Ossa, "x.yaml", 0.9)
            .with_capability(Capability::new("search", "Search"))
            .with_capability(Capability::new("search", "Search Again"));
        assert_eq!(agent.capabilities.len(), 1);
        assert_eq!(agent.capabilities[0].name, "Search");
    }

    #[test]
    fn test_find_capability_by_any_name() {
        let agent = DiscoveredAgent::new("a", "A", AgentFormat::Ossa, "x.yaml", 0.9)
            .with_capability(Capability::new("summarize", "Summarize Document"));
        assert!(agent.find_capability("summarize").is_some());
        assert!(agent.find_capability("Summarize Document").is_some());
        assert!(agent.find_capability("summarize-document").is_some());
        assert!(agent.find_capability("translate").is_none());
    }

    #[test]
    fn test_format_serde_names() {
        assert_eq!(serde_json::to_value(AgentFormat::LangChain).unwrap(), "langchain");
        assert_eq!(serde_json::to_value(AgentFormat::OpenAi).unwrap(), "openai");
        for f in AgentFormat::ALL {
            assert_eq!(serde_json::to_value(f).unwrap(), f.as_str());
        }
    }
}
