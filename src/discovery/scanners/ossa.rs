//! OSSA manifest scanner.
//!
//! Recognises YAML/JSON documents of the form:
//!
//! ```yaml
//! apiVersion: ossa/v0.3.0
//! kind: Agent
//! metadata:
//!   name: research-agent
//!   version: 1.2.0
//!   labels: { team: research }
//! spec:
//!   role: Finds and summarises sources
//!   llm: { provider: openai, model: gpt-4o }
//!   capabilities:
//!     - name: Web Search
//!       description: Search the public web
//!   tools:
//!     - type: mcp
//!       name: filesystem
//!       server: fs-server
//! runtime:
//!   endpoint: https://agents.example.com/research
//! ```

use async_trait::async_trait;
use serde_json::Value;

use super::{agent_id, capability_from_value, parse_structured, string_list, string_map, FormatScanner};
use crate::adapters::TransportDescriptor;
use crate::discovery::agent::{AgentFormat, DiscoveredAgent};
use crate::discovery::context::{ScanContext, SourceFile};
use crate::discovery::error::DiscoveryError;

const API_VERSION_PREFIX: &str = "ossa/";
const MANIFEST_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

pub struct OssaManifestScanner {
    confidence: f64,
}

impl OssaManifestScanner {
    pub fn new(confidence: f64) -> Self {
        Self { confidence }
    }

    fn parse_manifest(&self, file: &SourceFile, doc: &Value) -> Option<DiscoveredAgent> {
        let api_version = doc.get("apiVersion").and_then(Value::as_str)?;
        if !api_version.starts_with(API_VERSION_PREFIX) {
            return None;
        }
        let kind = doc.get("kind").and_then(Value::as_str).unwrap_or("Agent");
        if kind != "Agent" {
            log::debug!("Skipping OSSA {} manifest {}", kind, file.path.display());
            return None;
        }

        let metadata = doc.get("metadata");
        let spec = doc.get("spec");
        let name = metadata.and_then(|m| m.get("name")).and_then(Value::as_str);
        let id = agent_id(name, file);

        let mut agent = DiscoveredAgent::new(
            id.clone(),
            name.unwrap_or(&id),
            AgentFormat::Ossa,
            file.path.clone(),
            self.confidence,
        )
        .with_metadata("api_version", Value::String(api_version.to_string()))
        .with_metadata("kind", Value::String(kind.to_string()));

        if let Some(meta) = metadata {
            for key in ["version", "description"] {
                if let Some(v) = meta.get(key).filter(|v| !v.is_null()) {
                    agent = agent.with_metadata(key, v.clone());
                }
            }
            if let Some(labels) = meta.get("labels").and_then(Value::as_object) {
                for (k, v) in labels {
                    if let Some(v) = v.as_str() {
                        agent = agent.with_tag(format!("{k}={v}"));
                    }
                }
                agent = agent.with_metadata("labels", Value::Object(labels.clone()));
            }
            agent = add_tag_list(agent, meta.get("tags"));
        }

        if let Some(spec) = spec {
            for key in ["role", "goal", "backstory", "llm"] {
                if let Some(v) = spec.get(key).filter(|v| !v.is_null()) {
                    agent = agent.with_metadata(key, v.clone());
                }
            }
            agent = add_tag_list(agent, spec.get("tags"));

            for entry in spec.get("capabilities").and_then(Value::as_array).into_iter().flatten() {
                if let Some(cap) = capability_from_value(entry) {
                    agent.push_capability(cap);
                }
            }
            for tool in spec.get("tools").and_then(Value::as_array).into_iter().flatten() {
                if let Some(mut cap) = capability_from_value(tool) {
                    for key in ["type", "server", "namespace"] {
                        if let Some(v) = tool.get(key).and_then(Value::as_str) {
                            cap = cap.with_metadata(format!("tool_{key}"), Value::String(v.to_string()));
                        }
                    }
                    agent.push_capability(cap);
                }
            }
        }

        agent.endpoint = runtime_endpoint(doc).or_else(|| tool_endpoint(spec));
        Some(agent)
    }
}

fn add_tag_list(mut agent: DiscoveredAgent, tags: Option<&Value>) -> DiscoveredAgent {
    for tag in tags.and_then(Value::as_array).into_iter().flatten() {
        if let Some(tag) = tag.as_str() {
            agent = agent.with_tag(tag);
        }
    }
    agent
}

/// `runtime.endpoint` (URL) or `runtime.command` + `runtime.args`.
fn runtime_endpoint(doc: &Value) -> Option<TransportDescriptor> {
    let runtime = doc.get("runtime")?;
    if let Some(url) = runtime.get("endpoint").and_then(Value::as_str) {
        return Some(TransportDescriptor::Network {
            url: url.to_string(),
            headers: string_map(runtime.get("headers")),
            timeout_ms: runtime.get("timeout_ms").and_then(Value::as_u64),
        });
    }
    let command = runtime.get("command").and_then(Value::as_str)?;
    Some(TransportDescriptor::Stdio {
        command: command.to_string(),
        args: string_list(runtime.get("args")),
        env: string_map(runtime.get("env")),
    })
}

fn tool_endpoint(spec: Option<&Value>) -> Option<TransportDescriptor> {
    spec?
        .get("tools")?
        .as_array()?
        .iter()
        .find_map(|t| t.get("endpoint").and_then(Value::as_str))
        .map(TransportDescriptor::network)
}

#[async_trait]
impl FormatScanner for OssaManifestScanner {
    fn name(&self) -> &str {
        "ossa-manifest"
    }

    fn format(&self) -> AgentFormat {
        AgentFormat::Ossa
    }

    async fn scan(&self, ctx: &ScanContext) -> Result<Vec<DiscoveredAgent>, DiscoveryError> {
        let mut agents = Vec::new();
        for file in ctx.files_with_extensions(MANIFEST_EXTENSIONS) {
            if ctx.is_aborted() {
                break;
            }
            let Some(content) = ctx.read(file).await else {
                continue;
            };
            if !content.contains(API_VERSION_PREFIX) {
                continue;
            }
            match parse_structured(file, &content) {
                Ok(doc) => {
                    if let Some(agent) = self.parse_manifest(file, &doc) {
                        log::debug!(
                            "OSSA manifest {} -> agent '{}' ({} capabilities)",
                            file.path.display(),
                            agent.id,
                            agent.capabilities.len()
                        );
                        agents.push(agent);
                    }
                }
                Err(e) => log::warn!("Skipping malformed manifest {}: {}", file.path.display(), e),
            }
        }
        Ok(agents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DiscoveryConfig;
    use crate::discovery::context::AbortSignal;
    use std::fs;

    const MANIFEST: &str = r#"
apiVersion: ossa/v0.3.0
kind: Agent
metadata:
  name: Research Agent
  version: 1.2.0
  labels:
    team: research
  tags: [search]
spec:
  role: Finds and summarises sources
  llm:
    provider: openai
    model: gpt-4o
  capabilities:
    - name: Web Search
      description: Search the public web
      input_schema:
        type: object
        properties:
          query: { type: string }
  tools:
    - type: mcp
      name: filesystem
      server: fs-server
runtime:
  endpoint: https://agents.example.com/research
  timeout_ms: 2000
"#;

    async fn scan_dir(dir: &std::path::Path) -> Vec<DiscoveredAgent> {
        let ctx = ScanContext::build(dir, &DiscoveryConfig::default(), AbortSignal::new())
            .await
            .unwrap();
        OssaManifestScanner::new(0.9).scan(&ctx).await.unwrap()
    }

    #[tokio::test]
    async fn test_file_removed_after_walk_keeps_other_agents() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.yaml"), MANIFEST).unwrap();
        fs::write(dir.path().join("b.yaml"), MANIFEST.replace("Research Agent", "Writer")).unwrap();
        let ctx = ScanContext::build(dir.path(), &DiscoveryConfig::default(), AbortSignal::new())
            .await
            .unwrap();
        fs::remove_file(dir.path().join("b.yaml")).unwrap();

        let agents = OssaManifestScanner::new(0.9).scan(&ctx).await.unwrap();
        assert_eq!(agents.len(), 1);
        assert!(agents[0].source_path.ends_with("a.yaml"));
    }

    #[tokio::test]
    async fn test_scan_manifest() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("agent.ossa.yaml"), MANIFEST).unwrap();

        let agents = scan_dir(dir.path()).await;
        assert_eq!(agents.len(), 1);
        let agent = &agents[0];
        assert_eq!(agent.id, "research-agent");
        assert_eq!(agent.name, "Research Agent");
        assert_eq!(agent.confidence, 0.9);
        assert!(agent.tags.contains("ossa"));
        assert!(agent.tags.contains("team=research"));
        assert!(agent.tags.contains("search"));
        assert_eq!(agent.metadata_str("role"), Some("Finds and summarises sources"));

        let ids: Vec<&str> = agent.capabilities.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["web-search", "filesystem"]);
        assert_eq!(agent.capabilities[0].input_properties(), vec!["query"]);
        assert_eq!(
            agent.capabilities[1].metadata.get("tool_server"),
            Some(&Value::String("fs-server".into()))
        );

        match agent.endpoint.as_ref().unwrap() {
            TransportDescriptor::Network { url, timeout_ms, .. } => {
                assert_eq!(url, "https://agents.example.com/research");
                assert_eq!(*timeout_ms, Some(2000));
            }
            other => panic!("unexpected endpoint {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_skips_non_ossa_and_malformed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("compose.yaml"), "services: {}\n").unwrap();
        fs::write(dir.path().join("broken.yaml"), "apiVersion: ossa/v1\nmetadata: {name: broken\n").unwrap();
        fs::write(
            dir.path().join("task.yaml"),
            "apiVersion: ossa/v0.3.0\nkind: Task\nmetadata: { name: t }\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("agent.json"),
            r#"{"apiVersion": "ossa/v0.2.0", "kind": "Agent", "metadata": {"name": "json-agent"}}"#,
        )
        .unwrap();

        let agents = scan_dir(dir.path()).await;
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].id, "json-agent");
        assert!(agents[0].endpoint.is_none());
    }
}
