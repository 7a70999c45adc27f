//! MCP client configuration scanner (`mcp.json`, `claude_desktop_config.json`, ...).
//!
//! One agent per entry under `mcpServers`. An entry with `command` becomes a
//! stdio endpoint; one with `url` becomes a network endpoint. A `tools` array
//! on the entry, when present, lists the server's capabilities.

use async_trait::async_trait;
use serde_json::Value;

use super::{capability_from_value, string_list, string_map, FormatScanner};
use crate::adapters::TransportDescriptor;
use crate::capabilities::normalize;
use crate::discovery::agent::{AgentFormat, DiscoveredAgent};
use crate::discovery::context::{ScanContext, SourceFile};
use crate::discovery::error::DiscoveryError;

const CONFIG_FILE_NAMES: &[&str] = &[
    "mcp.json",
    ".mcp.json",
    "mcp-config.json",
    "claude_desktop_config.json",
];

pub struct McpConfigScanner {
    confidence: f64,
}

impl McpConfigScanner {
    pub fn new(confidence: f64) -> Self {
        Self { confidence }
    }

    fn is_config_file(file: &SourceFile) -> bool {
        let name = file.file_name();
        CONFIG_FILE_NAMES.contains(&name) || name.ends_with(".mcp.json")
    }

    fn parse_config(&self, file: &SourceFile, doc: &Value) -> Vec<DiscoveredAgent> {
        let Some(servers) = doc
            .get("mcpServers")
            .or_else(|| doc.get("servers"))
            .and_then(Value::as_object)
        else {
            return Vec::new();
        };

        let mut agents = Vec::new();
        for (server_name, server) in servers {
            let id = normalize(server_name);
            if id.is_empty() {
                log::warn!("Skipping unnamed MCP server in {}", file.path.display());
                continue;
            }
            let Some(endpoint) = server_endpoint(server) else {
                log::warn!(
                    "MCP server '{}' in {} has neither command nor url",
                    server_name,
                    file.path.display()
                );
                continue;
            };

            let mut agent = DiscoveredAgent::new(
                id,
                server_name.clone(),
                AgentFormat::Mcp,
                file.path.clone(),
                self.confidence,
            )
            .with_endpoint(endpoint)
            .with_metadata("server_name", Value::String(server_name.clone()));

            if let Some(description) = server.get("description").and_then(Value::as_str) {
                agent = agent.with_metadata("description", Value::String(description.to_string()));
            }
            if server.get("disabled").and_then(Value::as_bool).unwrap_or(false) {
                agent = agent.with_tag("disabled");
            }
            for entry in server.get("tools").and_then(Value::as_array).into_iter().flatten() {
                if let Some(cap) = capability_from_value(entry) {
                    agent.push_capability(cap);
                }
            }
            agents.push(agent);
        }
        agents
    }
}

fn server_endpoint(server: &Value) -> Option<TransportDescriptor> {
    if let Some(command) = server.get("command").and_then(Value::as_str) {
        return Some(TransportDescriptor::Stdio {
            command: command.to_string(),
            args: string_list(server.get("args")),
            env: string_map(server.get("env")),
        });
    }
    let url = server.get("url").and_then(Value::as_str)?;
    Some(TransportDescriptor::Network {
        url: url.to_string(),
        headers: string_map(server.get("headers")),
        timeout_ms: server
            .get("timeout_ms")
            .or_else(|| server.get("timeout"))
            .and_then(Value::as_u64),
    })
}

#[async_trait]
impl FormatScanner for McpConfigScanner {
    fn name(&self) -> &str {
        "mcp-config"
    }

    fn format(&self) -> AgentFormat {
        AgentFormat::Mcp
    }

    async fn scan(&self, ctx: &ScanContext) -> Result<Vec<DiscoveredAgent>, DiscoveryError> {
        let mut agents = Vec::new();
        for file in ctx.files.iter().filter(|f| Self::is_config_file(f)) {
            if ctx.is_aborted() {
                break;
            }
            let Some(content) = ctx.read(file).await else {
                continue;
            };
            match serde_json::from_str::<Value>(&content) {
                Ok(doc) => agents.extend(self.parse_config(file, &doc)),
                Err(e) => log::warn!("Skipping malformed MCP config {}: {}", file.path.display(), e),
            }
        }
        Ok(agents)
    }
}
