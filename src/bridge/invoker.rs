//! Capability invokers: one per way of reaching a runtime.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{json, Value};
use thiserror::Error;

use crate::adapters::TransportDescriptor;
use crate::capabilities::{normalize, Capability};
use crate::discovery::DiscoveredAgent;
use crate::mcp::{McpClient, McpError};

/// Header carrying a per-invocation correlation id on HTTP calls.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("no transport declared for agent '{0}'")]
    NoTransport(String),

    /// The runtime is reachable but not through this invoker.
    #[error("unsupported transport {0}")]
    UnsupportedTransport(String),

    #[error("{0}")]
    Mcp(#[from] McpError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("runtime answered HTTP {status}: {body}")]
    Remote { status: u16, body: String },

    /// The tool ran and reported failure.
    #[error("tool '{tool}' reported an error: {message}")]
    ToolFailed { tool: String, message: String },
}

/// Executes one capability call against an agent's runtime.
///
/// Implementations own transport concerns only; the caller enforces the
/// overall timeout and builds the result envelope.
#[async_trait]
pub trait CapabilityInvoker: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &'static str;

    async fn invoke(
        &self,
        agent: &DiscoveredAgent,
        capability: &Capability,
        input: &Value,
        timeout: Duration,
    ) -> Result<Value, InvokeError>;
}

// ---------------------------------------------------------------------------
// MCP
// ---------------------------------------------------------------------------

/// Opens an MCP session on the agent's endpoint and issues `tools/call`.
#[derive(Debug, Default)]
pub struct McpInvoker;

impl McpInvoker {
    /// Name to call: the raw capability name if the server lists it,
    /// otherwise its normalized form.
    fn tool_name(capability: &Capability, listed: &[String]) -> String {
        if listed.iter().any(|n| n == &capability.name) {
            return capability.name.clone();
        }
        if listed.iter().any(|n| n == capability.id()) {
            return capability.id().to_string();
        }
        normalize(&capability.name)
    }
}

#[async_trait]
impl CapabilityInvoker for McpInvoker {
    fn name(&self) -> &'static str {
        "mcp"
    }

    async fn invoke(
        &self,
        agent: &DiscoveredAgent,
        capability: &Capability,
        input: &Value,
        timeout: Duration,
    ) -> Result<Value, InvokeError> {
        let endpoint = agent
            .endpoint
            .as_ref()
            .ok_or_else(|| InvokeError::NoTransport(agent.id.clone()))?;
        let client = McpClient::connect(endpoint, timeout).await?;

        let listed: Vec<String> = match client.list_tools().await {
            Ok(tools) => tools.into_iter().map(|t| t.name).collect(),
            Err(e) => {
                log::debug!("tools/list on {} failed: {}", client.server_identifier(), e);
                Vec::new()
            }
        };
        let tool = Self::tool_name(capability, &listed);

        let outcome = client.call_tool(&tool, input).await;
        if let Err(e) = client.close().await {
            log::debug!("Closing MCP session for '{}' failed: {}", agent.id, e);
        }

        let outcome = outcome?;
        if outcome.is_error {
            return Err(InvokeError::ToolFailed {
                tool,
                message: outcome.text(),
            });
        }
        Ok(outcome.into_value())
    }
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// POSTs `{capability, input}` to the agent's network endpoint. The
/// caller's timeout bounds the whole call.
#[derive(Debug, Clone, Default)]
pub struct HttpInvoker {
    client: reqwest::Client,
}

impl HttpInvoker {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CapabilityInvoker for HttpInvoker {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn invoke(
        &self,
        agent: &DiscoveredAgent,
        capability: &Capability,
        input: &Value,
        _timeout: Duration,
    ) -> Result<Value, InvokeError> {
        let (url, headers) = match &agent.endpoint {
            Some(TransportDescriptor::Network { url, headers, .. }) => (url, headers),
            Some(other) => return Err(InvokeError::UnsupportedTransport(other.to_string())),
            None => return Err(InvokeError::NoTransport(agent.id.clone())),
        };

        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                (Ok(name), Ok(value)) => {
                    header_map.insert(name, value);
                }
                _ => log::warn!("Skipping invalid header '{}' for agent '{}'", name, agent.id),
            }
        }

        let request_id = uuid::Uuid::new_v4().to_string();
        let response = self
            .client
            .post(url)
            .headers(header_map)
            .header(REQUEST_ID_HEADER, &request_id)
            .json(&json!({ "capability": capability.id(), "input": input }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(InvokeError::Remote {
                status: status.as_u16(),
                body,
            });
        }

        log::debug!("HTTP invocation {} answered {}", request_id, status);
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }
}

// ---------------------------------------------------------------------------
// Echo
// ---------------------------------------------------------------------------

/// Fallback for agents whose format is unknown. Nothing is executed: the
/// input comes back with `fallback: true` so callers can tell.
#[derive(Debug, Default)]
pub struct EchoExecutor;

#[async_trait]
impl CapabilityInvoker for EchoExecutor {
    fn name(&self) -> &'static str {
        "echo"
    }

    async fn invoke(
        &self,
        agent: &DiscoveredAgent,
        capability: &Capability,
        input: &Value,
        _timeout: Duration,
    ) -> Result<Value, InvokeError> {
        Ok(json!({
            "echo": input,
            "capability": capability.id(),
            "agent": agent.id,
            "fallback": true,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_name_selection() {
        let cap = Capability::new("web-search", "Web Search");
        assert_eq!(McpInvoker::tool_name(&cap, &["Web Search".into()]), "Web Search");
        assert_eq!(McpInvoker::tool_name(&cap, &["web-search".into()]), "web-search");
        assert_eq!(McpInvoker::tool_name(&cap, &[]), "web-search");

        let cap = Capability::new("lookup", "Lookup Record");
        assert_eq!(McpInvoker::tool_name(&cap, &["lookup".into()]), "lookup");
        assert_eq!(McpInvoker::tool_name(&cap, &["other".into()]), "lookup-record");
    }

    #[tokio::test]
    async fn test_http_invoker_rejects_stdio_endpoint() {
        let agent = DiscoveredAgent::new("a", "A", crate::discovery::AgentFormat::Ossa, "/a.yaml", 0.9)
            .with_endpoint(TransportDescriptor::stdio("server", vec![]));
        let err = HttpInvoker::default()
            .invoke(&agent, &Capability::new("x", "X"), &Value::Null, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, InvokeError::UnsupportedTransport(_)));
    }
}
