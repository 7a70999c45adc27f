//! MCP client session.
//!
//! [`McpClient`] runs the `initialize` handshake over a transport and exposes
//! the typed list/call operations the bridge needs. Results land in the
//! adapter types so callers never handle raw protocol frames.
//!
//! No retry or caching here: the runtime bridge opens one session per
//! invocation and owns the timeout.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use super::error::McpError;
use super::transports::{connect_transport, McpTransport};
use crate::adapters::{tools_from_value, ProtocolPrompt, ProtocolResource, ToolSpec, TransportDescriptor};

/// Protocol revision sent in `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Upper bound on `nextCursor` pages followed by a single list call.
const MAX_PAGES: usize = 64;

// ---------------------------------------------------------------------------
// ToolCallOutcome
// ---------------------------------------------------------------------------

/// Decoded `tools/call` result.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallOutcome {
    pub content: Vec<Value>,
    pub is_error: bool,
    pub structured_content: Option<Value>,
}

impl ToolCallOutcome {
    fn from_result(result: Value) -> Self {
        let content = result
            .get("content")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let is_error = result
            .get("isError")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let structured_content = result.get("structuredContent").cloned();
        Self {
            content,
            is_error,
            structured_content,
        }
    }

    /// Text blocks joined with newlines.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|block| block.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Best value to hand back to a caller: structured content, else the
    /// joined text, else the raw content blocks.
    pub fn into_value(self) -> Value {
        if let Some(structured) = self.structured_content {
            return structured;
        }
        let text = self.text();
        if !text.is_empty() {
            return Value::String(text);
        }
        Value::Array(self.content)
    }
}

// ---------------------------------------------------------------------------
// McpClient
// ---------------------------------------------------------------------------

pub struct McpClient {
    transport: Box<dyn McpTransport>,
    server_info: Value,
}

impl std::fmt::Debug for McpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpClient")
            .field("server", &self.transport.server_identifier())
            .field("server_info", &self.server_info)
            .finish()
    }
}

impl McpClient {
    /// Open a transport for `descriptor` and run the handshake.
    pub async fn connect(descriptor: &TransportDescriptor, timeout: Duration) -> Result<Self, McpError> {
        let transport = connect_transport(descriptor, timeout).await?;
        Self::initialize(transport).await
    }

    /// Run the handshake over an already-open transport. The transport is
    /// closed if the handshake fails.
    pub async fn initialize(transport: Box<dyn McpTransport>) -> Result<Self, McpError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {"name": "ossa-bridge", "version": crate::VERSION},
        });

        let handshake = async {
            let result = transport.request("initialize", params).await?;
            transport.notify("notifications/initialized", json!({})).await?;
            Ok::<_, McpError>(result)
        }
        .await;

        match handshake {
            Ok(result) => {
                let server_info = result.get("serverInfo").cloned().unwrap_or(Value::Null);
                log::info!(
                    "MCP session established with {} ({})",
                    transport.server_identifier(),
                    server_info.get("name").and_then(Value::as_str).unwrap_or("unnamed")
                );
                Ok(Self {
                    transport,
                    server_info,
                })
            }
            Err(e) => {
                log::warn!("MCP handshake with {} failed: {}", transport.server_identifier(), e);
                let _ = transport.close().await;
                Err(e)
            }
        }
    }

    /// `serverInfo` from the handshake, or `null`.
    pub fn server_info(&self) -> &Value {
        &self.server_info
    }

    pub fn server_identifier(&self) -> String {
        self.transport.server_identifier()
    }

    // -----------------------------------------------------------------------
    // Listing
    // -----------------------------------------------------------------------

    pub async fn list_tools(&self) -> Result<Vec<ToolSpec>, McpError> {
        let items = self.list_paged("tools/list", "tools").await?;
        Ok(tools_from_value(&Value::Array(items)))
    }

    pub async fn list_resources(&self) -> Result<Vec<ProtocolResource>, McpError> {
        let items = self.list_paged("resources/list", "resources").await?;
        Ok(decode_each(items, "resource"))
    }

    pub async fn list_prompts(&self) -> Result<Vec<ProtocolPrompt>, McpError> {
        let items = self.list_paged("prompts/list", "prompts").await?;
        Ok(decode_each(items, "prompt"))
    }

    async fn list_paged(&self, method: &str, key: &str) -> Result<Vec<Value>, McpError> {
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let params = match &cursor {
                Some(c) => json!({ "cursor": c }),
                None => json!({}),
            };
            let mut result = self.transport.request(method, params).await?;

            match result.get_mut(key).map(Value::take) {
                Some(Value::Array(page)) => items.extend(page),
                Some(Value::Null) | None => {}
                Some(_) => {
                    return Err(McpError::protocol(format!("'{}' in {} result is not an array", key, method)))
                }
            }

            cursor = result
                .get("nextCursor")
                .and_then(Value::as_str)
                .map(str::to_string);
            if cursor.is_none() {
                return Ok(items);
            }
        }

        log::warn!("{} stopped after {} pages", method, MAX_PAGES);
        Ok(items)
    }

    // -----------------------------------------------------------------------
    // Invocation
    // -----------------------------------------------------------------------

    /// Invoke a tool. A tool-level failure comes back as
    /// `Ok(outcome)` with `is_error` set; only transport and protocol
    /// failures are `Err`.
    pub async fn call_tool(&self, name: &str, arguments: &Value) -> Result<ToolCallOutcome, McpError> {
        let arguments = match arguments {
            Value::Object(map) => Value::Object(clean_tool_arguments(map)),
            Value::Null => Value::Object(Map::new()),
            other => other.clone(),
        };
        let result = self
            .transport
            .request("tools/call", json!({ "name": name, "arguments": arguments }))
            .await?;
        Ok(ToolCallOutcome::from_result(result))
    }

    pub async fn close(self) -> Result<(), McpError> {
        self.transport.close().await
    }
}

fn decode_each<T: DeserializeOwned>(items: Vec<Value>, what: &str) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                log::debug!("Skipping malformed {} entry: {}", what, e);
                None
            }
        })
        .collect()
}

/// Drop `null` members recursively, then drop objects and arrays left empty
/// by that. Servers validating against a schema reject explicit nulls for
/// optional fields.
pub fn clean_tool_arguments(arguments: &Map<String, Value>) -> Map<String, Value> {
    let mut cleaned = Map::new();
    for (key, value) in arguments {
        if let Some(value) = clean_value(value) {
            cleaned.insert(key.clone(), value);
        }
    }
    cleaned
}

fn clean_value(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => {
            let nested = clean_tool_arguments(map);
            (!nested.is_empty() || map.is_empty()).then_some(Value::Object(nested))
        }
        Value::Array(items) => {
            let kept: Vec<Value> = items.iter().filter_map(clean_value).collect();
            (!kept.is_empty() || items.is_empty()).then_some(Value::Array(kept))
        }
        other => Some(other.clone()),
    }
}
