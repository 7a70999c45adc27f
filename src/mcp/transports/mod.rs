//! Transport layer for MCP connections.
//!
//! - **Stdio** ([`StdioTransport`]): a child process speaking line-delimited
//!   JSON-RPC on stdin/stdout.
//! - **HTTP** ([`HttpTransport`]): JSON-RPC POSTs to a remote endpoint,
//!   answered with plain JSON or a single server-sent event.
//!
//! Both implement [`McpTransport`]; [`connect_transport`] picks one from a
//! [`TransportDescriptor`].

pub mod http;
pub mod stdio;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::error::McpError;
use crate::adapters::TransportDescriptor;

pub use http::HttpTransport;
pub use stdio::StdioTransport;

/// JSON-RPC version sent on every frame.
pub const JSONRPC_VERSION: &str = "2.0";

// ---------------------------------------------------------------------------
// McpTransport
// ---------------------------------------------------------------------------

/// A connected JSON-RPC channel to one MCP server.
#[async_trait]
pub trait McpTransport: Send + Sync {
    /// Send a request and wait for its `result`. A JSON-RPC `error` object in
    /// the response becomes [`McpError::Rpc`].
    async fn request(&self, method: &str, params: Value) -> Result<Value, McpError>;

    /// Send a notification. No response is expected.
    async fn notify(&self, method: &str, params: Value) -> Result<(), McpError>;

    /// Release the connection. Calling it twice is a no-op.
    async fn close(&self) -> Result<(), McpError>;

    /// Stable label for logs: `stdio:{command}:{args..}` or `http:{url}`.
    fn server_identifier(&self) -> String;
}

/// Open a transport for `descriptor`. `timeout` bounds each request.
///
/// A `timeout_ms` declared on the descriptor is not consulted here; callers
/// resolve it against their own budget before connecting.
pub async fn connect_transport(
    descriptor: &TransportDescriptor,
    timeout: Duration,
) -> Result<Box<dyn McpTransport>, McpError> {
    match descriptor {
        TransportDescriptor::Stdio { command, args, env } => {
            let transport = StdioTransport::spawn(command, args, env, timeout).await?;
            Ok(Box::new(transport))
        }
        TransportDescriptor::Network { url, headers, .. } => {
            let transport = HttpTransport::new(url, headers.clone(), timeout)?;
            Ok(Box::new(transport))
        }
    }
}

// ---------------------------------------------------------------------------
// Framing helpers
// ---------------------------------------------------------------------------

pub(crate) fn request_frame(id: &Value, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "method": method,
        "params": params,
    })
}

pub(crate) fn notification_frame(method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "method": method,
        "params": params,
    })
}

/// Pull `result` out of a response frame.
pub(crate) fn extract_result(mut response: Value) -> Result<Value, McpError> {
    if let Some(error) = response.get("error") {
        let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Unknown error")
            .to_string();
        return Err(McpError::Rpc { code, message });
    }
    match response.get_mut("result") {
        Some(result) => Ok(result.take()),
        None => Err(McpError::protocol("response carries neither result nor error")),
    }
}

/// Response ids may come back as strings or numbers.
pub(crate) fn id_key(id: &Value) -> Option<String> {
    match id {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
