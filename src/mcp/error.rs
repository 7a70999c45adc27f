//! MCP client errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum McpError {
    /// The server process could not be started.
    #[error("Failed to spawn MCP server '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed frame, closed channel, or unexpected response shape.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The server answered with a JSON-RPC error object.
    #[error("MCP server error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("MCP request '{method}' timed out after {timeout_ms}ms")]
    Timeout { method: String, timeout_ms: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl McpError {
    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        McpError::Protocol(message.into())
    }
}
