//! Model Context Protocol client.
//!
//! JSON-RPC 2.0 over a local process (stdio) or a remote endpoint (HTTP).
//! The runtime bridge uses it to make genuine `tools/call` invocations
//! against discovered MCP servers.

pub mod client;
pub mod error;
pub mod transports;

pub use client::{McpClient, ToolCallOutcome, PROTOCOL_VERSION};
pub use error::McpError;
pub use transports::{connect_transport, HttpTransport, McpTransport, StdioTransport};
