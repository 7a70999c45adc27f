//! Crate-level error type.
//!
//! Each module owns a narrower error enum; `BridgeError` wraps them so the
//! public surface (runtime bridge, HTTP server) has a single type to return.

use thiserror::Error;

use crate::adapters::AdapterError;
use crate::capabilities::NamingError;
use crate::discovery::DiscoveryError;
use crate::mcp::McpError;
use crate::registry::RegistryError;

/// Errors surfaced by the bridge's public operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Identifier could not be built or validated.
    #[error("Naming error: {0}")]
    Naming(#[from] NamingError),

    /// Discovery failed before producing any result.
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    /// Conversion to or from a protocol shape failed.
    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),

    /// Registry query or persistence failed.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// MCP transport or protocol failure.
    #[error("MCP error: {0}")]
    Mcp(#[from] McpError),

    /// Translation target is not one the bridge knows how to produce.
    #[error("Unsupported framework: {0}")]
    UnsupportedFramework(String),

    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience alias for results that carry a [`BridgeError`].
pub type BridgeResult<T> = Result<T, BridgeError>;
