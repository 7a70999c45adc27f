//! # OSSA Bridge
//!
//! Discovers agent definitions in a project tree (OSSA manifests, MCP server
//! configs, LangChain / CrewAI / OpenAI-functions sources), models their
//! capabilities in one protocol-neutral form, and bridges them to other
//! protocols and runtimes.
//!
//! ```text
//! discovery ──▶ capabilities ──▶ adapters (MCP, LangChain) ──▶ registry
//!                     │                                           │
//!                     └──────────── bridge (execute / translate) ◀┘
//! ```
//!
//! The [`server`] module puts a thin HTTP surface over all of it.

pub mod adapters;
pub mod bridge;
pub mod capabilities;
pub mod config;
pub mod discovery;
pub mod error;
pub mod mcp;
pub mod registry;
pub mod server;

pub use adapters::{ServerConfig, ToolSpec, TransportDescriptor};
pub use bridge::{translate_for_framework, ExecutionResult, RuntimeBridge, TargetFramework};
pub use capabilities::{normalize, Capability, ResourceKind, ResourceRef};
pub use config::BridgeConfig;
pub use discovery::{AgentFormat, DiscoveredAgent, DiscoveryEngine, DiscoveryReport};
pub use error::{BridgeError, BridgeResult};
pub use registry::{DiscoveryFilter, Registry, RegistryRecord};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
