//! # Capability Model
//!
//! The canonical, protocol-neutral representation of what an agent can do
//! and what context it exposes. Every protocol adapter converts to and from
//! these types, so they are the pivot of the bridge:
//!
//! ```text
//! OSSA manifest / MCP config / LangChain source / ...
//!   │ discovery scanners
//!   ▼
//! Capability + ResourceRef          (this module)
//!   │ adapters::mcp / adapters::langchain
//!   ▼
//! ToolSpec / ProtocolResource / ProtocolPrompt / LangChainTool
//! ```
//!
//! ## Naming
//!
//! Display names are free text ("Summarize Document"); protocols want
//! identifiers (`summarize-document`). [`naming::normalize`] is the single
//! rule every adapter uses, and [`naming::namespaced_name`] builds the flat
//! `prefix.agent.capability` identifiers used by tool registries without
//! nesting.

pub mod capability;
pub mod naming;
pub mod resource;

pub use capability::Capability;
pub use naming::{namespaced_name, normalize, split_namespaced, validate_identifier, NamingError};
pub use resource::{infer_kind, ResourceKind, ResourceRef};
