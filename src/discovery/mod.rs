//! # Discovery Engine
//!
//! Best-effort, read-only inventory of agent definitions in a project tree.
//!
//! ```text
//! root ──walk once──▶ ScanContext (Arc, shared)
//!                       │
//!         ┌─────────────┼──────────────┬──── ... one task per scanner
//!         ▼             ▼              ▼
//!     OSSA (0.9)   MCP config (0.8)  LangChain / CrewAI / OpenAI (0.7)  Heuristic (≤0.3)
//!         └─────────────┴──────┬───────┘
//!                              ▼
//!               dedup (source_path, id) → sort by confidence
//! ```
//!
//! A scanner that errors or panics contributes nothing; the others are
//! unaffected.

pub mod agent;
pub mod context;
pub mod engine;
pub mod error;
pub mod scanners;

pub use agent::{AgentFormat, DiscoveredAgent};
pub use context::{AbortSignal, ScanContext, SourceFile};
pub use engine::{DiscoveryEngine, DiscoveryReport};
pub use error::DiscoveryError;
pub use scanners::{default_scanners, FormatScanner};
