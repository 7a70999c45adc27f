//! # Registry
//!
//! In-memory index of protocol records and discovered agents with tag/name
//! queries, fallback resolution, per-entry access statistics and status.
//!
//! The registry is an explicit object owned by the application (the HTTP
//! server keeps one per item type in its state); there is no global instance.
//! Nothing is evicted; [`Registry::clear_cache`] is the only way entries leave.

pub mod error;
pub mod filter;
pub mod record;
pub mod store;

pub use error::RegistryError;
pub use filter::DiscoveryFilter;
pub use record::{RegistryItem, RegistryRecord};
pub use store::{AgentStatus, CachedEntry, MostAccessed, Registry, RegistryStats};
