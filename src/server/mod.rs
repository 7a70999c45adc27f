//! HTTP surface for the bridge.
//!
//! A thin JSON layer over discovery, the registries, and the runtime bridge;
//! no protocol logic lives here. See [`routes`] for the endpoint list.

pub mod routes;

pub use routes::{app_router, AppState};
