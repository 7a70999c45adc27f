//! # Runtime / Translation Bridge
//!
//! - [`RuntimeBridge::execute_capability`] runs a capability on the runtime
//!   its agent was discovered from and always returns an
//!   [`ExecutionResult`] envelope.
//! - [`translate_for_framework`] renders an agent's capabilities in the shape
//!   a target framework consumes.

pub mod executor;
pub mod invoker;
pub mod translate;

pub use executor::{BatchCall, ExecutionResult, RuntimeBridge};
pub use invoker::{CapabilityInvoker, EchoExecutor, HttpInvoker, InvokeError, McpInvoker};
pub use translate::{translate, translate_for_framework, TargetFramework};
