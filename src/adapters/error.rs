//! Adapter error types.

use thiserror::Error;

/// Errors raised while converting between the capability model and a
/// protocol's shapes.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// A field the target protocol requires is missing or empty.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// A field is present but cannot be expressed in the target protocol.
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    /// Canonical serialization failed (only possible for non-finite numbers
    /// in user-supplied schemas).
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
