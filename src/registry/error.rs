//! Registry errors.

use thiserror::Error;

use crate::adapters::AdapterError;
use crate::capabilities::NamingError;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// A name filter did not compile.
    #[error("Invalid name pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A record could not be built from its source.
    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("Naming error: {0}")]
    Naming(#[from] NamingError),
}
