//! Discovery errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The project root does not exist or is not a directory.
    #[error("Not a directory: {0}")]
    InvalidRoot(PathBuf),

    /// A scanner gave up for a reason of its own.
    #[error("Scanner '{scanner}' failed: {message}")]
    Scanner { scanner: String, message: String },
}
