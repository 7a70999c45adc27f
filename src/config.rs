//! Bridge configuration.
//!
//! Every field has a default, so an empty YAML document (or no file at all)
//! yields a working configuration. Loading order used by the server binary:
//!
//! 1. Defaults
//! 2. YAML file named by `OSSA_BRIDGE_CONFIG`, if set
//! 3. Environment overrides:
//!    - `OSSA_BRIDGE_BIND`: HTTP bind address
//!    - `OSSA_BRIDGE_TIMEOUT_MS`: default execution timeout
//!    - `OSSA_BRIDGE_PREFIX`: namespace prefix for flat tool names
//!
//! ```yaml
//! discovery:
//!   confidence:
//!     manifest: 0.9
//!     protocol_config: 0.8
//!     source_pattern: 0.7
//!     heuristic: 0.3
//!   max_depth: 12
//!   ignore_dirs: [node_modules, .git, target]
//! registry:
//!   namespace_prefix: ossa
//! execution:
//!   default_timeout_ms: 30000
//! server:
//!   bind: 0.0.0.0:8080
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// Env var naming the YAML config file.
pub const CONFIG_PATH_ENV: &str = "OSSA_BRIDGE_CONFIG";

/// Upper bound for the heuristic confidence, whatever the configuration says.
pub const MAX_HEURISTIC_CONFIDENCE: f64 = 0.3;

// ---------------------------------------------------------------------------
// BridgeConfig
// ---------------------------------------------------------------------------

/// Top-level configuration for the bridge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub discovery: DiscoveryConfig,
    pub registry: RegistryConfig,
    pub execution: ExecutionConfig,
    pub server: HttpConfig,
}

impl BridgeConfig {
    /// Parse a configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, BridgeError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| BridgeError::Config(format!("invalid YAML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, BridgeError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_yaml(&content)
    }

    /// Defaults, then the file named by `OSSA_BRIDGE_CONFIG`, then env overrides.
    pub fn load() -> Result<Self, BridgeError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.is_empty() => {
                log::info!("Loading bridge configuration from {}", path);
                Self::from_yaml_file(path)?
            }
            _ => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through a lookup function (injectable for tests).
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), BridgeError> {
        if let Some(bind) = lookup("OSSA_BRIDGE_BIND") {
            self.server.bind = bind;
        }
        if let Some(timeout) = lookup("OSSA_BRIDGE_TIMEOUT_MS") {
            self.execution.default_timeout_ms = timeout.parse().map_err(|_| {
                BridgeError::Config(format!("OSSA_BRIDGE_TIMEOUT_MS is not a number: {timeout}"))
            })?;
        }
        if let Some(prefix) = lookup("OSSA_BRIDGE_PREFIX") {
            self.registry.namespace_prefix = prefix;
        }
        Ok(())
    }

    /// Reject values that would break the bridge's invariants.
    pub fn validate(&self) -> Result<(), BridgeError> {
        let c = &self.discovery.confidence;
        for (name, value) in [
            ("manifest", c.manifest),
            ("protocol_config", c.protocol_config),
            ("source_pattern", c.source_pattern),
            ("heuristic", c.heuristic),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(BridgeError::Config(format!(
                    "discovery.confidence.{name} = {value} is outside 0.0..=1.0"
                )));
            }
        }
        if c.heuristic > MAX_HEURISTIC_CONFIDENCE {
            return Err(BridgeError::Config(format!(
                "discovery.confidence.heuristic = {} exceeds {}",
                c.heuristic, MAX_HEURISTIC_CONFIDENCE
            )));
        }
        if self.registry.namespace_prefix.is_empty() || self.registry.namespace_prefix.contains('.') {
            return Err(BridgeError::Config(
                "registry.namespace_prefix must be non-empty and dot-free".to_string(),
            ));
        }
        if self.execution.default_timeout_ms == 0 {
            return Err(BridgeError::Config(
                "execution.default_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Confidence assigned by each discovery method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceThresholds {
    /// Explicit OSSA manifest.
    pub manifest: f64,
    /// Explicit protocol config file (e.g. `mcp.json`).
    pub protocol_config: f64,
    /// Framework usage recognised in source code.
    pub source_pattern: f64,
    /// Filename looks like an agent, nothing else known.
    pub heuristic: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            manifest: 0.9,
            protocol_config: 0.8,
            source_pattern: 0.7,
            heuristic: 0.3,
        }
    }
}

/// Discovery engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub confidence: ConfidenceThresholds,
    /// Maximum directory depth below the project root.
    pub max_depth: usize,
    /// Files larger than this are skipped (bytes).
    pub max_file_size: u64,
    /// Directory names never descended into.
    pub ignore_dirs: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            confidence: ConfidenceThresholds::default(),
            max_depth: 12,
            max_file_size: 1024 * 1024,
            ignore_dirs: [
                "node_modules",
                ".git",
                "target",
                "dist",
                "build",
                "__pycache__",
                ".venv",
                "venv",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Registry / execution / server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Prefix for `prefix.agent.capability` tool names.
    pub namespace_prefix: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            namespace_prefix: "ossa".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Timeout applied when the caller does not supply one.
    pub default_timeout_ms: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}
