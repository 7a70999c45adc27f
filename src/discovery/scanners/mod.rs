//! Format-specific scanners.
//!
//! Each scanner looks at the shared [`ScanContext`] independently and returns
//! its own list. A file a scanner cannot parse is logged and skipped; an
//! `Err` from `scan` discards only that scanner's results.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::agent::{AgentFormat, DiscoveredAgent};
use super::context::{ScanContext, SourceFile};
use super::error::DiscoveryError;
use crate::capabilities::{normalize, Capability};
use crate::config::{ConfidenceThresholds, MAX_HEURISTIC_CONFIDENCE};

pub mod crewai;
pub mod heuristic;
pub mod langchain;
pub mod mcp_config;
pub mod openai;
pub mod ossa;

pub use crewai::CrewAiScanner;
pub use heuristic::HeuristicScanner;
pub use langchain::LangChainScanner;
pub use mcp_config::McpConfigScanner;
pub use openai::OpenAiFunctionScanner;
pub use ossa::OssaManifestScanner;

/// A discovery method for one source ecosystem.
#[async_trait]
pub trait FormatScanner: Send + Sync {
    /// Name used in logs and in `DiscoveryReport::failed_scanners`.
    fn name(&self) -> &str;

    fn format(&self) -> AgentFormat;

    async fn scan(&self, ctx: &ScanContext) -> Result<Vec<DiscoveredAgent>, DiscoveryError>;
}

/// The built-in scanners in declaration order (which is also the dedup
/// tie-break order).
pub fn default_scanners(confidence: &ConfidenceThresholds) -> Vec<Arc<dyn FormatScanner>> {
    vec![
        Arc::new(OssaManifestScanner::new(confidence.manifest)),
        Arc::new(McpConfigScanner::new(confidence.protocol_config)),
        Arc::new(LangChainScanner::new(confidence.source_pattern)),
        Arc::new(CrewAiScanner::new(confidence.source_pattern)),
        Arc::new(OpenAiFunctionScanner::new(confidence.source_pattern)),
        Arc::new(HeuristicScanner::new(
            confidence.heuristic.min(MAX_HEURISTIC_CONFIDENCE),
        )),
    ]
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Parse a YAML or JSON file into a JSON value, by extension.
pub(crate) fn parse_structured(file: &SourceFile, content: &str) -> Result<Value, DiscoveryError> {
    match file.extension().as_deref() {
        Some("json") => Ok(serde_json::from_str(content)?),
        _ => Ok(serde_yaml::from_str(content)?),
    }
}

/// Agent id derived from a name, falling back to the file stem.
pub(crate) fn agent_id(name: Option<&str>, file: &SourceFile) -> String {
    let id = name.map(normalize).unwrap_or_default();
    if id.is_empty() {
        let from_stem = normalize(file.stem());
        if from_stem.is_empty() {
            "agent".to_string()
        } else {
            from_stem
        }
    } else {
        id
    }
}

/// Build a capability from a loosely-typed entry.
///
/// Accepts a bare string (`"web_search"`) or an object with `name` (or `id`),
/// `description`, and an input schema under `inputSchema`, `input_schema`,
/// or `parameters`.
pub(crate) fn capability_from_value(entry: &Value) -> Option<Capability> {
    match entry {
        Value::String(name) => {
            let id = normalize(name);
            (!id.is_empty()).then(|| Capability::new(id, name.clone()))
        }
        Value::Object(obj) => {
            let name = obj
                .get("name")
                .or_else(|| obj.get("id"))
                .and_then(Value::as_str)?;
            let id = obj
                .get("id")
                .and_then(Value::as_str)
                .map(normalize)
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| normalize(name));
            if id.is_empty() {
                return None;
            }
            let mut cap = Capability::new(id, name).with_description(
                obj.get("description").and_then(Value::as_str).unwrap_or_default(),
            );
            cap.input_schema = ["inputSchema", "input_schema", "parameters"]
                .iter()
                .find_map(|k| obj.get(*k))
                .filter(|v| v.is_object())
                .cloned();
            cap.output_schema = ["outputSchema", "output_schema"]
                .iter()
                .find_map(|k| obj.get(*k))
                .filter(|v| v.is_object())
                .cloned();
            Some(cap)
        }
        _ => None,
    }
}

pub(crate) fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

pub(crate) fn string_map(value: Option<&Value>) -> BTreeMap<String, String> {
    value
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}
