//! Capability definition: the canonical unit of agent functionality.
//!
//! A capability is a single named operation an agent can perform:
//! - A stable `id`, unique within its agent and never reassigned
//! - A display `name` that protocols may normalize
//! - A `description`, required by prompt-based protocols
//! - Optional input/output JSON schemas, copied verbatim by every adapter

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single operation an agent exposes.
///
/// Example YAML (as it appears under `spec.capabilities` in an OSSA manifest):
/// ```yaml
/// - id: summarize
///   name: Summarize Document
///   description: Produce a short summary of a document
///   input_schema:
///     type: object
///     properties:
///       text: { type: string }
///     required: [text]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    /// Stable identifier, unique within an agent.
    id: String,

    /// Protocol-neutral display name (may contain spaces / mixed case).
    pub name: String,

    /// Human-readable summary of what the capability does.
    #[serde(default)]
    pub description: String,

    /// JSON-Schema-like description of the accepted input.
    #[serde(default, rename = "inputSchema", alias = "input_schema", skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,

    /// JSON-Schema-like description of the produced output.
    #[serde(default, rename = "outputSchema", alias = "output_schema", skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,

    /// Free-form metadata carried along from the source format.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl Capability {
    /// Create a capability with the given id and display name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            input_schema: None,
            output_schema: None,
            metadata: Map::new(),
        }
    }

    /// Builder: set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder: set the input schema.
    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = Some(schema);
        self
    }

    /// Builder: set the output schema.
    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    /// Builder: attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// The stable identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Return a copy carrying a new display name and the same `id`.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Property names declared in `input_schema.properties`, sorted.
    pub fn input_properties(&self) -> Vec<&str> {
        self.input_schema
            .as_ref()
            .and_then(|s| s.get("properties"))
            .and_then(|p| p.as_object())
            .map(|props| props.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Whether `property` is listed in `input_schema.required`.
    pub fn is_required(&self, property: &str) -> bool {
        self.input_schema
            .as_ref()
            .and_then(|s| s.get("required"))
            .and_then(|r| r.as_array())
            .map_or(false, |req| req.iter().any(|v| v.as_str() == Some(property)))
    }
}
