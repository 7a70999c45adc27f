//! MCP adapter: capabilities ⇄ tools, resources ⇄ MCP resources, and
//! server configuration.
//!
//! Every function here is pure. Structural problems (a capability whose name
//! normalizes to nothing, a resource without a URI) are rejected with an
//! [`AdapterError`]; empty tool or resource lists are valid input.
//!
//! # Round trip
//!
//! `tool_to_capability(capability_to_tool(c))` preserves `description`,
//! `input_schema` and `output_schema` exactly. The name comes back
//! normalized, and the id is set to that normalized name: the original id and
//! display casing are not recoverable from an MCP tool.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use super::error::AdapterError;
use super::transport::TransportDescriptor;
use crate::capabilities::{infer_kind, normalize, Capability, ResourceKind, ResourceRef};

/// Prefix of every server config id.
pub const SERVER_ID_PREFIX: &str = "srv-";

/// Hex characters of the content hash kept in a server config id.
const SERVER_ID_HASH_LEN: usize = 16;

// ---------------------------------------------------------------------------
// Tools
// ---------------------------------------------------------------------------

/// An MCP tool definition as returned by `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, rename = "inputSchema", skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,

    #[serde(default, rename = "outputSchema", skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
}

/// Convert a capability into an MCP tool.
///
/// The tool name is `normalize(capability.name)`; description and schemas are
/// copied verbatim.
pub fn capability_to_tool(capability: &Capability) -> Result<ToolSpec, AdapterError> {
    let name = normalize(&capability.name);
    if name.is_empty() {
        return Err(AdapterError::MissingField("name"));
    }
    Ok(ToolSpec {
        name,
        description: capability.description.clone(),
        input_schema: capability.input_schema.clone(),
        output_schema: capability.output_schema.clone(),
    })
}

/// Convert an MCP tool back into a capability.
///
/// Lossy: both `id` and `name` become the tool's name.
pub fn tool_to_capability(tool: &ToolSpec) -> Result<Capability, AdapterError> {
    if tool.name.trim().is_empty() {
        return Err(AdapterError::MissingField("name"));
    }
    let mut capability = Capability::new(tool.name.clone(), tool.name.clone())
        .with_description(tool.description.clone());
    capability.input_schema = tool.input_schema.clone();
    capability.output_schema = tool.output_schema.clone();
    Ok(capability)
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// An MCP resource as returned by `resources/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolResource {
    pub uri: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Bridge extension; plain MCP servers never send it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ResourceKind>,
}

pub fn resource_to_protocol_resource(resource: &ResourceRef) -> Result<ProtocolResource, AdapterError> {
    if resource.id.trim().is_empty() {
        return Err(AdapterError::MissingField("id"));
    }
    if resource.uri.trim().is_empty() {
        return Err(AdapterError::MissingField("uri"));
    }
    let name = normalize(&resource.id);
    if name.is_empty() {
        return Err(AdapterError::InvalidValue {
            field: "id",
            reason: format!("'{}' has no identifier characters", resource.id),
        });
    }

    let description = resource
        .schema
        .as_ref()
        .and_then(|s| s.get("description"))
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(ProtocolResource {
        uri: resource.uri.clone(),
        name,
        description,
        mime_type: guess_mime_type(&resource.uri).map(str::to_string),
        kind: Some(resource.effective_kind()),
    })
}

/// Inverse of [`resource_to_protocol_resource`].
///
/// The kind is taken from the bridge extension when present, otherwise
/// inferred from the URI scheme. The schema is not carried by MCP and comes
/// back as `None`.
pub fn protocol_resource_to_resource(resource: &ProtocolResource) -> Result<ResourceRef, AdapterError> {
    if resource.name.trim().is_empty() {
        return Err(AdapterError::MissingField("name"));
    }
    if resource.uri.trim().is_empty() {
        return Err(AdapterError::MissingField("uri"));
    }
    let kind = resource.kind.unwrap_or_else(|| infer_kind(&resource.uri));
    Ok(ResourceRef::new(resource.name.clone(), resource.uri.clone()).with_kind(kind))
}

fn guess_mime_type(uri: &str) -> Option<&'static str> {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    let ext = path.rsplit_once('.')?.1;
    if ext.contains('/') {
        return None;
    }
    match ext.to_ascii_lowercase().as_str() {
        "json" => Some("application/json"),
        "yaml" | "yml" => Some("application/yaml"),
        "csv" => Some("text/csv"),
        "md" => Some("text/markdown"),
        "txt" => Some("text/plain"),
        "html" => Some("text/html"),
        "pdf" => Some("application/pdf"),
        "parquet" => Some("application/vnd.apache.parquet"),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
}

/// An MCP prompt template as returned by `prompts/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolPrompt {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub arguments: Vec<PromptArgument>,
}

/// Expose a capability as an MCP prompt whose arguments are the capability's
/// input properties.
pub fn capability_to_prompt(capability: &Capability) -> Result<ProtocolPrompt, AdapterError> {
    let name = normalize(&capability.name);
    if name.is_empty() {
        return Err(AdapterError::MissingField("name"));
    }

    let properties = capability
        .input_schema
        .as_ref()
        .and_then(|s| s.get("properties"))
        .and_then(Value::as_object);

    let arguments = capability
        .input_properties()
        .into_iter()
        .map(|prop| PromptArgument {
            name: prop.to_string(),
            description: properties
                .and_then(|p| p.get(prop))
                .and_then(|p| p.get("description"))
                .and_then(Value::as_str)
                .map(str::to_string),
            required: capability.is_required(prop),
        })
        .collect();

    Ok(ProtocolPrompt {
        name,
        description: (!capability.description.is_empty()).then(|| capability.description.clone()),
        arguments,
    })
}

// ---------------------------------------------------------------------------
// Server configuration
// ---------------------------------------------------------------------------

/// Everything needed to expose one agent as an MCP server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// `srv-` + 16 hex chars of a SHA-256 over the other fields.
    pub id: String,
    pub agent_id: String,
    pub tools: Vec<ToolSpec>,
    pub resources: Vec<ResourceRef>,
    pub transport: TransportDescriptor,
}

/// Build a server config whose `id` is a content hash of its inputs.
///
/// Identical inputs always produce the same id; any change to the agent id,
/// a tool, a resource, or the transport produces a different one.
pub fn build_server_config(
    agent_id: &str,
    tools: &[ToolSpec],
    resources: &[ResourceRef],
    transport: &TransportDescriptor,
) -> Result<ServerConfig, AdapterError> {
    if agent_id.trim().is_empty() {
        return Err(AdapterError::MissingField("agent_id"));
    }
    if let Some(tool) = tools.iter().find(|t| t.name.trim().is_empty()) {
        return Err(AdapterError::InvalidValue {
            field: "tools",
            reason: format!("tool with empty name (description: '{}')", tool.description),
        });
    }
    if resources.iter().any(|r| r.uri.trim().is_empty()) {
        return Err(AdapterError::MissingField("uri"));
    }

    let content = json!({
        "agent_id": agent_id,
        "tools": serde_json::to_value(tools)?,
        "resources": serde_json::to_value(resources)?,
        "transport": serde_json::to_value(transport)?,
    });
    let digest = Sha256::digest(canonical_json(&content).as_bytes());
    let hash = hex::encode(digest);

    Ok(ServerConfig {
        id: format!("{SERVER_ID_PREFIX}{}", &hash[..SERVER_ID_HASH_LEN]),
        agent_id: agent_id.to_string(),
        tools: tools.to_vec(),
        resources: resources.to_vec(),
        transport: transport.clone(),
    })
}

/// Serialize with object keys sorted at every level.
fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let body: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{}:{}", Value::String(k.clone()), canonical_json(&map[k])))
                .collect();
            format!("{{{}}}", body.join(","))
        }
        Value::Array(items) => {
            let body: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", body.join(","))
        }
        other => other.to_string(),
    }
}

/// Convenience: build the MCP tool list for a set of capabilities.
pub fn capabilities_to_tools(capabilities: &[Capability]) -> Result<Vec<ToolSpec>, AdapterError> {
    capabilities.iter().map(capability_to_tool).collect()
}

/// Read a `tools/list` style JSON array into tool specs, skipping entries
/// that do not parse.
pub fn tools_from_value(value: &Value) -> Vec<ToolSpec> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match serde_json::from_value::<ToolSpec>(item.clone()) {
                    Ok(tool) => Some(tool),
                    Err(e) => {
                        log::debug!("Skipping malformed tool entry: {}", e);
                        None
                    }
                })
                .collect()
        })
        .unwrap_or_default()
}
