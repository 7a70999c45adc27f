//! LangChain adapter.
//!
//! LangChain tools are named in `snake_case` (they become Python function
//! names), so names go through [`normalize`] and then have `-` swapped for
//! `_`. The reverse path swaps back, which makes the mapping exact for any
//! already-normalized name.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::AdapterError;
use crate::capabilities::{normalize, Capability};

/// A LangChain `StructuredTool` description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LangChainTool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args_schema: Option<Value>,
    #[serde(default)]
    pub return_direct: bool,
}

/// `normalize(name)` in snake case.
pub fn snake_case_name(name: &str) -> String {
    normalize(name).replace('-', "_")
}

pub fn capability_to_langchain_tool(capability: &Capability) -> Result<LangChainTool, AdapterError> {
    let name = snake_case_name(&capability.name);
    if name.is_empty() {
        return Err(AdapterError::MissingField("name"));
    }
    let return_direct = capability
        .metadata
        .get("return_direct")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    Ok(LangChainTool {
        name,
        description: capability.description.clone(),
        args_schema: capability.input_schema.clone(),
        return_direct,
    })
}

/// Inverse of [`capability_to_langchain_tool`]. The id is the kebab-case
/// form of the tool name.
pub fn langchain_tool_to_capability(tool: &LangChainTool) -> Result<Capability, AdapterError> {
    let id = normalize(&tool.name);
    if id.is_empty() {
        return Err(AdapterError::MissingField("name"));
    }
    let mut capability = Capability::new(id.clone(), id).with_description(tool.description.clone());
    capability.input_schema = tool.args_schema.clone();
    if tool.return_direct {
        capability = capability.with_metadata("return_direct", Value::Bool(true));
    }
    Ok(capability)
}
