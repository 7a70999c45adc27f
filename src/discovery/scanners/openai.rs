//! OpenAI function-calling scanner.
//!
//! Recognises JSON files that hold function tools in any of the shapes the
//! OpenAI APIs accept:
//!
//! - a bare array of `{"type": "function", "function": {...}}`
//! - an assistant object with `tools` (and optionally `name`, `model`,
//!   `instructions`)
//! - the legacy `functions` array of `{name, description, parameters}`

use async_trait::async_trait;
use serde_json::Value;

use super::{agent_id, FormatScanner};
use crate::capabilities::Capability;
use crate::discovery::agent::{AgentFormat, DiscoveredAgent};
use crate::discovery::context::{ScanContext, SourceFile};
use crate::discovery::error::DiscoveryError;

pub struct OpenAiFunctionScanner {
    confidence: f64,
}

impl OpenAiFunctionScanner {
    pub fn new(confidence: f64) -> Self {
        Self { confidence }
    }

    fn parse_document(&self, file: &SourceFile, doc: &Value) -> Option<DiscoveredAgent> {
        let (tools, assistant) = match doc {
            Value::Array(items) => (items.as_slice(), None),
            Value::Object(obj) => {
                let tools = obj
                    .get("tools")
                    .or_else(|| obj.get("functions"))
                    .and_then(Value::as_array)?;
                (tools.as_slice(), Some(doc))
            }
            _ => return None,
        };

        let functions: Vec<Capability> = tools.iter().filter_map(function_capability).collect();
        if functions.is_empty() {
            return None;
        }

        let name = assistant.and_then(|a| a.get("name")).and_then(Value::as_str);
        let id = agent_id(name, file);
        let mut agent = DiscoveredAgent::new(
            id.clone(),
            name.unwrap_or(&id),
            AgentFormat::OpenAi,
            file.path.clone(),
            self.confidence,
        );
        if let Some(assistant) = assistant {
            for key in ["model", "instructions", "description"] {
                if let Some(v) = assistant.get(key).and_then(Value::as_str) {
                    agent = agent.with_metadata(key, Value::String(v.to_string()));
                }
            }
        }
        for cap in functions {
            agent.push_capability(cap);
        }
        Some(agent)
    }
}

/// `{"type":"function","function":{..}}` or a bare legacy function object.
fn function_capability(entry: &Value) -> Option<Capability> {
    let function = match entry.get("type").and_then(Value::as_str) {
        Some("function") => entry.get("function")?,
        Some(_) => return None,
        None => entry,
    };
    let name = function.get("name").and_then(Value::as_str)?;
    if name.is_empty() || name.contains('.') {
        return None;
    }
    let mut cap = Capability::new(name, name).with_description(
        function
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default(),
    );
    cap.input_schema = function.get("parameters").filter(|p| p.is_object()).cloned();
    if let Some(strict) = function.get("strict").and_then(Value::as_bool) {
        cap = cap.with_metadata("strict", Value::Bool(strict));
    }
    Some(cap)
}

#[async_trait]
impl FormatScanner for OpenAiFunctionScanner {
    fn name(&self) -> &str {
        "openai-functions"
    }

    fn format(&self) -> AgentFormat {
        AgentFormat::OpenAi
    }

    async fn scan(&self, ctx: &ScanContext) -> Result<Vec<DiscoveredAgent>, DiscoveryError> {
        let mut agents = Vec::new();
        for file in ctx.files_with_extensions(&["json"]) {
            if ctx.is_aborted() {
                break;
            }
            let Some(content) = ctx.read(file).await else {
                continue;
            };
            if !content.contains("\"function") || content.contains("mcpServers") {
                continue;
            }
            match serde_json::from_str::<Value>(&content) {
                Ok(doc) => agents.extend(self.parse_document(file, &doc)),
                Err(e) => log::warn!("Skipping malformed JSON {}: {}", file.path.display(), e),
            }
        }
        Ok(agents)
    }
}
