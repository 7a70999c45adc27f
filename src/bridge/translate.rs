//! Render an agent's capability set for a target framework.
//!
//! | target      | shape                                                        |
//! |-------------|--------------------------------------------------------------|
//! | `mcp`       | `{ name, tools: [ToolSpec] }`                                |
//! | `langchain` | `{ agent, tools: [LangChainTool] }`                          |
//! | `openai`    | `{ tools: [{ type: "function", function: {name, description, parameters} }] }` |
//! | `anthropic` | `{ tools: [{ name, description, input_schema }] }`           |
//! | `crewai`    | `{ role, goal, backstory, tools: [name] }`                   |
//!
//! Every renderer is pure and borrows the agent immutably.

use std::fmt;
use std::str::FromStr;

use serde_json::{json, Value};

use crate::adapters::{capabilities_to_tools, capability_to_langchain_tool, snake_case_name, AdapterError};
use crate::capabilities::{normalize, Capability};
use crate::discovery::DiscoveredAgent;
use crate::error::{BridgeError, BridgeResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetFramework {
    Mcp,
    LangChain,
    OpenAi,
    Anthropic,
    CrewAi,
}

impl TargetFramework {
    pub const ALL: [TargetFramework; 5] = [
        TargetFramework::Mcp,
        TargetFramework::LangChain,
        TargetFramework::OpenAi,
        TargetFramework::Anthropic,
        TargetFramework::CrewAi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetFramework::Mcp => "mcp",
            TargetFramework::LangChain => "langchain",
            TargetFramework::OpenAi => "openai",
            TargetFramework::Anthropic => "anthropic",
            TargetFramework::CrewAi => "crewai",
        }
    }
}

impl fmt::Display for TargetFramework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetFramework {
    type Err = BridgeError;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| BridgeError::UnsupportedFramework(s.to_string()))
    }
}

/// Parse `target` and render `agent` for it.
pub fn translate_for_framework(agent: &DiscoveredAgent, target: &str) -> BridgeResult<Value> {
    translate(agent, target.parse()?)
}

pub fn translate(agent: &DiscoveredAgent, target: TargetFramework) -> BridgeResult<Value> {
    match target {
        TargetFramework::Mcp => Ok(json!({
            "name": agent.name,
            "tools": capabilities_to_tools(&agent.capabilities)?,
        })),
        TargetFramework::LangChain => {
            let tools = agent
                .capabilities
                .iter()
                .map(capability_to_langchain_tool)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(json!({ "agent": agent.name, "tools": tools }))
        }
        TargetFramework::OpenAi => {
            let tools = agent
                .capabilities
                .iter()
                .map(|c| {
                    let name = required_name(snake_case_name(&c.name))?;
                    Ok(json!({
                        "type": "function",
                        "function": {
                            "name": name,
                            "description": c.description,
                            "parameters": parameters(c),
                        }
                    }))
                })
                .collect::<Result<Vec<_>, AdapterError>>()?;
            Ok(json!({ "tools": tools }))
        }
        TargetFramework::Anthropic => {
            let tools = agent
                .capabilities
                .iter()
                .map(|c| {
                    let name = required_name(normalize(&c.name))?;
                    Ok(json!({
                        "name": name,
                        "description": c.description,
                        "input_schema": parameters(c),
                    }))
                })
                .collect::<Result<Vec<_>, AdapterError>>()?;
            Ok(json!({ "tools": tools }))
        }
        TargetFramework::CrewAi => {
            let tools = agent
                .capabilities
                .iter()
                .map(|c| required_name(normalize(&c.name)))
                .collect::<Result<Vec<_>, _>>()?;
            let role = agent.metadata_str("role").unwrap_or(&agent.name);
            let goal = agent
                .metadata_str("goal")
                .or_else(|| agent.metadata_str("description"))
                .unwrap_or_default();
            let backstory = agent.metadata_str("backstory").unwrap_or_default();
            Ok(json!({
                "role": role,
                "goal": goal,
                "backstory": backstory,
                "tools": tools,
            }))
        }
    }
}

fn required_name(name: String) -> Result<String, AdapterError> {
    if name.is_empty() {
        Err(AdapterError::MissingField("name"))
    } else {
        Ok(name)
    }
}

/// Function-calling APIs require an object schema even for no arguments.
fn parameters(capability: &Capability) -> Value {
    capability
        .input_schema
        .clone()
        .unwrap_or_else(|| json!({ "type": "object", "properties": {} }))
}
