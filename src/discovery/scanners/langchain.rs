//! LangChain source scanner.
//!
//! A Python or JS/TS file is a LangChain agent when it imports LangChain and
//! either defines tools or builds an agent. Tools are recognised from:
//!
//! - Python `@tool` decorated functions (docstring becomes the description)
//! - Python `Tool(name=..., description=...)` / `StructuredTool.from_function(...)`
//! - JS/TS `tool(...)`, `DynamicTool(...)`, `DynamicStructuredTool(...)` option
//!   objects with `name` and `description`

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::{agent_id, FormatScanner};
use crate::capabilities::{normalize, Capability};
use crate::discovery::agent::{AgentFormat, DiscoveredAgent};
use crate::discovery::context::{ScanContext, SourceFile};
use crate::discovery::error::DiscoveryError;

const SOURCE_EXTENSIONS: &[&str] = &["py", "ts", "js", "mjs", "cjs"];

static PY_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(?:from|import)\s+langchain").unwrap());
static JS_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:from\s+|require\(\s*)["'](?:@langchain/|langchain)"#).unwrap()
});
static PY_TOOL_DECORATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?ms)^[ \t]*@tool(?:\(\s*["']([^"']+)["'][^)]*\)|\([^)]*\))?[ \t]*\r?\n[ \t]*(?:async[ \t]+)?def[ \t]+(\w+)[ \t]*\([^)]*\)[^:\n]*:[ \t]*\r?\n(?:[ \t]*(?:"""|''')(.*?)(?:"""|'''))?"#,
    )
    .unwrap()
});
static PY_TOOL_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?s)\b(?:StructuredTool\.from_function|Tool)\(.*?name\s*=\s*["']([^"']+)["'].*?description\s*=\s*["']([^"']*)["']"#,
    )
    .unwrap()
});
static JS_TOOL_OPTIONS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?s)name\s*:\s*["'`]([^"'`]+)["'`]\s*,\s*description\s*:\s*["'`]([^"'`]*)["'`]"#,
    )
    .unwrap()
});
static AGENT_CONSTRUCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:AgentExecutor|initialize_agent|create_\w*agent|createReactAgent|create\w*Agent)\b")
        .unwrap()
});

pub struct LangChainScanner {
    confidence: f64,
}

impl LangChainScanner {
    pub fn new(confidence: f64) -> Self {
        Self { confidence }
    }

    fn parse_source(&self, file: &SourceFile, content: &str) -> Option<DiscoveredAgent> {
        let python = file.has_extension(&["py"]);
        let imports = if python {
            PY_IMPORT.is_match(content)
        } else {
            JS_IMPORT.is_match(content)
        };
        if !imports {
            return None;
        }

        let capabilities = if python {
            python_tools(content)
        } else {
            js_tools(content)
        };
        let builds_agent = AGENT_CONSTRUCTION.is_match(content);
        if capabilities.is_empty() && !builds_agent {
            return None;
        }

        let id = agent_id(None, file);
        let language = if python {
            "python"
        } else if file.has_extension(&["ts"]) {
            "typescript"
        } else {
            "javascript"
        };
        let mut agent = DiscoveredAgent::new(
            id,
            file.stem().to_string(),
            AgentFormat::LangChain,
            file.path.clone(),
            self.confidence,
        )
        .with_metadata("language", Value::String(language.to_string()))
        .with_metadata("builds_agent", Value::Bool(builds_agent));
        for cap in capabilities {
            agent.push_capability(cap);
        }
        Some(agent)
    }
}

fn python_tools(content: &str) -> Vec<Capability> {
    let mut tools = Vec::new();
    for caps in PY_TOOL_DECORATOR.captures_iter(content) {
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or_default();
        let description = caps
            .get(3)
            .map(|m| clean_docstring(m.as_str()))
            .unwrap_or_default();
        push_tool(&mut tools, name, description);
    }
    for caps in PY_TOOL_CALL.captures_iter(content) {
        push_tool(&mut tools, &caps[1], caps[2].to_string());
    }
    tools
}

fn js_tools(content: &str) -> Vec<Capability> {
    let mut tools = Vec::new();
    if !(content.contains("tool(") || content.contains("DynamicTool") || content.contains("DynamicStructuredTool")) {
        return tools;
    }
    for caps in JS_TOOL_OPTIONS.captures_iter(content) {
        push_tool(&mut tools, &caps[1], caps[2].to_string());
    }
    tools
}

fn push_tool(tools: &mut Vec<Capability>, name: &str, description: String) {
    let id = normalize(name);
    if id.is_empty() || tools.iter().any(|c| c.id() == id) {
        return;
    }
    tools.push(
        Capability::new(id, name)
            .with_description(description)
            .with_metadata("framework", Value::String("langchain".to_string())),
    );
}

/// Collapse a docstring to its first paragraph on one line.
fn clean_docstring(doc: &str) -> String {
    doc.trim()
        .split("\n\n")
        .next()
        .unwrap_or_default()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl FormatScanner for LangChainScanner {
    fn name(&self) -> &str {
        "langchain"
    }

    fn format(&self) -> AgentFormat {
        AgentFormat::LangChain
    }

    async fn scan(&self, ctx: &ScanContext) -> Result<Vec<DiscoveredAgent>, DiscoveryError> {
        let mut agents = Vec::new();
        for file in ctx.files_with_extensions(SOURCE_EXTENSIONS) {
            if ctx.is_aborted() {
                break;
            }
            let Some(content) = ctx.read(file).await else {
                continue;
            };
            if !content.contains("langchain") {
                continue;
            }
            if let Some(agent) = self.parse_source(file, &content) {
                agents.push(agent);
            }
        }
        Ok(agents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn file(name: &str) -> SourceFile {
        SourceFile {
            path: PathBuf::from(format!("/project/{name}")),
            size: 1,
        }
    }

    const PYTHON_AGENT: &str = r#"
from langchain.agents import AgentExecutor, create_openai_tools_agent
from langchain_core.tools import tool, Tool

@tool
def search_web(query: str) -> str:
    """Search the public web.

    Returns the top results as text.
    """
    return ""

@tool("lookup-order")
async def lookup(order_id: str) -> dict:
    return {}

calculator = Tool(name="calculator", func=calc, description="Evaluate arithmetic")

executor = AgentExecutor(agent=agent, tools=[search_web, lookup, calculator])
"#;

    #[test]
    fn test_python_tools() {
        let scanner = LangChainScanner::new(0.7);
        let agent = scanner.parse_source(&file("research_agent.py"), PYTHON_AGENT).unwrap();
        assert_eq!(agent.id, "research-agent");
        assert_eq!(agent.format, AgentFormat::LangChain);
        assert_eq!(agent.confidence, 0.7);

        let ids: Vec<&str> = agent.capabilities.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["search-web", "lookup-order", "calculator"]);
        assert_eq!(agent.capabilities[0].description, "Search the public web.");
        assert_eq!(agent.capabilities[1].description, "");
        assert_eq!(agent.capabilities[2].description, "Evaluate arithmetic");
        assert_eq!(agent.metadata_str("language"), Some("python"));
    }

    #[test]
    fn test_typescript_tools() {
        let source = r#"
import { DynamicStructuredTool, tool } from "@langchain/core/tools";
import { z } from "zod";

const weather = tool(async ({ city }) => fetchWeather(city), {
  name: "get_weather",
  description: "Current weather for a city",
  schema: z.object({ city: z.string() }),
});

const summarize = new DynamicStructuredTool({
  name: "summarize",
  description: "Summarize text",
  func: async ({ text }) => text.slice(0, 100),
});
"#;
        let agent = LangChainScanner::new(0.7)
            .parse_source(&file("tools.ts"), source)
            .unwrap();
        let ids: Vec<&str> = agent.capabilities.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["get-weather", "summarize"]);
        assert_eq!(agent.metadata_str("language"), Some("typescript"));
    }

    #[test]
    fn test_import_without_tools_or_agent_is_ignored() {
        let source = "from langchain.text_splitter import RecursiveCharacterTextSplitter\n";
        assert!(LangChainScanner::new(0.7).parse_source(&file("split.py"), source).is_none());
        assert!(LangChainScanner::new(0.7)
            .parse_source(&file("plain.py"), "def f():\n    pass\n")
            .is_none());
    }
}
