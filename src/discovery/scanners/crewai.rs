//! CrewAI scanner.
//!
//! Two conventions are recognised:
//!
//! - `config/agents.yaml`: a map of agent key to `role`, `goal`, `backstory`,
//!   and optional `tools` (one agent per key)
//! - Python files with `from crewai import`: each `Agent(...)` construction
//!   and each `@agent` method of a `@CrewBase` class

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::{agent_id, capability_from_value, FormatScanner};
use crate::capabilities::normalize;
use crate::discovery::agent::{AgentFormat, DiscoveredAgent};
use crate::discovery::context::{ScanContext, SourceFile};
use crate::discovery::error::DiscoveryError;

const AGENTS_FILES: &[&str] = &["agents.yaml", "agents.yml"];
const PERSONA_KEYS: [&str; 3] = ["role", "goal", "backstory"];

static CREWAI_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*from\s+crewai(?:\.\w+)*\s+import\b").unwrap());
static AGENT_CALL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bAgent\s*\(").unwrap());
static AGENT_METHOD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*@agent[ \t]*\r?\n[ \t]*def[ \t]+(\w+)").unwrap());
static CONFIG_ARG: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bconfig\s*=").unwrap());
static TOOLS_LIST: Lazy<Regex> = Lazy::new(|| Regex::new(r"tools\s*=\s*\[([^\]]*)\]").unwrap());
static TOOL_IDENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-Za-z_][\w.]*)\s*(?:\(\s*\))?").unwrap());

fn keyword_arg(text: &str, key: &str) -> Option<String> {
    let pattern = format!(r#"\b{key}\s*=\s*(?:"""(?s:(.*?))"""|"([^"]*)"|'([^']*)')"#);
    let re = Regex::new(&pattern).ok()?;
    let caps = re.captures(text)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))
        .map(|m| m.as_str().trim().to_string())
}

pub struct CrewAiScanner {
    confidence: f64,
}

impl CrewAiScanner {
    pub fn new(confidence: f64) -> Self {
        Self { confidence }
    }

    fn new_agent(&self, key: &str, file: &SourceFile) -> DiscoveredAgent {
        DiscoveredAgent::new(
            agent_id(Some(key), file),
            key.to_string(),
            AgentFormat::CrewAi,
            file.path.clone(),
            self.confidence,
        )
    }

    fn parse_agents_yaml(&self, file: &SourceFile, doc: &Value) -> Vec<DiscoveredAgent> {
        let Some(entries) = doc.as_object() else {
            return Vec::new();
        };
        let mut agents = Vec::new();
        for (key, spec) in entries {
            if !spec.is_object() || PERSONA_KEYS.iter().all(|k| spec.get(*k).is_none()) {
                continue;
            }
            let mut agent = self.new_agent(key, file);
            for k in PERSONA_KEYS {
                if let Some(v) = spec.get(k).and_then(Value::as_str) {
                    agent = agent.with_metadata(k, Value::String(v.trim().to_string()));
                }
            }
            if let Some(llm) = spec.get("llm").filter(|v| !v.is_null()) {
                agent = agent.with_metadata("llm", llm.clone());
            }
            for tool in spec.get("tools").and_then(Value::as_array).into_iter().flatten() {
                if let Some(cap) = capability_from_value(tool) {
                    agent.push_capability(cap);
                }
            }
            agents.push(agent);
        }
        agents
    }

    fn parse_python(&self, file: &SourceFile, content: &str) -> Vec<DiscoveredAgent> {
        if !CREWAI_IMPORT.is_match(content) {
            return Vec::new();
        }
        let mut agents: Vec<DiscoveredAgent> = Vec::new();

        let starts: Vec<usize> = AGENT_CALL.find_iter(content).map(|m| m.end()).collect();
        for (i, start) in starts.iter().enumerate() {
            let end = starts.get(i + 1).copied().unwrap_or(content.len());
            let body = &content[*start..end];
            let role = keyword_arg(body, "role");
            // `Agent(config=...)` inside an `@agent` method is picked up below.
            if role.is_none() && CONFIG_ARG.is_match(body) {
                continue;
            }
            let key = role
                .filter(|r| !normalize(r).is_empty())
                .unwrap_or_else(|| format!("{}-agent-{}", file.stem(), i + 1));

            let mut agent = self.new_agent(&key, file);
            for k in PERSONA_KEYS {
                if let Some(v) = keyword_arg(body, k) {
                    agent = agent.with_metadata(k, Value::String(v));
                }
            }
            if let Some(list) = TOOLS_LIST.captures(body) {
                for ident in TOOL_IDENT.captures_iter(&list[1]) {
                    let name = ident[1].rsplit('.').next().unwrap_or(&ident[1]);
                    if let Some(cap) = capability_from_value(&Value::String(name.to_string())) {
                        agent.push_capability(cap);
                    }
                }
            }
            agents.push(agent);
        }

        for caps in AGENT_METHOD.captures_iter(content) {
            let agent = self
                .new_agent(&caps[1], file)
                .with_metadata("config_key", Value::String(caps[1].to_string()));
            if agents.iter().all(|a| a.id != agent.id) {
                agents.push(agent);
            }
        }
        agents
    }
}

#[async_trait]
impl FormatScanner for CrewAiScanner {
    fn name(&self) -> &str {
        "crewai"
    }

    fn format(&self) -> AgentFormat {
        AgentFormat::CrewAi
    }

    async fn scan(&self, ctx: &ScanContext) -> Result<Vec<DiscoveredAgent>, DiscoveryError> {
        let mut agents = Vec::new();
        for file in &ctx.files {
            if ctx.is_aborted() {
                break;
            }
            let is_agents_yaml = AGENTS_FILES.contains(&file.file_name());
            let is_python = file.has_extension(&["py"]);
            if !is_agents_yaml && !is_python {
                continue;
            }
            let Some(content) = ctx.read(file).await else {
                continue;
            };

            if is_agents_yaml {
                match serde_yaml::from_str::<Value>(&content) {
                    Ok(doc) => agents.extend(self.parse_agents_yaml(file, &doc)),
                    Err(e) => log::warn!("Skipping malformed {}: {}", file.path.display(), e),
                }
            } else if content.contains("crewai") {
                agents.extend(self.parse_python(file, &content));
            }
        }
        Ok(agents)
    }
}
