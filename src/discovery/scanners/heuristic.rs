//! Filename heuristic: anything that is named like an agent.
//!
//! Hits are reported as [`AgentFormat::Unknown`] with a low confidence and no
//! capabilities, so callers can decide whether to look closer. The engine
//! drops a heuristic hit when another scanner already claimed the same file.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::{agent_id, FormatScanner};
use crate::config::MAX_HEURISTIC_CONFIDENCE;
use crate::discovery::agent::{AgentFormat, DiscoveredAgent};
use crate::discovery::context::{ScanContext, SourceFile};
use crate::discovery::error::DiscoveryError;

const CANDIDATE_EXTENSIONS: &[&str] = &[
    "py", "ts", "js", "mjs", "rs", "go", "java", "yaml", "yml", "json", "toml",
];

/// `agent`, `agent-x`, `x_agent`, `x.agent` (case-insensitive) or a
/// camelCase `FooAgent`.
static AGENT_STEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:^|[-_.])agent(?:$|[-_.])").unwrap());
static CAMEL_AGENT_STEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z0-9]Agent$").unwrap());

pub fn looks_like_agent(stem: &str) -> bool {
    AGENT_STEM.is_match(stem) || CAMEL_AGENT_STEM.is_match(stem)
}

pub struct HeuristicScanner {
    confidence: f64,
}

impl HeuristicScanner {
    /// The confidence is capped at [`MAX_HEURISTIC_CONFIDENCE`].
    pub fn new(confidence: f64) -> Self {
        Self {
            confidence: confidence.min(MAX_HEURISTIC_CONFIDENCE),
        }
    }

    fn candidate(&self, file: &SourceFile) -> Option<DiscoveredAgent> {
        if !file.has_extension(CANDIDATE_EXTENSIONS) || !looks_like_agent(file.stem()) {
            return None;
        }
        Some(
            DiscoveredAgent::new(
                agent_id(None, file),
                file.stem().to_string(),
                AgentFormat::Unknown,
                file.path.clone(),
                self.confidence,
            )
            .with_metadata("match", Value::String("filename".to_string())),
        )
    }
}

#[async_trait]
impl FormatScanner for HeuristicScanner {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn format(&self) -> AgentFormat {
        AgentFormat::Unknown
    }

    async fn scan(&self, ctx: &ScanContext) -> Result<Vec<DiscoveredAgent>, DiscoveryError> {
        let mut agents = Vec::new();
        for file in &ctx.files {
            if ctx.is_aborted() {
                break;
            }
            agents.extend(self.candidate(file));
        }
        Ok(agents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_looks_like_agent() {
        for stem in ["agent", "research-agent", "research_agent", "agent-config", "ResearchAgent", "my.agent"] {
            assert!(looks_like_agent(stem), "{stem}");
        }
        for stem in ["agents_helper_x", "reagent", "agentic", "user_agents", "README"] {
            assert!(!looks_like_agent(stem), "{stem}");
        }
    }

    #[test]
    fn test_confidence_is_capped() {
        let scanner = HeuristicScanner::new(0.9);
        let file = SourceFile {
            path: PathBuf::from("/p/support_agent.py"),
            size: 1,
        };
        let agent = scanner.candidate(&file).unwrap();
        assert_eq!(agent.format, AgentFormat::Unknown);
        assert!(agent.confidence <= 0.3);
        assert_eq!(agent.id, "support-agent");

        let readme = SourceFile {
            path: PathBuf::from("/p/agent.md"),
            size: 1,
        };
        assert!(scanner.candidate(&readme).is_none());
    }
}
