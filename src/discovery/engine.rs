//! Discovery engine: run every scanner concurrently over one shared walk,
//! then merge results deterministically.

use futures::future::join_all;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use super::agent::{AgentFormat, DiscoveredAgent};
use super::context::{AbortSignal, ScanContext};
use super::error::DiscoveryError;
use super::scanners::{default_scanners, FormatScanner};
use crate::config::DiscoveryConfig;

/// Outcome of one discovery pass.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryReport {
    /// Deduplicated, sorted by confidence descending.
    pub agents: Vec<DiscoveredAgent>,
    /// Scanners that returned an error or panicked.
    pub failed_scanners: Vec<String>,
    pub files_scanned: usize,
    pub duration_ms: u64,
    pub aborted: bool,
}

/// Read-only scanner of project trees.
pub struct DiscoveryEngine {
    config: DiscoveryConfig,
    scanners: Vec<Arc<dyn FormatScanner>>,
    abort: AbortSignal,
}

impl DiscoveryEngine {
    /// Engine with the built-in scanners.
    pub fn new(config: DiscoveryConfig) -> Self {
        let scanners = default_scanners(&config.confidence);
        Self::with_scanners(config, scanners)
    }

    /// Engine with an explicit scanner list; list order is the tie-break order.
    pub fn with_scanners(config: DiscoveryConfig, scanners: Vec<Arc<dyn FormatScanner>>) -> Self {
        Self {
            config,
            scanners,
            abort: AbortSignal::new(),
        }
    }

    /// Append a scanner after the existing ones.
    pub fn add_scanner(&mut self, scanner: Arc<dyn FormatScanner>) {
        self.scanners.push(scanner);
    }

    pub fn scanner_names(&self) -> Vec<String> {
        self.scanners.iter().map(|s| s.name().to_string()).collect()
    }

    /// Handle that aborts the current (or next) pass of this engine.
    ///
    /// The flag is lowered when the aborted pass returns, so later passes
    /// run to completion.
    pub fn abort_signal(&self) -> AbortSignal {
        self.abort.clone()
    }

    /// Discover agents under `root`. Never writes to the filesystem.
    pub async fn discover_all(&self, root: impl AsRef<Path>) -> Result<Vec<DiscoveredAgent>, DiscoveryError> {
        Ok(self.discover_with_report(root).await?.agents)
    }

    /// Like [`discover_all`](Self::discover_all), with pass statistics.
    ///
    /// Only an unusable root is an error. Failing scanners are listed in the
    /// report and contribute nothing.
    pub async fn discover_with_report(
        &self,
        root: impl AsRef<Path>,
    ) -> Result<DiscoveryReport, DiscoveryError> {
        let root = root.as_ref();
        let started = Instant::now();
        log::info!(
            "Discovering agents under {} with {} scanners",
            root.display(),
            self.scanners.len()
        );

        let ctx = Arc::new(ScanContext::build(root, &self.config, self.abort.clone()).await?);
        let files_scanned = ctx.files.len();

        let handles: Vec<_> = self
            .scanners
            .iter()
            .map(|scanner| {
                let scanner = Arc::clone(scanner);
                let ctx = Arc::clone(&ctx);
                tokio::spawn(async move { scanner.scan(&ctx).await })
            })
            .collect();

        let mut per_scanner = Vec::with_capacity(handles.len());
        let mut failed_scanners = Vec::new();
        for (scanner, outcome) in self.scanners.iter().zip(join_all(handles).await) {
            match outcome {
                Ok(Ok(agents)) => {
                    log::debug!("Scanner '{}' found {} agents", scanner.name(), agents.len());
                    per_scanner.push(agents);
                }
                Ok(Err(e)) => {
                    log::warn!("Scanner '{}' failed: {}", scanner.name(), e);
                    failed_scanners.push(scanner.name().to_string());
                    per_scanner.push(Vec::new());
                }
                Err(e) => {
                    log::warn!("Scanner '{}' panicked: {}", scanner.name(), e);
                    failed_scanners.push(scanner.name().to_string());
                    per_scanner.push(Vec::new());
                }
            }
        }

        let agents = merge_results(per_scanner);
        let duration_ms = started.elapsed().as_millis() as u64;
        let aborted = self.abort.is_aborted();
        if aborted {
            self.abort.reset();
        }
        log::info!(
            "Discovery finished: {} agents from {} files in {}ms{}",
            agents.len(),
            files_scanned,
            duration_ms,
            if aborted { " (aborted)" } else { "" }
        );

        Ok(DiscoveryReport {
            agents,
            failed_scanners,
            files_scanned,
            duration_ms,
            aborted,
        })
    }
}

/// Merge per-scanner results (given in declaration order).
///
/// 1. Dedup by `(source_path, id)`: higher confidence replaces the earlier
///    entry in place; equal confidence keeps the earlier scanner's entry.
/// 2. Drop heuristic hits for files a format scanner already recognised.
/// 3. Stable sort by confidence descending.
fn merge_results(per_scanner: Vec<Vec<DiscoveredAgent>>) -> Vec<DiscoveredAgent> {
    let mut merged: Vec<DiscoveredAgent> = Vec::new();
    let mut index: HashMap<(PathBuf, String), usize> = HashMap::new();

    for agent in per_scanner.into_iter().flatten() {
        let key = (agent.source_path.clone(), agent.id.clone());
        match index.get(&key) {
            Some(&slot) => {
                if agent.confidence > merged[slot].confidence {
                    merged[slot] = agent;
                }
            }
            None => {
                index.insert(key, merged.len());
                merged.push(agent);
            }
        }
    }

    let recognised: HashSet<PathBuf> = merged
        .iter()
        .filter(|a| a.format != AgentFormat::Unknown)
        .map(|a| a.source_path.clone())
        .collect();
    merged.retain(|a| a.format != AgentFormat::Unknown || !recognised.contains(&a.source_path));

    merged.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::fs;

    struct FailingScanner;

    #[async_trait]
    impl FormatScanner for FailingScanner {
        fn name(&self) -> &str {
            "always-fails"
        }
        fn format(&self) -> AgentFormat {
            AgentFormat::Unknown
        }
        async fn scan(&self, _ctx: &ScanContext) -> Result<Vec<DiscoveredAgent>, DiscoveryError> {
            Err(DiscoveryError::Scanner {
                scanner: "always-fails".into(),
                message: "boom".into(),
            })
        }
    }

    struct PanickingScanner;

    #[async_trait]
    impl FormatScanner for PanickingScanner {
        fn name(&self) -> &str {
            "panics"
        }
        fn format(&self) -> AgentFormat {
            AgentFormat::Unknown
        }
        async fn scan(&self, _ctx: &ScanContext) -> Result<Vec<DiscoveredAgent>, DiscoveryError> {
            panic!("scanner bug");
        }
    }

    /// Reports a fixed list regardless of the tree.
    struct FixedScanner(Vec<DiscoveredAgent>);

    #[async_trait]
    impl FormatScanner for FixedScanner {
        fn name(&self) -> &str {
            "fixed"
        }
        fn format(&self) -> AgentFormat {
            AgentFormat::Ossa
        }
        async fn scan(&self, _ctx: &ScanContext) -> Result<Vec<DiscoveredAgent>, DiscoveryError> {
            Ok(self.0.clone())
        }
    }

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("research.ossa.yaml"),
            "apiVersion: ossa/v0.3.0\nkind: Agent\nmetadata:\n  name: research\nspec:\n  capabilities: [search]\n",
        )
        .unwrap();
        fs::write(
            dir.path().join(".mcp.json"),
            r#"{"mcpServers": {"files": {"command": "fs-server"}}}"#,
        )
        .unwrap();
        fs::write(dir.path().join("support_agent.py"), "print('hi')\n").unwrap();
        fs::write(
            dir.path().join("lc_agent.py"),
            "from langchain.agents import AgentExecutor\nexecutor = AgentExecutor(agent=a, tools=[])\n",
        )
        .unwrap();
        dir
    }

    #[tokio::test]
    async fn test_discover_all_sorted_by_confidence() {
        let dir = project();
        let engine = DiscoveryEngine::new(DiscoveryConfig::default());
        let agents = engine.discover_all(dir.path()).await.unwrap();

        let summary: Vec<(&str, AgentFormat)> =
            agents.iter().map(|a| (a.id.as_str(), a.format)).collect();
        assert_eq!(
            summary,
            vec![
                ("research", AgentFormat::Ossa),
                ("files", AgentFormat::Mcp),
                ("lc-agent", AgentFormat::LangChain),
                ("support-agent", AgentFormat::Unknown),
            ]
        );
        assert!(agents.windows(2).all(|w| w[0].confidence >= w[1].confidence));
    }

    #[tokio::test]
    async fn test_failing_scanners_are_isolated() {
        let dir = project();
        let config = DiscoveryConfig::default();
        let mut scanners = vec![
            Arc::new(FailingScanner) as Arc<dyn FormatScanner>,
            Arc::new(PanickingScanner),
        ];
        scanners.extend(default_scanners(&config.confidence));
        let engine = DiscoveryEngine::with_scanners(config, scanners);

        let report = engine.discover_with_report(dir.path()).await.unwrap();
        assert_eq!(report.failed_scanners, vec!["always-fails", "panics"]);
        assert_eq!(report.agents.len(), 4);
        assert_eq!(report.files_scanned, 4);
    }

    #[tokio::test]
    async fn test_repeated_discovery_is_stable() {
        let dir = project();
        let engine = DiscoveryEngine::new(DiscoveryConfig::default());
        let first = engine.discover_all(dir.path()).await.unwrap();
        let second = engine.discover_all(dir.path()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_abort_stops_only_the_current_pass() {
        let dir = project();
        let engine = DiscoveryEngine::new(DiscoveryConfig::default());
        engine.abort_signal().abort();
        let report = engine.discover_with_report(dir.path()).await.unwrap();
        assert!(report.aborted);
        assert!(report.agents.is_empty());

        let next = engine.discover_with_report(dir.path()).await.unwrap();
        assert!(!next.aborted);
        assert_eq!(next.agents.len(), 4);
    }

    #[tokio::test]
    async fn test_custom_scanner_tie_break_by_declaration_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = DiscoveredAgent::new("a", "first", AgentFormat::Ossa, "/x/a.yaml", 0.7);
        let second = DiscoveredAgent::new("a", "second", AgentFormat::Ossa, "/x/a.yaml", 0.7);
        let engine = DiscoveryEngine::with_scanners(
            DiscoveryConfig::default(),
            vec![
                Arc::new(FixedScanner(vec![first])),
                Arc::new(FixedScanner(vec![second])),
            ],
        );
        let agents = engine.discover_all(dir.path()).await.unwrap();
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].name, "first");
    }

    #[test]
    fn test_merge_dedup_and_ordering() {
        let path = PathBuf::from("/p/agent.yaml");
        let low = DiscoveredAgent::new("x", "low", AgentFormat::LangChain, &path, 0.7);
        let other = DiscoveredAgent::new("y", "other", AgentFormat::CrewAi, "/p/other.py", 0.7);
        let high = DiscoveredAgent::new("x", "high", AgentFormat::Ossa, &path, 0.9);
        let tie = DiscoveredAgent::new("x", "tie", AgentFormat::OpenAi, &path, 0.9);
        let unknown = DiscoveredAgent::new("agent", "agent", AgentFormat::Unknown, &path, 0.3);
        let unclaimed = DiscoveredAgent::new("z-agent", "z", AgentFormat::Unknown, "/p/z_agent.py", 0.3);

        let merged = merge_results(vec![
            vec![low, other],
            vec![high, tie],
            vec![unknown, unclaimed],
        ]);
        let names: Vec<&str> = merged.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["high", "other", "z"]);
    }
}
