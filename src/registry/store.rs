//! The in-memory registry.
//!
//! Reads (`peek`, `discover`) share a read lock. `get` takes the write lock
//! because it updates access statistics. Registration is an upsert keyed by
//! id; identical registrations converge to the same state in any order,
//! apart from the statistics they preserve.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::error::RegistryError;
use super::filter::DiscoveryFilter;
use super::record::RegistryItem;

/// Reachability of a registered item, set by whoever monitors it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Offline,
    Active,
}

/// A registered item plus cache bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedEntry<T> {
    pub item: T,
    pub cached_at: DateTime<Utc>,
    pub access_count: u64,
    pub last_accessed: Option<DateTime<Utc>>,
    pub cache_key: String,
    #[serde(default)]
    pub status: AgentStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MostAccessed {
    pub id: String,
    pub access_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub total_agents: usize,
    /// `None` until something has been looked up.
    pub most_accessed: Option<MostAccessed>,
    pub last_discovery_timestamp: Option<DateTime<Utc>>,
}

struct RegistryState<T> {
    entries: HashMap<String, CachedEntry<T>>,
    last_discovery: Option<DateTime<Utc>>,
}

/// Thread-safe index of registry items keyed by id.
pub struct Registry<T: RegistryItem> {
    namespace: String,
    state: RwLock<RegistryState<T>>,
}

impl<T: RegistryItem> Registry<T> {
    /// Create an empty registry. `namespace` prefixes every cache key.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            state: RwLock::new(RegistryState {
                entries: HashMap::new(),
                last_discovery: None,
            }),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn cache_key(&self, id: &str) -> String {
        format!("{}:{}", self.namespace, id)
    }

    /// Insert or replace an item.
    ///
    /// When an entry with the same id exists, its `access_count`,
    /// `last_accessed` and `status` carry over to the new entry. Returns
    /// `true` if the id was not registered before.
    pub fn register(&self, item: T) -> bool {
        let now = Utc::now();
        let id = item.id().to_string();
        let mut state = self.state.write();
        state.last_discovery = Some(now);

        let previous = state.entries.get(&id);
        let is_new = previous.is_none();
        let (access_count, last_accessed, status) = previous
            .map(|old| (old.access_count, old.last_accessed, old.status))
            .unwrap_or((0, None, AgentStatus::Offline));

        let entry = CachedEntry {
            cache_key: self.cache_key(&id),
            item,
            cached_at: now,
            access_count,
            last_accessed,
            status,
        };
        state.entries.insert(id.clone(), entry);
        if is_new {
            log::debug!("Registered '{}' in {}", id, self.namespace);
        }
        is_new
    }

    /// Register a whole discovery pass. Returns the number of new ids.
    ///
    /// Ids absent from `items` stay registered.
    pub fn register_snapshot(&self, items: impl IntoIterator<Item = T>) -> usize {
        let added = items
            .into_iter()
            .map(|item| self.register(item))
            .filter(|is_new| *is_new)
            .count();
        log::info!("Registry '{}' now holds {} entries ({} new)", self.namespace, self.len(), added);
        added
    }

    /// Look up an entry and record the access. `None` for unknown ids.
    pub fn get(&self, id: &str) -> Option<CachedEntry<T>> {
        let mut state = self.state.write();
        let entry = state.entries.get_mut(id)?;
        entry.access_count += 1;
        entry.last_accessed = Some(Utc::now());
        Some(entry.clone())
    }

    /// Look up an entry without touching its statistics.
    pub fn peek(&self, id: &str) -> Option<CachedEntry<T>> {
        self.state.read().entries.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.state.read().entries.contains_key(id)
    }

    /// Entries matching `filter`, by confidence descending then id, truncated
    /// to `filter.limit`.
    pub fn discover(&self, filter: &DiscoveryFilter) -> Vec<CachedEntry<T>> {
        let state = self.state.read();
        let mut hits: Vec<CachedEntry<T>> = state
            .entries
            .values()
            .filter(|e| filter.matches(&e.item))
            .cloned()
            .collect();
        drop(state);

        hits.sort_by(|a, b| {
            b.item
                .confidence()
                .total_cmp(&a.item.confidence())
                .then_with(|| a.item.id().cmp(b.item.id()))
        });
        if let Some(limit) = filter.limit {
            hits.truncate(limit);
        }
        hits
    }

    /// Entries tagged `primary`; if there are none, entries for the first
    /// fallback tag that has any. Empty when no tag matches.
    pub fn discover_with_fallback(&self, primary: &str, fallbacks: &[&str]) -> Vec<CachedEntry<T>> {
        std::iter::once(primary)
            .chain(fallbacks.iter().copied())
            .map(|tag| (tag, self.discover(&DiscoveryFilter::tag(tag))))
            .find(|(_, hits)| !hits.is_empty())
            .map(|(tag, hits)| {
                if tag != primary {
                    log::info!("No entries tagged '{}', falling back to '{}'", primary, tag);
                }
                hits
            })
            .unwrap_or_default()
    }

    /// Set an entry's status. Returns `false` for unknown ids.
    pub fn update_agent_status(&self, id: &str, status: AgentStatus) -> bool {
        match self.state.write().entries.get_mut(id) {
            Some(entry) => {
                entry.status = status;
                true
            }
            None => false,
        }
    }

    pub fn get_stats(&self) -> RegistryStats {
        let state = self.state.read();
        let most_accessed = state
            .entries
            .values()
            .filter(|e| e.access_count > 0)
            .max_by(|a, b| {
                a.access_count
                    .cmp(&b.access_count)
                    .then_with(|| b.item.id().cmp(a.item.id()))
            })
            .map(|e| MostAccessed {
                id: e.item.id().to_string(),
                access_count: e.access_count,
            });
        RegistryStats {
            total_agents: state.entries.len(),
            most_accessed,
            last_discovery_timestamp: state.last_discovery,
        }
    }

    /// Drop every entry and all statistics.
    pub fn clear_cache(&self) {
        let mut state = self.state.write();
        let dropped = state.entries.len();
        state.entries.clear();
        state.last_discovery = None;
        log::info!("Cleared {} entries from registry '{}'", dropped, self.namespace);
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All items, ordered by id.
    pub fn snapshot(&self) -> Vec<T> {
        let mut items: Vec<T> = self.state.read().entries.values().map(|e| e.item.clone()).collect();
        items.sort_by(|a, b| a.id().cmp(b.id()));
        items
    }
}

impl<T: RegistryItem + Serialize + DeserializeOwned> Registry<T> {
    /// Serialize every entry (statistics included), ordered by id.
    pub fn to_json(&self) -> Result<String, RegistryError> {
        let state = self.state.read();
        let mut entries: Vec<&CachedEntry<T>> = state.entries.values().collect();
        entries.sort_by(|a, b| a.item.id().cmp(b.item.id()));
        Ok(serde_json::to_string_pretty(&entries)?)
    }

    /// Rebuild a registry from [`to_json`](Self::to_json) output.
    pub fn from_json(namespace: impl Into<String>, json: &str) -> Result<Self, RegistryError> {
        let entries: Vec<CachedEntry<T>> = serde_json::from_str(json)?;
        let registry = Self::new(namespace);
        {
            let mut state = registry.state.write();
            for mut entry in entries {
                let id = entry.item.id().to_string();
                entry.cache_key = registry.cache_key(&id);
                state.entries.insert(id, entry);
            }
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::TransportDescriptor;
    use crate::discovery::{AgentFormat, DiscoveredAgent};
    use crate::registry::RegistryRecord;
    use std::collections::BTreeSet;

    fn record(id: &str, tags: &[&str]) -> RegistryRecord {
        RegistryRecord {
            id: id.to_string(),
            name: format!("{id} server"),
            tags: tags.iter().map(|t| t.to_string()).collect::<BTreeSet<_>>(),
            endpoints: TransportDescriptor::network(format!("https://{id}.example.com")),
            tools: Vec::new(),
            resources: Vec::new(),
            agent_id: id.to_string(),
        }
    }

    fn agent(id: &str, path: &str, confidence: f64) -> DiscoveredAgent {
        DiscoveredAgent::new(id, id, AgentFormat::Ossa, path, confidence)
    }

    #[test]
    fn test_tag_discovery_scenario() {
        let registry = Registry::new("ossa");
        registry.register(record("a", &["test"]));
        registry.register(record("b", &["other"]));

        assert_eq!(registry.discover(&DiscoveryFilter::tag("test")).len(), 1);
        assert_eq!(registry.discover(&DiscoveryFilter::tag("nonexistent")).len(), 0);
    }

    #[test]
    fn test_idempotent_registration_preserves_stats() {
        let registry = Registry::new("ossa");
        let r = record("a", &["test"]);
        assert!(registry.register(r.clone()));
        registry.get("a");
        registry.get("a");
        registry.update_agent_status("a", AgentStatus::Active);

        assert!(!registry.register(r));
        let stats = registry.get_stats();
        assert_eq!(stats.total_agents, 1);
        let entry = registry.peek("a").unwrap();
        assert_eq!(entry.access_count, 2);
        assert!(entry.last_accessed.is_some());
        assert_eq!(entry.status, AgentStatus::Active);
        assert_eq!(entry.cache_key, "ossa:a");
    }

    #[test]
    fn test_reregistration_overwrites_item() {
        let registry = Registry::new("ossa");
        registry.register(record("a", &["old"]));
        registry.register(record("a", &["new"]));
        assert!(registry.discover(&DiscoveryFilter::tag("old")).is_empty());
        assert_eq!(registry.discover(&DiscoveryFilter::tag("new")).len(), 1);
    }

    #[test]
    fn test_get_unknown_is_none() {
        let registry: Registry<RegistryRecord> = Registry::new("ossa");
        assert!(registry.get("missing").is_none());
        assert!(!registry.update_agent_status("missing", AgentStatus::Active));
    }

    #[test]
    fn test_peek_does_not_count() {
        let registry = Registry::new("ossa");
        registry.register(record("a", &[]));
        registry.peek("a");
        assert_eq!(registry.peek("a").unwrap().access_count, 0);
        assert_eq!(registry.get_stats().most_accessed, None);
    }

    #[test]
    fn test_fallback_discovery() {
        let registry = Registry::new("ossa");
        registry.register(record("p", &["primary"]));
        registry.register(record("f", &["fallback"]));

        let hits = registry.discover_with_fallback("primary", &["fallback"]);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item.id, "p");

        let hits = registry.discover_with_fallback("missing", &["nothing", "fallback"]);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item.id, "f");

        assert!(registry.discover_with_fallback("missing", &["nothing"]).is_empty());
    }

    #[test]
    fn test_composed_filters_and_ordering() {
        let registry = Registry::new("agents");
        registry.register(agent("low", "/repo/agents/low.py", 0.3));
        registry.register(agent("mid", "/repo/agents/mid.yaml", 0.7));
        registry.register(agent("high-b", "/repo/agents/b.yaml", 0.9));
        registry.register(agent("high-a", "/repo/other/a.yaml", 0.9));

        let ids = |hits: Vec<CachedEntry<DiscoveredAgent>>| -> Vec<String> {
            hits.into_iter().map(|e| e.item.id).collect()
        };

        assert_eq!(
            ids(registry.discover(&DiscoveryFilter::new())),
            vec!["high-a", "high-b", "mid", "low"]
        );
        assert_eq!(
            ids(registry.discover(&DiscoveryFilter::new().with_min_confidence(0.7).with_source_path_contains("/agents/"))),
            vec!["high-b", "mid"]
        );
        let by_name = DiscoveryFilter::new().with_name_pattern("^high").unwrap().with_limit(1);
        assert_eq!(ids(registry.discover(&by_name)), vec!["high-a"]);
        assert_eq!(
            ids(registry.discover(&DiscoveryFilter::tag("ossa").with_tag("missing"))),
            Vec::<String>::new()
        );
    }

    #[test]
    fn test_invalid_name_pattern() {
        assert!(matches!(
            DiscoveryFilter::new().with_name_pattern("(unclosed"),
            Err(RegistryError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_stats_and_clear() {
        let registry = Registry::new("ossa");
        assert_eq!(registry.get_stats().last_discovery_timestamp, None);
        registry.register_snapshot(vec![record("a", &[]), record("b", &[])]);
        registry.get("b");
        registry.get("b");
        registry.get("a");

        let stats = registry.get_stats();
        assert_eq!(stats.total_agents, 2);
        assert_eq!(
            stats.most_accessed,
            Some(MostAccessed {
                id: "b".into(),
                access_count: 2
            })
        );
        assert!(stats.last_discovery_timestamp.is_some());

        registry.clear_cache();
        assert!(registry.is_empty());
        assert_eq!(registry.get_stats().most_accessed, None);
    }

    #[test]
    fn test_json_round_trip_keeps_statistics() {
        let registry = Registry::new("ossa");
        registry.register(record("a", &["test"]));
        registry.get("a");
        let json = registry.to_json().unwrap();

        let restored: Registry<RegistryRecord> = Registry::from_json("ossa", &json).unwrap();
        assert_eq!(restored.snapshot(), registry.snapshot());
        assert_eq!(restored.peek("a").unwrap().access_count, 1);
    }

    #[test]
    fn test_concurrent_registration_converges() {
        use std::sync::Arc;
        let registry = Arc::new(Registry::new("ossa"));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        registry.register(record(&format!("r{}", i % 10), &["test"]));
                        registry.get("r0");
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(registry.len(), 10);
        assert_eq!(registry.peek("r0").unwrap().access_count, 400);
    }
}
