//! Query filters for [`Registry::discover`](super::Registry::discover).

use regex::Regex;
use std::collections::BTreeSet;

use super::error::RegistryError;
use super::record::RegistryItem;

/// AND-composed filter. An empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryFilter {
    /// Every tag must be present on the item.
    pub tags: BTreeSet<String>,
    /// Matched against the item's name (unanchored).
    pub name_pattern: Option<Regex>,
    pub min_confidence: Option<f64>,
    /// Substring of the item's source path. Items without one never match.
    pub source_path_contains: Option<String>,
    pub limit: Option<usize>,
}

impl DiscoveryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter on a single tag.
    pub fn tag(tag: impl Into<String>) -> Self {
        Self::new().with_tag(tag)
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Compile `pattern` as the name filter.
    pub fn with_name_pattern(mut self, pattern: &str) -> Result<Self, RegistryError> {
        self.name_pattern = Some(Regex::new(pattern)?);
        Ok(self)
    }

    pub fn with_min_confidence(mut self, min: f64) -> Self {
        self.min_confidence = Some(min);
        self
    }

    pub fn with_source_path_contains(mut self, fragment: impl Into<String>) -> Self {
        self.source_path_contains = Some(fragment.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches<T: RegistryItem>(&self, item: &T) -> bool {
        if !self.tags.iter().all(|t| item.tags().contains(t)) {
            return false;
        }
        if let Some(pattern) = &self.name_pattern {
            if !pattern.is_match(item.name()) {
                return false;
            }
        }
        if let Some(min) = self.min_confidence {
            if item.confidence() < min {
                return false;
            }
        }
        if let Some(fragment) = &self.source_path_contains {
            let hit = item
                .source_path()
                .map_or(false, |p| p.to_string_lossy().contains(fragment.as_str()));
            if !hit {
                return false;
            }
        }
        true
    }
}
