//! Collapse a source list to one entry per URL.

use std::collections::HashMap;

use chatstream_core::types::Source;
use serde::{Deserialize, Serialize};

/// Original source index -> deduplicated index. Every original index has
/// exactly one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMap(Vec<usize>);

impl IndexMap {
    pub fn get(&self, original: usize) -> Option<usize> {
        self.0.get(original).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `(original, filtered)` pairs in original order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.0.iter().copied().enumerate()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupResult {
    /// Unique by URL, in first-occurrence order.
    pub filtered: Vec<Source>,
    pub index_map: IndexMap,
}

impl DedupResult {
    /// The deduplicated source an original index refers to.
    pub fn source_for(&self, original: usize) -> Option<(usize, &Source)> {
        let idx = self.index_map.get(original)?;
        self.filtered.get(idx).map(|s| (idx, s))
    }
}

/// Repeats of a URL map to the slot of its first occurrence. Sources without
/// a URL share a single slot.
pub fn dedup(sources: &[Source]) -> DedupResult {
    let mut filtered: Vec<Source> = Vec::new();
    let mut by_url: HashMap<Option<&str>, usize> = HashMap::new();
    let mut index_map = Vec::with_capacity(sources.len());
    for source in sources {
        let slot = *by_url.entry(source.url.as_deref()).or_insert_with(|| {
            filtered.push(source.clone());
            filtered.len() - 1
        });
        index_map.push(slot);
    }
    DedupResult { filtered, index_map: IndexMap(index_map) }
}
