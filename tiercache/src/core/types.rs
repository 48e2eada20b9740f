use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// Keys accepted by every layer of a tiered cache
pub trait CacheKey: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static {}

impl<T> CacheKey for T where T: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static {}

/// Values accepted by every layer of a tiered cache
pub trait CacheValue: Clone + Send + Sync + 'static {}

impl<T> CacheValue for T where T: Clone + Send + Sync + 'static {}

/// Position of a layer inside the tiered chain.
///
/// Levels are 1-based: level 1 is the fastest layer. Every store call,
/// decorator and policy predicate receives the `LevelInfo` of the layer
/// being addressed, so none of them need to know about the chain itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LevelInfo {
    level: usize,
    name: Arc<str>,
}

impl LevelInfo {
    /// Create level info for a 1-based level
    pub fn new(level: usize, name: impl Into<Arc<str>>) -> Self {
        Self {
            level,
            name: name.into(),
        }
    }

    /// Level info for a store used outside of a tiered chain
    pub fn detached(name: impl Into<Arc<str>>) -> Self {
        Self::new(0, name)
    }

    /// 1-based level (0 when detached)
    pub fn level(&self) -> usize {
        self.level
    }

    /// Name of the store at this level
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for LevelInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}({})", self.level, self.name)
    }
}

/// Result of a batch read against a single layer
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<K: CacheKey, V> {
    /// Keys the layer holds, with their values
    pub found: HashMap<K, V>,
    /// Requested keys the layer does not hold
    pub missing: Vec<K>,
}

impl<K: CacheKey, V> Fetched<K, V> {
    /// Nothing found, every requested key missing
    pub fn all_missing(keys: &[K]) -> Self {
        Self {
            found: HashMap::new(),
            missing: keys.to_vec(),
        }
    }

    /// Split the requested keys into found/missing given what a layer returned.
    ///
    /// Entries for keys that were not requested are dropped.
    pub fn partition(keys: &[K], mut returned: HashMap<K, V>) -> Self {
        let mut found = HashMap::with_capacity(returned.len());
        let mut missing = Vec::new();

        for key in keys {
            match returned.remove_entry(key) {
                Some((k, v)) => {
                    found.insert(k, v);
                }
                None => missing.push(key.clone()),
            }
        }

        Self { found, missing }
    }

    /// True when every requested key was found
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// De-duplicate keys, keeping the first occurrence of each
pub fn unique_keys<K: CacheKey>(keys: &[K]) -> Vec<K> {
    let mut seen = HashSet::with_capacity(keys.len());
    keys.iter()
        .filter(|key| seen.insert(*key))
        .cloned()
        .collect()
}
