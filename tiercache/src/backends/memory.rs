use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::core::{CacheKey, CacheValue, Fetched, LevelInfo, Result};
use crate::store::CacheStore;

/// In-process cache layer: bounded LRU with an optional TTL per entry.
///
/// The TTL restarts on every read hit, so keys that keep being read stay
/// cached and idle keys expire.
#[derive(Clone)]
pub struct MemoryStore<K: CacheKey, V: CacheValue> {
    name: Arc<str>,

    /// LRU data
    lru: Arc<RwLock<LruCache<K, V>>>,

    /// Idle time after which an entry expires (None = no expiry)
    ttl: Option<Duration>,

    /// Cache statistics
    stats: Arc<RwLock<MemoryStats>>,
}

/// LRU Cache implementation.
///
/// Recency is tracked with sequence numbers: a touch pushes a fresh
/// `(key, seq)` pair and leaves the old one behind as a stale marker,
/// skipped on eviction and dropped when the queue is compacted.
struct LruCache<K, V> {
    /// Cache data
    data: HashMap<K, Entry<V>>,

    /// LRU ordering (most recent at back), may hold stale markers
    lru_order: VecDeque<(K, u64)>,

    /// Next sequence number
    next_seq: u64,

    /// Maximum number of entries
    max_entries: usize,
}

#[derive(Clone)]
struct Entry<V> {
    value: V,
    expires_at: Option<Instant>,
    seq: u64,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Memory layer statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub entries: usize,
}

impl MemoryStats {
    /// Calculate hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl<K: CacheKey, V: CacheValue> LruCache<K, V> {
    fn bump(&mut self, key: &K) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.lru_order.push_back((key.clone(), seq));
        seq
    }

    /// Mark `key` as most recently used
    fn touch(&mut self, key: &K) {
        let seq = self.bump(key);
        if let Some(entry) = self.data.get_mut(key) {
            entry.seq = seq;
        }
        self.maybe_compact();
    }

    fn insert(&mut self, key: K, value: V, expires_at: Option<Instant>) {
        let seq = self.bump(&key);
        self.data.insert(
            key,
            Entry {
                value,
                expires_at,
                seq,
            },
        );
        self.maybe_compact();
    }

    /// Remove and return the least recently used key
    fn evict_lru(&mut self) -> Option<K> {
        while let Some((key, seq)) = self.lru_order.pop_front() {
            if self.data.get(&key).is_some_and(|entry| entry.seq == seq) {
                self.data.remove(&key);
                return Some(key);
            }
        }
        None
    }

    fn remove(&mut self, key: &K) -> bool {
        self.data.remove(key).is_some()
    }

    /// Drop stale markers once they outnumber the live entries
    fn maybe_compact(&mut self) {
        if self.lru_order.len() <= self.max_entries * 2 {
            return;
        }
        let data = &self.data;
        self.lru_order
            .retain(|(key, seq)| data.get(key).is_some_and(|entry| entry.seq == *seq));
    }

    fn clear(&mut self) {
        self.data.clear();
        self.lru_order.clear();
    }
}

impl<K: CacheKey, V: CacheValue> MemoryStore<K, V> {
    /// Create a memory layer holding at most `max_entries` entries
    pub fn new(max_entries: usize) -> Self {
        Self {
            name: Arc::from("memory"),
            lru: Arc::new(RwLock::new(LruCache {
                data: HashMap::new(),
                lru_order: VecDeque::new(),
                next_seq: 0,
                max_entries: max_entries.max(1),
            })),
            ttl: None,
            stats: Arc::new(RwLock::new(MemoryStats::default())),
        }
    }

    /// Expire entries not read or written for `ttl`
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Look up a single key, dropping it if expired.
    ///
    /// A hit restarts the entry's TTL.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let mut lru = self.lru.write();
        let mut stats = self.stats.write();

        let is_expired = match lru.data.get(key) {
            Some(entry) => entry.is_expired(now),
            None => {
                stats.misses += 1;
                return None;
            }
        };

        if is_expired {
            lru.remove(key);
            stats.expirations += 1;
            stats.misses += 1;
            stats.entries = lru.data.len();
            return None;
        }

        lru.touch(key);
        stats.hits += 1;
        let entry = lru.data.get_mut(key)?;
        if let Some(ttl) = self.ttl {
            entry.expires_at = Some(now + ttl);
        }
        Some(entry.value.clone())
    }

    /// Insert or replace an entry, evicting the least recently used ones when full
    pub fn put(&self, key: K, value: V) {
        let mut lru = self.lru.write();
        let mut stats = self.stats.write();

        if !lru.data.contains_key(&key) {
            while lru.data.len() >= lru.max_entries {
                let Some(evict_key) = lru.evict_lru() else {
                    break;
                };
                stats.evictions += 1;
                debug!(store = %self.name, key = ?evict_key, "memory layer evict");
            }
        }

        let expires_at = self.ttl.map(|ttl| Instant::now() + ttl);
        lru.insert(key, value, expires_at);
        stats.entries = lru.data.len();
    }

    /// Remove a single key
    pub fn remove(&self, key: &K) -> bool {
        let mut lru = self.lru.write();
        let removed = lru.remove(key);
        self.stats.write().entries = lru.data.len();
        removed
    }

    /// Invalidate (clear) the entire layer
    pub fn clear(&self) {
        let mut lru = self.lru.write();
        let count = lru.data.len();
        lru.clear();
        self.stats.write().entries = 0;
        debug!(store = %self.name, entries = count, "memory layer cleared");
    }

    /// Number of entries held, including expired ones not yet dropped
    pub fn len(&self) -> usize {
        self.lru.read().data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get layer statistics
    pub fn stats(&self) -> MemoryStats {
        self.stats.read().clone()
    }
}

#[async_trait]
impl<K: CacheKey, V: CacheValue> CacheStore<K, V> for MemoryStore<K, V> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn batch_get(&self, _info: LevelInfo, keys: &[K]) -> Result<Fetched<K, V>> {
        let mut found = HashMap::with_capacity(keys.len());
        let mut missing = Vec::new();
        for key in keys {
            match self.get(key) {
                Some(value) => {
                    found.insert(key.clone(), value);
                }
                None => missing.push(key.clone()),
            }
        }
        Ok(Fetched { found, missing })
    }

    async fn batch_set(&self, _info: LevelInfo, entries: &HashMap<K, V>) -> Result<()> {
        for (key, value) in entries {
            self.put(key.clone(), value.clone());
        }
        Ok(())
    }

    async fn batch_delete(&self, _info: LevelInfo, keys: &[K]) -> Result<()> {
        for key in keys {
            self.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get() {
        let cache = MemoryStore::new(100);

        cache.put("key1".to_string(), vec![1, 2, 3]);
        assert_eq!(cache.get(&"key1".to_string()), Some(vec![1, 2, 3]));
        assert_eq!(cache.get(&"nope".to_string()), None);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_lru_eviction() {
        let cache = MemoryStore::new(2);

        cache.put(1, "a");
        cache.put(2, "b");
        // Touch 1 so 2 becomes least recently used
        assert_eq!(cache.get(&1), Some("a"));
        cache.put(3, "c");

        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.get(&1), Some("a"));
        assert_eq!(cache.get(&3), Some("c"));
        assert_eq!(cache.stats().evictions, 1);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let cache = MemoryStore::new(2);

        cache.put(1, "a");
        cache.put(2, "b");
        cache.put(1, "z");

        assert_eq!(cache.get(&1), Some("z"));
        assert_eq!(cache.get(&2), Some("b"));
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_ttl_expiration() {
        let cache = MemoryStore::new(10).with_ttl(Duration::from_millis(20));

        cache.put("k", 1);
        assert_eq!(cache.get(&"k"), Some(1));

        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.get(&"k"), None);
        assert_eq!(cache.stats().expirations, 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_reads_keep_entry_alive() {
        let cache = MemoryStore::new(10).with_ttl(Duration::from_millis(60));
        cache.put("hot", 1);
        cache.put("idle", 2);

        for _ in 0..5 {
            std::thread::sleep(Duration::from_millis(25));
            assert_eq!(cache.get(&"hot"), Some(1));
        }

        assert_eq!(cache.get(&"idle"), None);
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn test_eviction_order_survives_many_touches() {
        let cache = MemoryStore::new(3);
        cache.put(1, "a");
        cache.put(2, "b");
        cache.put(3, "c");

        // Enough touches to force the order queue to compact
        for _ in 0..10 {
            assert_eq!(cache.get(&1), Some("a"));
            assert_eq!(cache.get(&3), Some("c"));
        }
        assert!(cache.remove(&3));
        cache.put(4, "d");
        cache.put(5, "e");

        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.get(&1), Some("a"));
        assert_eq!(cache.get(&4), Some("d"));
        assert_eq!(cache.get(&5), Some("e"));
        assert_eq!(cache.stats().evictions, 1);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_remove_and_clear() {
        let cache = MemoryStore::new(10);
        cache.put("a", 1);
        cache.put("b", 2);

        assert!(cache.remove(&"a"));
        assert!(!cache.remove(&"a"));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().entries, 0);
    }

    #[tokio::test]
    async fn test_store_contract() {
        let cache = MemoryStore::new(10).with_name("l1");
        let info = LevelInfo::new(1, "l1");

        cache
            .batch_set(info.clone(), &HashMap::from([("a", 1), ("b", 2)]))
            .await
            .unwrap();
        let fetched = cache.batch_get(info.clone(), &["a", "c"]).await.unwrap();
        assert_eq!(fetched.found, HashMap::from([("a", 1)]));
        assert_eq!(fetched.missing, vec!["c"]);

        cache.batch_delete(info.clone(), &["a", "b"]).await.unwrap();
        assert!(cache.is_empty());
        assert_eq!(CacheStore::<&str, i32>::name(&cache), "l1");
    }
}
