use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::core::{CacheKey, CacheValue, Fetched, LevelInfo, Result};
use crate::store::{CacheStore, Decorator, SharedStore, decorator};

/// Logs every call to the wrapped store
pub struct LoggingStore<K: CacheKey, V: CacheValue> {
    next: SharedStore<K, V>,
}

impl<K: CacheKey, V: CacheValue> LoggingStore<K, V> {
    pub fn new(next: SharedStore<K, V>) -> Self {
        Self { next }
    }
}

/// Decorator that wraps each layer in a [`LoggingStore`]
pub fn logging_decorator<K: CacheKey, V: CacheValue>() -> Decorator<K, V> {
    decorator(|next: SharedStore<K, V>| -> SharedStore<K, V> {
        Arc::new(LoggingStore::new(next))
    })
}

#[async_trait]
impl<K: CacheKey, V: CacheValue> CacheStore<K, V> for LoggingStore<K, V> {
    fn name(&self) -> &str {
        self.next.name()
    }

    async fn batch_get(&self, info: LevelInfo, keys: &[K]) -> Result<Fetched<K, V>> {
        let start = Instant::now();
        debug!(level = info.level(), store = info.name(), ?keys, "-> batch_get");

        let result = self.next.batch_get(info.clone(), keys).await;
        match &result {
            Ok(fetched) => debug!(
                level = info.level(),
                store = info.name(),
                found = fetched.found.len(),
                missing = ?fetched.missing,
                elapsed = ?start.elapsed(),
                "<- batch_get"
            ),
            Err(err) => warn!(
                level = info.level(),
                store = info.name(),
                error = %err,
                elapsed = ?start.elapsed(),
                "<- batch_get failed"
            ),
        }
        result
    }

    async fn batch_set(&self, info: LevelInfo, entries: &HashMap<K, V>) -> Result<()> {
        let start = Instant::now();
        debug!(
            level = info.level(),
            store = info.name(),
            keys = ?entries.keys().collect::<Vec<_>>(),
            "-> batch_set"
        );

        let result = self.next.batch_set(info.clone(), entries).await;
        log_write("batch_set", &info, &result, start);
        result
    }

    async fn batch_delete(&self, info: LevelInfo, keys: &[K]) -> Result<()> {
        let start = Instant::now();
        debug!(level = info.level(), store = info.name(), ?keys, "-> batch_delete");

        let result = self.next.batch_delete(info.clone(), keys).await;
        log_write("batch_delete", &info, &result, start);
        result
    }
}

fn log_write(op: &str, info: &LevelInfo, result: &Result<()>, start: Instant) {
    match result {
        Ok(()) => debug!(
            level = info.level(),
            store = info.name(),
            elapsed = ?start.elapsed(),
            "<- {} ok",
            op
        ),
        Err(err) => warn!(
            level = info.level(),
            store = info.name(),
            error = %err,
            elapsed = ?start.elapsed(),
            "<- {} failed",
            op
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemoryStore;

    #[tokio::test]
    async fn test_logging_store_is_transparent() {
        let inner: SharedStore<String, u32> = Arc::new(MemoryStore::new(16).with_name("memory"));
        let logged = logging_decorator::<String, u32>()(inner.clone());
        let info = LevelInfo::new(1, "memory");

        assert_eq!(logged.name(), "memory");

        logged
            .batch_set(info.clone(), &HashMap::from([("a".to_string(), 1)]))
            .await
            .unwrap();
        let fetched = logged
            .batch_get(info.clone(), &["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(fetched.found.get("a"), Some(&1));
        assert_eq!(fetched.missing, vec!["b".to_string()]);

        logged.batch_delete(info.clone(), &["a".to_string()]).await.unwrap();
        let fetched = inner.batch_get(info, &["a".to_string()]).await.unwrap();
        assert!(fetched.found.is_empty());
    }
}
