use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::core::{CacheKey, CacheValue, Fetched, LevelInfo, Result};
use crate::metrics::{record_layer_keys, record_layer_op};
use crate::store::{CacheStore, Decorator, SharedStore, decorator};

/// Records Prometheus metrics for every call to the wrapped store
pub struct MetricsStore<K: CacheKey, V: CacheValue> {
    next: SharedStore<K, V>,
}

impl<K: CacheKey, V: CacheValue> MetricsStore<K, V> {
    pub fn new(next: SharedStore<K, V>) -> Self {
        Self { next }
    }
}

/// Decorator that wraps each layer in a [`MetricsStore`]
pub fn metrics_decorator<K: CacheKey, V: CacheValue>() -> Decorator<K, V> {
    decorator(|next: SharedStore<K, V>| -> SharedStore<K, V> {
        Arc::new(MetricsStore::new(next))
    })
}

fn status<T>(result: &Result<T>) -> &'static str {
    if result.is_ok() { "success" } else { "error" }
}

#[async_trait]
impl<K: CacheKey, V: CacheValue> CacheStore<K, V> for MetricsStore<K, V> {
    fn name(&self) -> &str {
        self.next.name()
    }

    async fn batch_get(&self, info: LevelInfo, keys: &[K]) -> Result<Fetched<K, V>> {
        let start = Instant::now();
        let result = self.next.batch_get(info.clone(), keys).await;

        record_layer_op(
            info.level(),
            info.name(),
            "get",
            status(&result),
            start.elapsed().as_secs_f64(),
        );
        if let Ok(fetched) = &result {
            record_layer_keys(
                info.level(),
                info.name(),
                fetched.found.len(),
                fetched.missing.len(),
            );
        }
        result
    }

    async fn batch_set(&self, info: LevelInfo, entries: &HashMap<K, V>) -> Result<()> {
        let start = Instant::now();
        let result = self.next.batch_set(info.clone(), entries).await;
        record_layer_op(
            info.level(),
            info.name(),
            "set",
            status(&result),
            start.elapsed().as_secs_f64(),
        );
        result
    }

    async fn batch_delete(&self, info: LevelInfo, keys: &[K]) -> Result<()> {
        let start = Instant::now();
        let result = self.next.batch_delete(info.clone(), keys).await;
        record_layer_op(
            info.level(),
            info.name(),
            "delete",
            status(&result),
            start.elapsed().as_secs_f64(),
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemoryStore;
    use crate::metrics::{LAYER_KEYS_TOTAL, LAYER_OPS_TOTAL};

    #[tokio::test]
    async fn test_metrics_store_counts_hits_and_misses() {
        let inner: SharedStore<String, u32> = Arc::new(MemoryStore::new(16));
        let measured = metrics_decorator::<String, u32>()(inner);
        let info = LevelInfo::new(7, "metrics-decorator-test");

        measured
            .batch_set(info.clone(), &HashMap::from([("a".to_string(), 1)]))
            .await
            .unwrap();
        measured
            .batch_get(info.clone(), &["a".to_string(), "b".to_string()])
            .await
            .unwrap();

        let hits = LAYER_KEYS_TOTAL
            .with_label_values(&["7", "metrics-decorator-test", "hit"])
            .get();
        let misses = LAYER_KEYS_TOTAL
            .with_label_values(&["7", "metrics-decorator-test", "miss"])
            .get();
        let sets = LAYER_OPS_TOTAL
            .with_label_values(&["7", "metrics-decorator-test", "set", "success"])
            .get();

        assert_eq!((hits, misses, sets), (1, 1, 1));
    }
}
