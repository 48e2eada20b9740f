use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::core::{CacheError, CacheKey, CacheValue, Fetched, LevelInfo, Result};
use crate::store::CacheStore;

type BatchFetchFn<K, V> =
    Arc<dyn Fn(Vec<K>) -> BoxFuture<'static, Result<HashMap<K, V>>> + Send + Sync>;

/// Authoritative data source used as the last layer of a tiered cache.
///
/// Reads go to a batch fetcher; keys it does not return are missing.
/// Writes and deletes are accepted and ignored, the source is never
/// populated by the cache.
pub struct DataSource<K: CacheKey, V: CacheValue> {
    name: String,
    fetch: BatchFetchFn<K, V>,
}

impl<K: CacheKey, V: CacheValue> DataSource<K, V> {
    /// Data source over a batch fetcher
    pub fn new<F, Fut>(name: impl Into<String>, fetch: F) -> Self
    where
        F: Fn(Vec<K>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HashMap<K, V>>> + Send + 'static,
    {
        Self {
            name: name.into(),
            fetch: Arc::new(move |keys: Vec<K>| fetch(keys).boxed()),
        }
    }

    /// Data source over a single-key fetcher.
    ///
    /// Keys are fetched one after another; the first error fails the batch.
    pub fn from_fetcher<F, Fut>(name: impl Into<String>, fetch: F) -> Self
    where
        F: Fn(K) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<V>>> + Send + 'static,
    {
        let fetch = Arc::new(fetch);
        Self::new(name, move |keys: Vec<K>| {
            let fetch = fetch.clone();
            async move {
                let mut found = HashMap::with_capacity(keys.len());
                for key in keys {
                    if let Some(value) = fetch(key.clone()).await? {
                        found.insert(key, value);
                    }
                }
                Ok::<_, CacheError>(found)
            }
        })
    }
}

#[async_trait]
impl<K: CacheKey, V: CacheValue> CacheStore<K, V> for DataSource<K, V> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn batch_get(&self, _info: LevelInfo, keys: &[K]) -> Result<Fetched<K, V>> {
        if keys.is_empty() {
            return Ok(Fetched::all_missing(keys));
        }
        let returned = (self.fetch)(keys.to_vec()).await?;
        Ok(Fetched::partition(keys, returned))
    }

    async fn batch_set(&self, _info: LevelInfo, _entries: &HashMap<K, V>) -> Result<()> {
        Ok(())
    }

    async fn batch_delete(&self, _info: LevelInfo, _keys: &[K]) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn info() -> LevelInfo {
        LevelInfo::new(3, "db")
    }

    #[tokio::test]
    async fn test_batch_fetcher_partitions_result() {
        let source = DataSource::new("db", |keys: Vec<u32>| async move {
            Ok(keys
                .into_iter()
                .filter(|k| k % 2 == 0)
                .map(|k| (k, k * 10))
                .collect::<HashMap<_, _>>())
        });

        let fetched = source.batch_get(info(), &[1, 2, 3, 4]).await.unwrap();
        assert_eq!(fetched.found, HashMap::from([(2, 20), (4, 40)]));
        assert_eq!(fetched.missing, vec![1, 3]);
        assert_eq!(source.name(), "db");
    }

    #[tokio::test]
    async fn test_single_key_fetcher() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let source = DataSource::from_fetcher("db", move |key: String| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok((key != "ghost").then(|| key.to_uppercase())) }
        });

        let keys = vec!["a".to_string(), "ghost".to_string()];
        let fetched = source.batch_get(info(), &keys).await.unwrap();
        assert_eq!(fetched.found.get("a"), Some(&"A".to_string()));
        assert_eq!(fetched.missing, vec!["ghost".to_string()]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fetch_error_propagates() {
        let source: DataSource<u32, u32> =
            DataSource::from_fetcher("db", |_key| async { Err(CacheError::layer("db down")) });

        let err = source.batch_get(info(), &[1]).await.unwrap_err();
        assert_eq!(err.to_string(), "db down");
    }

    #[tokio::test]
    async fn test_writes_are_ignored() {
        let source =
            DataSource::new("db", |_keys: Vec<u32>| async { Ok(HashMap::<u32, u32>::new()) });

        source.batch_set(info(), &HashMap::from([(1, 1)])).await.unwrap();
        source.batch_delete(info(), &[1]).await.unwrap();
        let fetched = source.batch_get(info(), &[1]).await.unwrap();
        assert_eq!(fetched.missing, vec![1]);
    }
}
