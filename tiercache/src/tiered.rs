//! Tiered read-through cache
//!
//! Resolves batches of keys by walking an ordered list of layers
//! front-to-back. Keys missing at one layer are looked up in the next one,
//! and whatever a deeper layer finds is written back into the shallower
//! layer that missed it (back-population).
//!
//! Writes and deletes are broadcast to every layer in order and stop at the
//! first failing layer without rolling back the layers already written.

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

use crate::core::{CacheError, CacheKey, CacheValue, Fetched, LevelInfo, Result, unique_keys};
use crate::policy::ReadOptions;
use crate::store::{Decorator, SharedStore, wrap_store};

/// Keys resolved by a walk over the layers starting at some level
struct Resolved<K, V> {
    found: HashMap<K, V>,
    missing: Vec<K>,
}

/// Multi-level cache over an ordered list of stores.
///
/// Level 1 is the first store passed to [`TieredCache::new`]. Decorators
/// registered with [`TieredCache::with_decorator`] are applied to every
/// layer exactly once, on [`TieredCache::build`] or on the first operation,
/// whichever comes first.
///
/// # Example
/// ```no_run
/// use std::collections::HashMap;
/// use std::sync::Arc;
/// use tiercache::{DataSource, MemoryStore, SharedStore, TieredCache, logging_decorator};
///
/// # #[tokio::main]
/// # async fn main() -> tiercache::Result<()> {
/// let memory: SharedStore<u64, String> = Arc::new(MemoryStore::new(1_000));
/// let origin: SharedStore<u64, String> = Arc::new(DataSource::new("db", |keys: Vec<u64>| async move {
///     Ok(keys.into_iter().map(|k| (k, format!("user-{k}"))).collect::<HashMap<_, _>>())
/// }));
///
/// let cache = TieredCache::new(vec![memory, origin])
///     .with_decorator(logging_decorator())
///     .into_built();
///
/// let users = cache.batch_get(&[1, 2, 3]).await?;
/// assert_eq!(users.len(), 3);
/// # Ok(())
/// # }
/// ```
pub struct TieredCache<K: CacheKey, V: CacheValue> {
    /// Published layer list; replaced once, when built
    layers: RwLock<Arc<[SharedStore<K, V>]>>,
    decorators: Vec<Decorator<K, V>>,
    built: AtomicBool,
    build_lock: Mutex<()>,
}

impl<K: CacheKey, V: CacheValue> TieredCache<K, V> {
    /// Create an unbuilt cache over `stores`, fastest first
    pub fn new(stores: Vec<SharedStore<K, V>>) -> Self {
        Self {
            layers: RwLock::new(stores.into()),
            decorators: Vec::new(),
            built: AtomicBool::new(false),
            build_lock: Mutex::new(()),
        }
    }

    /// Register a decorator; the first registered one is the outermost wrapper
    pub fn with_decorator(mut self, decorator: Decorator<K, V>) -> Self {
        if self.is_built() {
            warn!("decorator registered after the cache was built; ignoring it");
            return self;
        }
        self.decorators.push(decorator);
        self
    }

    /// Wrap every layer with the decorator chain. Idempotent and safe to race.
    pub fn build(&self) -> &Self {
        if self.built.load(Ordering::Acquire) {
            return self;
        }

        let _guard = self.build_lock.lock();
        if self.built.load(Ordering::Acquire) {
            return self;
        }

        let raw = self.layers.read().clone();
        let wrapped: Arc<[SharedStore<K, V>]> = raw
            .iter()
            .map(|store| wrap_store(store.clone(), &self.decorators))
            .collect();

        *self.layers.write() = wrapped;
        self.built.store(true, Ordering::Release);

        debug!(
            layers = raw.len(),
            decorators = self.decorators.len(),
            "tiered cache built"
        );
        self
    }

    /// Owned variant of [`TieredCache::build`] for builder chains
    pub fn into_built(self) -> Self {
        self.build();
        self
    }

    pub fn is_built(&self) -> bool {
        self.built.load(Ordering::Acquire)
    }

    /// Number of layers
    pub fn len(&self) -> usize {
        self.layers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store names in level order
    pub fn layer_names(&self) -> Vec<String> {
        self.layers
            .read()
            .iter()
            .map(|store| store.name().to_string())
            .collect()
    }

    /// Snapshot of the published layer list, building first if needed
    fn snapshot(&self) -> Arc<[SharedStore<K, V>]> {
        self.build();
        self.layers.read().clone()
    }

    /// Get a single key
    pub async fn get(&self, key: &K) -> Result<Option<V>> {
        self.get_with(key, &ReadOptions::default()).await
    }

    /// Get a single key with per-call options
    pub async fn get_with(&self, key: &K, options: &ReadOptions) -> Result<Option<V>> {
        let mut found = self
            .batch_get_with(std::slice::from_ref(key), options)
            .await?;
        Ok(found.remove(key))
    }

    /// Get a batch of keys; keys absent from every layer are simply not in the map
    pub async fn batch_get(&self, keys: &[K]) -> Result<HashMap<K, V>> {
        self.batch_get_with(keys, &ReadOptions::default()).await
    }

    /// Get a batch of keys with per-call options
    pub async fn batch_get_with(&self, keys: &[K], options: &ReadOptions) -> Result<HashMap<K, V>> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let layers = self.snapshot();
        let resolved = resolve(&layers, unique_keys(keys), 0, options).await?;

        debug!(
            requested = keys.len(),
            found = resolved.found.len(),
            missing = resolved.missing.len(),
            "batch_get resolved"
        );
        Ok(resolved.found)
    }

    /// Set a single entry in every layer
    pub async fn set(&self, key: K, value: V) -> Result<()> {
        self.batch_set(HashMap::from([(key, value)])).await
    }

    /// Write entries to every layer in order, stopping at the first failure
    pub async fn batch_set(&self, entries: HashMap<K, V>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let layers = self.snapshot();
        for (index, store) in layers.iter().enumerate() {
            let info = LevelInfo::new(index + 1, store.name());
            if let Err(source) = store.batch_set(info.clone(), &entries).await {
                return Err(broadcast_error("batch_set", &info, source));
            }
        }
        Ok(())
    }

    /// Delete a single key from every layer
    pub async fn delete(&self, key: &K) -> Result<()> {
        self.batch_delete(std::slice::from_ref(key)).await
    }

    /// Delete keys from every layer in order, stopping at the first failure
    pub async fn batch_delete(&self, keys: &[K]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let keys = unique_keys(keys);
        let layers = self.snapshot();
        for (index, store) in layers.iter().enumerate() {
            let info = LevelInfo::new(index + 1, store.name());
            if let Err(source) = store.batch_delete(info.clone(), &keys).await {
                return Err(broadcast_error("batch_delete", &info, source));
            }
        }
        Ok(())
    }
}

fn broadcast_error(op: &'static str, info: &LevelInfo, source: CacheError) -> CacheError {
    warn!(level = info.level(), store = info.name(), error = %source, "{} aborted", op);
    CacheError::Broadcast {
        op,
        level: info.level(),
        name: info.name().to_string(),
        source: Box::new(source),
    }
}

/// Resolve `keys` starting at layer `index` (0-based).
///
/// Past the last layer every key is missing. A skipped layer passes the same
/// keys down untouched. A failing layer either aborts the walk or, when the
/// policy falls back, is treated as a full miss. Whatever the deeper layers
/// find is merged in and written back to this layer; that write-back is best
/// effort and its error is dropped.
fn resolve<'a, K: CacheKey, V: CacheValue>(
    layers: &'a [SharedStore<K, V>],
    keys: Vec<K>,
    index: usize,
    options: &'a ReadOptions,
) -> BoxFuture<'a, Result<Resolved<K, V>>> {
    async move {
        let Some(store) = layers.get(index) else {
            return Ok(Resolved {
                found: HashMap::new(),
                missing: keys,
            });
        };

        let info = LevelInfo::new(index + 1, store.name());
        if options.should_skip(&info) {
            debug!(level = info.level(), store = info.name(), "layer skipped");
            return resolve(layers, keys, index + 1, options).await;
        }

        // Re-partition so values for unrequested keys never leave the layer
        let fetched = match store.batch_get(info.clone(), &keys).await {
            Ok(fetched) => Fetched::partition(&keys, fetched.found),
            Err(err) => {
                if !options.should_fall_back(&info, &err) {
                    return Err(err);
                }
                warn!(
                    level = info.level(),
                    store = info.name(),
                    error = %err,
                    "layer read failed, falling back to next layer"
                );
                return resolve(layers, keys, index + 1, options).await;
            }
        };

        let mut found = fetched.found;
        if fetched.missing.is_empty() {
            return Ok(Resolved {
                found,
                missing: Vec::new(),
            });
        }

        let deeper = resolve(layers, fetched.missing, index + 1, options).await?;
        if !deeper.found.is_empty() {
            if let Err(err) = store.batch_set(info.clone(), &deeper.found).await {
                debug!(
                    level = info.level(),
                    store = info.name(),
                    error = %err,
                    "back-population failed"
                );
            }
            for (key, value) in deeper.found {
                found.entry(key).or_insert(value);
            }
        }

        Ok(Resolved {
            found,
            missing: deeper.missing,
        })
    }
    .boxed()
}
