//! Store Contract
//!
//! The uniform capability every layer exposes, plus the decorator chain
//! used to attach cross-cutting behavior without changing that contract.

pub mod decorator;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::{CacheKey, CacheValue, Fetched, LevelInfo, Result};

pub use decorator::{Decorator, chain, decorator, wrap_store};

/// A single cache layer.
///
/// Every call carries the [`LevelInfo`] of the slot the store occupies so
/// decorators can tell which layer they wrap. Stores must report keys they
/// do not hold in `missing`, never as an error. Entries returned for keys
/// that were not requested are dropped by the tiered cache.
#[async_trait]
pub trait CacheStore<K: CacheKey, V: CacheValue>: Send + Sync {
    /// Identifier used in logs, metrics and policy predicates
    fn name(&self) -> &str;

    /// Read a batch of keys
    async fn batch_get(&self, info: LevelInfo, keys: &[K]) -> Result<Fetched<K, V>>;

    /// Write a batch of entries
    async fn batch_set(&self, info: LevelInfo, entries: &HashMap<K, V>) -> Result<()>;

    /// Remove a batch of keys
    async fn batch_delete(&self, info: LevelInfo, keys: &[K]) -> Result<()>;
}

/// Shared, type-erased layer
pub type SharedStore<K, V> = Arc<dyn CacheStore<K, V>>;
