//! Decorator chain
//!
//! A decorator takes a store and returns a store with the same contract.
//! Chains compose so that the first registered decorator is the outermost
//! wrapper: calls pass through decorators in registration order and return
//! through them in reverse.

use std::sync::Arc;

use super::SharedStore;
use crate::core::{CacheKey, CacheValue};

/// Wraps a store with cross-cutting behavior
pub type Decorator<K, V> = Arc<dyn Fn(SharedStore<K, V>) -> SharedStore<K, V> + Send + Sync>;

/// Turn a wrapping closure into a [`Decorator`]
pub fn decorator<K, V, F>(wrap: F) -> Decorator<K, V>
where
    K: CacheKey,
    V: CacheValue,
    F: Fn(SharedStore<K, V>) -> SharedStore<K, V> + Send + Sync + 'static,
{
    Arc::new(wrap)
}

/// Compose decorators into one; the first element ends up outermost
pub fn chain<K: CacheKey, V: CacheValue>(decorators: &[Decorator<K, V>]) -> Decorator<K, V> {
    let decorators = decorators.to_vec();
    Arc::new(move |store: SharedStore<K, V>| {
        decorators
            .iter()
            .rev()
            .fold(store, |inner, wrap| wrap(inner))
    })
}

/// Apply a decorator list to a single store
pub fn wrap_store<K: CacheKey, V: CacheValue>(
    store: SharedStore<K, V>,
    decorators: &[Decorator<K, V>],
) -> SharedStore<K, V> {
    if decorators.is_empty() {
        return store;
    }
    chain(decorators)(store)
}
