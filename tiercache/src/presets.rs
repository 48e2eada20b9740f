//! Ready-made cache topologies
//!
//! - Remote → origin: shared state across instances
//! - Memory → remote → origin: hot keys served from process memory
//! - From configuration: whatever [`TierConfig`] enables

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use crate::backends::{DataSource, KvClient, MemoryStore, RemoteStore};
use crate::config::TierConfig;
use crate::core::{CacheKey, CacheValue};
use crate::middleware::{logging_decorator, metrics_decorator};
use crate::store::{Decorator, SharedStore};
use crate::tiered::TieredCache;

fn assemble<K: CacheKey, V: CacheValue>(
    layers: Vec<SharedStore<K, V>>,
    decorators: Vec<Decorator<K, V>>,
) -> TieredCache<K, V> {
    decorators
        .into_iter()
        .fold(TieredCache::new(layers), TieredCache::with_decorator)
        .into_built()
}

/// Two levels: remote cache, then the origin
pub fn remote_with_origin<K, V, C>(
    client: C,
    prefix: &str,
    ttl: Duration,
    origin: DataSource<K, V>,
    decorators: Vec<Decorator<K, V>>,
) -> TieredCache<K, V>
where
    K: CacheKey + Display,
    V: CacheValue + Serialize + DeserializeOwned,
    C: KvClient + 'static,
{
    let remote: RemoteStore<K, V, C> = RemoteStore::new(client, ttl).with_prefix(prefix);
    let layers: Vec<SharedStore<K, V>> =
        vec![Arc::new(remote) as SharedStore<K, V>, Arc::new(origin)];
    assemble(layers, decorators)
}

/// Three levels: process memory, remote cache, then the origin
pub fn local_remote_origin<K, V, C>(
    client: C,
    prefix: &str,
    remote_ttl: Duration,
    local_capacity: usize,
    local_ttl: Duration,
    origin: DataSource<K, V>,
    decorators: Vec<Decorator<K, V>>,
) -> TieredCache<K, V>
where
    K: CacheKey + Display,
    V: CacheValue + Serialize + DeserializeOwned,
    C: KvClient + 'static,
{
    let local: MemoryStore<K, V> = MemoryStore::new(local_capacity).with_ttl(local_ttl);
    let remote: RemoteStore<K, V, C> = RemoteStore::new(client, remote_ttl).with_prefix(prefix);
    let layers: Vec<SharedStore<K, V>> = vec![
        Arc::new(local) as SharedStore<K, V>,
        Arc::new(remote),
        Arc::new(origin),
    ];
    assemble(layers, decorators)
}

/// Build the layers a [`TierConfig`] enables, in front of `origin`.
///
/// The remote layer is only added when it is enabled and a client is given.
/// Logging is always attached; metrics when enabled.
pub fn from_config<K, V, C>(
    config: &TierConfig,
    remote_client: Option<C>,
    origin: DataSource<K, V>,
) -> TieredCache<K, V>
where
    K: CacheKey + Display,
    V: CacheValue + Serialize + DeserializeOwned,
    C: KvClient + 'static,
{
    let mut layers: Vec<SharedStore<K, V>> = Vec::new();

    if config.memory.enabled {
        let mut memory: MemoryStore<K, V> = MemoryStore::new(config.memory.capacity);
        if let Some(ttl) = config.memory_ttl() {
            memory = memory.with_ttl(ttl);
        }
        layers.push(Arc::new(memory));
    }

    if let Some(client) = remote_client.filter(|_| config.remote.enabled) {
        let remote: RemoteStore<K, V, C> = RemoteStore::new(client, config.remote_ttl())
            .with_prefix(config.remote.prefix.clone())
            .with_name("redis");
        layers.push(Arc::new(remote));
    }

    layers.push(Arc::new(origin));

    let mut decorators = vec![logging_decorator()];
    if config.metrics.enabled {
        decorators.push(metrics_decorator());
    }
    assemble(layers, decorators)
}
