use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

use super::codec::{Codec, JsonCodec};
use crate::core::{CacheError, CacheKey, CacheValue, Fetched, LevelInfo, Result};
use crate::store::CacheStore;

/// Request/response key-value protocol a [`RemoteStore`] talks through
#[async_trait]
pub trait KvClient: Send + Sync {
    /// Fetch raw values; the result has one slot per requested key, in order
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>>;

    /// Store raw values, each expiring after `ttl`
    async fn mset_ex(&self, entries: Vec<(String, Vec<u8>)>, ttl: Duration) -> Result<()>;

    /// Remove keys
    async fn del(&self, keys: &[String]) -> Result<()>;
}

#[async_trait]
impl<C: KvClient + ?Sized> KvClient for Arc<C> {
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        (**self).mget(keys).await
    }

    async fn mset_ex(&self, entries: Vec<(String, Vec<u8>)>, ttl: Duration) -> Result<()> {
        (**self).mset_ex(entries, ttl).await
    }

    async fn del(&self, keys: &[String]) -> Result<()> {
        (**self).del(keys).await
    }
}

/// Distributed cache layer reached through a [`KvClient`].
///
/// Keys are stored as `prefix + key`, values go through a [`Codec`]
/// (JSON by default). An entry that fails to decode reads as a miss so the
/// next layer can repopulate it.
pub struct RemoteStore<K, V, C> {
    client: C,
    ttl: Duration,
    prefix: String,
    codec: Arc<dyn Codec<V>>,
    name: String,
    _key: std::marker::PhantomData<fn(K)>,
}

impl<K, V, C> RemoteStore<K, V, C>
where
    K: CacheKey + Display,
    V: CacheValue + Serialize + DeserializeOwned,
    C: KvClient,
{
    /// Remote layer with JSON values expiring after `ttl`
    pub fn new(client: C, ttl: Duration) -> Self {
        Self::with_codec(client, ttl, JsonCodec::new())
    }
}

impl<K, V, C> RemoteStore<K, V, C>
where
    K: CacheKey + Display,
    V: CacheValue,
    C: KvClient,
{
    /// Remote layer with a custom value codec
    pub fn with_codec(client: C, ttl: Duration, codec: impl Codec<V> + 'static) -> Self {
        Self {
            client,
            ttl,
            prefix: String::new(),
            codec: Arc::new(codec),
            name: "remote".to_string(),
            _key: std::marker::PhantomData,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Key as stored on the remote side
    pub fn remote_key(&self, key: &K) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn remote_keys(&self, keys: &[K]) -> Vec<String> {
        keys.iter().map(|key| self.remote_key(key)).collect()
    }
}

#[async_trait]
impl<K, V, C> CacheStore<K, V> for RemoteStore<K, V, C>
where
    K: CacheKey + Display,
    V: CacheValue,
    C: KvClient,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn batch_get(&self, info: LevelInfo, keys: &[K]) -> Result<Fetched<K, V>> {
        if keys.is_empty() {
            return Ok(Fetched::all_missing(keys));
        }

        let remote_keys = self.remote_keys(keys);
        debug!(store = %self.name, level = info.level(), keys = ?remote_keys, "remote read");

        let values = self.client.mget(&remote_keys).await.inspect_err(|err| {
            error!(store = %self.name, error = %err, "remote mget failed");
        })?;
        if values.len() != keys.len() {
            return Err(CacheError::layer(format!(
                "remote mget returned {} values for {} keys",
                values.len(),
                keys.len()
            )));
        }

        let mut found = HashMap::with_capacity(keys.len());
        let mut missing = Vec::new();
        for ((key, remote_key), raw) in keys.iter().zip(&remote_keys).zip(values) {
            let Some(raw) = raw else {
                missing.push(key.clone());
                continue;
            };
            match self.codec.decode(&raw) {
                Ok(value) => {
                    found.insert(key.clone(), value);
                }
                Err(err) => {
                    error!(store = %self.name, key = %remote_key, error = %err, "remote value decode failed");
                    missing.push(key.clone());
                }
            }
        }

        Ok(Fetched { found, missing })
    }

    async fn batch_set(&self, info: LevelInfo, entries: &HashMap<K, V>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let encoded = entries
            .iter()
            .map(|(key, value)| Ok((self.remote_key(key), self.codec.encode(value)?)))
            .collect::<Result<Vec<_>>>()?;

        self.client
            .mset_ex(encoded, self.ttl)
            .await
            .inspect_err(|err| {
                error!(store = %self.name, error = %err, "remote mset failed");
            })?;

        debug!(store = %self.name, level = info.level(), size = entries.len(), "remote write ok");
        Ok(())
    }

    async fn batch_delete(&self, info: LevelInfo, keys: &[K]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let remote_keys = self.remote_keys(keys);
        self.client.del(&remote_keys).await.inspect_err(|err| {
            error!(store = %self.name, keys = ?remote_keys, error = %err, "remote delete failed");
        })?;

        debug!(store = %self.name, level = info.level(), keys = ?remote_keys, "remote delete ok");
        Ok(())
    }
}
