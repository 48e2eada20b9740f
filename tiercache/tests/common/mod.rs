// Shared helpers for tiered cache integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tiercache::{CacheError, CacheStore, Fetched, LevelInfo, Result, SharedStore};

/// Ordered log of calls, shared between stores and decorators
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Map-backed store that records every call and can be told to fail
pub struct MapStore {
    name: String,
    data: Mutex<HashMap<String, String>>,
    read_error: Option<String>,
    write_error: Option<String>,
    delete_error: Option<String>,
    extra: Option<(String, String)>,
    log: CallLog,
    seen_levels: Mutex<Vec<usize>>,
}

impl MapStore {
    pub fn new(name: &str, entries: &[(&str, &str)], log: &CallLog) -> Self {
        Self {
            name: name.to_string(),
            data: Mutex::new(
                entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            read_error: None,
            write_error: None,
            delete_error: None,
            extra: None,
            log: log.clone(),
            seen_levels: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_reads(mut self, message: &str) -> Self {
        self.read_error = Some(message.to_string());
        self
    }

    pub fn failing_writes(mut self, message: &str) -> Self {
        self.write_error = Some(message.to_string());
        self
    }

    pub fn failing_deletes(mut self, message: &str) -> Self {
        self.delete_error = Some(message.to_string());
        self
    }

    /// Also answer every read with an entry nobody asked for
    pub fn returning_extra(mut self, key: &str, value: &str) -> Self {
        self.extra = Some((key.to_string(), value.to_string()));
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn data(&self) -> HashMap<String, String> {
        self.data.lock().clone()
    }

    /// Levels this store was addressed at, in call order
    pub fn seen_levels(&self) -> Vec<usize> {
        self.seen_levels.lock().clone()
    }

    fn record(&self, op: &str, info: &LevelInfo) {
        self.log.lock().push(format!("{}:{}", self.name, op));
        self.seen_levels.lock().push(info.level());
    }
}

#[async_trait]
impl CacheStore<String, String> for MapStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn batch_get(&self, info: LevelInfo, keys: &[String]) -> Result<Fetched<String, String>> {
        self.record("get", &info);
        if let Some(message) = &self.read_error {
            return Err(CacheError::layer(message.clone()));
        }

        let data = self.data.lock();
        let mut fetched = Fetched::partition(
            keys,
            keys.iter()
                .filter_map(|k| data.get(k).map(|v| (k.clone(), v.clone())))
                .collect(),
        );
        if let Some((key, value)) = &self.extra {
            fetched.found.insert(key.clone(), value.clone());
        }
        Ok(fetched)
    }

    async fn batch_set(&self, info: LevelInfo, entries: &HashMap<String, String>) -> Result<()> {
        self.record("set", &info);
        if let Some(message) = &self.write_error {
            return Err(CacheError::layer(message.clone()));
        }

        self.data.lock().extend(entries.clone());
        Ok(())
    }

    async fn batch_delete(&self, info: LevelInfo, keys: &[String]) -> Result<()> {
        self.record("delete", &info);
        if let Some(message) = &self.delete_error {
            return Err(CacheError::layer(message.clone()));
        }

        let mut data = self.data.lock();
        for key in keys {
            data.remove(key);
        }
        Ok(())
    }
}

pub fn new_log() -> CallLog {
    Arc::default()
}

pub fn as_layers(stores: &[&Arc<MapStore>]) -> Vec<SharedStore<String, String>> {
    stores
        .iter()
        .map(|store| Arc::clone(store) as SharedStore<String, String>)
        .collect()
}

pub fn keys(list: &[&str]) -> Vec<String> {
    list.iter().map(|k| k.to_string()).collect()
}

pub fn map(entries: &[(&str, &str)]) -> HashMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
