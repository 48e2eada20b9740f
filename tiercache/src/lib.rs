//! # tiercache
//!
//! Tiered read-through cache orchestrator. An ordered list of layers
//! (process memory, a distributed cache, the origin data source...) is
//! treated as one logical cache:
//!
//! - Reads walk the layers front-to-back and back-populate the faster
//!   layers that missed
//! - Writes and deletes are broadcast to every layer in order
//! - Per-call [`ReadOptions`] skip layers or control error fallback
//! - [`Decorator`]s add logging, metrics or anything else to every layer

pub mod backends;
pub mod config;
pub mod core;
pub mod metrics;
pub mod middleware;
pub mod policy;
pub mod presets;
pub mod store;
pub mod tiered;

// Re-export commonly used types
pub use backends::{Codec, DataSource, JsonCodec, KvClient, MemoryStats, MemoryStore, RemoteStore};
#[cfg(feature = "redis")]
pub use backends::RedisClient;
pub use config::TierConfig;
pub use crate::core::{CacheError, CacheKey, CacheValue, Fetched, LevelInfo, Result};
pub use middleware::{LoggingStore, MetricsStore, logging_decorator, metrics_decorator};
pub use policy::ReadOptions;
pub use store::{CacheStore, Decorator, SharedStore, chain, decorator, wrap_store};
pub use tiered::TieredCache;
