//! Layer adapters
//!
//! - Memory: bounded in-process LRU with TTL
//! - Remote: distributed key-value cache behind a request/response client
//! - Origin: authoritative data source, always the last layer

pub mod codec;
pub mod memory;
pub mod origin;
#[cfg(feature = "redis")]
pub mod redis_client;
pub mod remote;

pub use codec::{Codec, JsonCodec};
pub use memory::{MemoryStats, MemoryStore};
pub use origin::DataSource;
#[cfg(feature = "redis")]
pub use redis_client::RedisClient;
pub use remote::{KvClient, RemoteStore};
