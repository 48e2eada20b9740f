//! Redis implementation of [`KvClient`]

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use std::time::Duration;

use super::remote::KvClient;
use crate::core::Result;

/// [`KvClient`] over a multiplexed async Redis connection
#[derive(Clone)]
pub struct RedisClient {
    conn: MultiplexedConnection,
}

impl RedisClient {
    /// Connect to `url` (e.g. `redis://127.0.0.1:6379`)
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl KvClient for RedisClient {
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        let mut pipe = redis::pipe();
        for key in keys {
            pipe.get(key);
        }
        let mut conn = self.conn.clone();
        let values: Vec<Option<Vec<u8>>> = pipe.query_async(&mut conn).await?;
        Ok(values)
    }

    async fn mset_ex(&self, entries: Vec<(String, Vec<u8>)>, ttl: Duration) -> Result<()> {
        // SET EX takes whole seconds; round sub-second TTLs up
        let seconds = ttl.as_secs().max(1);
        let mut pipe = redis::pipe();
        for (key, value) in entries {
            pipe.set_ex(key, value, seconds).ignore();
        }
        let mut conn = self.conn.clone();
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<()> {
        let mut pipe = redis::pipe();
        pipe.del(keys.to_vec()).ignore();
        let mut conn = self.conn.clone();
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }
}
