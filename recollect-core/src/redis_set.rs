//! Redis sorted-set implementation of [`OrderedSet`].

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{cmd, Client};

use crate::error::Error;
use crate::remote::OrderedSet;

/// [`OrderedSet`] backed by Redis ZSET commands
///
/// Wraps a `ConnectionManager`, which reconnects on its own after a dropped
/// connection. Clones share the same connection.
#[derive(Clone)]
pub struct RedisOrderedSet {
    conn: ConnectionManager,
}

impl RedisOrderedSet {
    /// Connects to the Redis server at `redis_url` (e.g. "redis://127.0.0.1:6379")
    pub async fn connect(redis_url: &str) -> Result<Self, Error> {
        let client = Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::info!("Connected to Redis at {}", redis_url);
        Ok(Self { conn })
    }

    /// Wraps an existing connection manager
    pub fn with_connection(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl OrderedSet for RedisOrderedSet {
    async fn upsert(&self, collection: &str, member: &str, score: f64) -> Result<(), Error> {
        let mut conn = self.conn.clone();
        let _: i64 = cmd("ZADD")
            .arg(collection)
            .arg(score)
            .arg(member)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn score(&self, collection: &str, member: &str) -> Result<Option<f64>, Error> {
        let mut conn = self.conn.clone();
        let score: Option<f64> = cmd("ZSCORE")
            .arg(collection)
            .arg(member)
            .query_async(&mut conn)
            .await?;
        Ok(score)
    }

    async fn remove(&self, collection: &str, member: &str) -> Result<(), Error> {
        let mut conn = self.conn.clone();
        let _: i64 = cmd("ZREM")
            .arg(collection)
            .arg(member)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn remove_below(&self, collection: &str, max: f64) -> Result<u64, Error> {
        let mut conn = self.conn.clone();
        // "(" makes the upper bound exclusive
        let removed: u64 = cmd("ZREMRANGEBYSCORE")
            .arg(collection)
            .arg("-inf")
            .arg(format!("({}", max))
            .query_async(&mut conn)
            .await?;
        Ok(removed)
    }
}

impl std::fmt::Debug for RedisOrderedSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisOrderedSet").finish_non_exhaustive()
    }
}
