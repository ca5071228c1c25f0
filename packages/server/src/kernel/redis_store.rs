//! Redis implementation of [`BaseKeyedStore`].
//!
//! Job records and usage counters live here as plain strings with TTLs.
//! `ConnectionManager` handles reconnects, so a dropped Redis connection
//! surfaces as a per-call error rather than a dead store.

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

use super::traits::BaseKeyedStore;

/// Redis-backed keyed store with expiry.
#[derive(Clone)]
pub struct RedisKeyedStore {
    manager: ConnectionManager,
}

impl RedisKeyedStore {
    /// Connect to Redis and build the shared connection manager.
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url).context("Invalid Redis URL")?;
        let manager = client
            .get_connection_manager()
            .await
            .context("Failed to connect to Redis")?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl BaseKeyedStore for RedisKeyedStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.manager.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.manager.clone();
        let () = conn.set_ex(key, value, ttl.as_secs()).await?;
        Ok(())
    }

    async fn increment(&self, key: &str, ttl: Duration) -> Result<i64> {
        let mut conn = self.manager.clone();
        let value: i64 = conn.incr(key, 1).await?;
        // INCR created the key; give it its expiry exactly once
        if value == 1 {
            let () = conn.expire(key, ttl.as_secs() as i64).await?;
        }
        Ok(value)
    }
}
