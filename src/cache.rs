//! Snapshot cache for the public menu and regions list.
//!
//! Redis is optional: without `REDIS_URL` the service runs with [`NoopCache`]
//! and every read falls through to the database.

use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::{
    RedisConnectionManager, bb8,
    redis::{self, AsyncCommands},
};
use thiserror::Error;

pub const MENU_KEY: &str = "menu:v1";
pub const REGIONS_KEY: &str = "regions:v1";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache connection failed: {0}")]
    Connection(String),
    #[error("cache command failed: {0}")]
    Command(#[from] redis::RedisError),
}

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

#[derive(Clone)]
pub struct RedisCache {
    pool: bb8::Pool<RedisConnectionManager>,
}

impl RedisCache {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let manager = RedisConnectionManager::new(url)?;
        let pool = bb8::Pool::builder()
            .max_size(16)
            .connection_timeout(Duration::from_secs(2))
            .build(manager)
            .await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;
        let secs = ttl.as_secs().max(1);
        let _: () = conn.set_ex(key, value, secs).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;
        let _: () = conn.del(key).await?;
        Ok(())
    }
}

/// Cache that never stores anything.
#[derive(Debug, Clone, Default)]
pub struct NoopCache;

#[async_trait]
impl Cache for NoopCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_cache_always_misses() {
        let cache = NoopCache;
        cache
            .set(MENU_KEY, "{}", Duration::from_secs(30))
            .await
            .expect("set succeeds");
        assert!(cache.get(MENU_KEY).await.expect("get succeeds").is_none());
    }
}
