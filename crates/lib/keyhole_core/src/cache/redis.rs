//! Redis-backed [`CacheStore`] over a `deadpool-redis` pool.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::redis::{AsyncCommands, cmd};
use deadpool_redis::{Config, Connection, Pool, Runtime};

use super::{CacheError, CacheStore};

/// Connection settings for [`RedisCacheStore::connect`].
#[derive(Debug, Clone)]
pub struct RedisSettings {
    pub url: String,
    pub pool_size: usize,
    pub timeout: Duration,
}

impl RedisSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            pool_size: 16,
            timeout: Duration::from_secs(5),
        }
    }
}

/// `SETEX` / `GET` / `DEL` against Redis.
#[derive(Clone)]
pub struct RedisCacheStore {
    pool: Pool,
}

impl RedisCacheStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Build a pool from `settings`. Connections are opened lazily, so this
    /// succeeds even when Redis is down; use [`CacheStore::ping`] to check.
    pub fn connect(settings: &RedisSettings) -> Result<Self, CacheError> {
        let mut config = Config::from_url(&settings.url);
        let mut pool_config = config.get_pool_config();
        pool_config.max_size = settings.pool_size;
        pool_config.timeouts.wait = Some(settings.timeout);
        pool_config.timeouts.create = Some(settings.timeout);
        pool_config.timeouts.recycle = Some(settings.timeout);
        config.pool = Some(pool_config);

        let pool = config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| CacheError::Backend(format!("redis pool: {e}")))?;
        Ok(Self { pool })
    }

    async fn conn(&self) -> Result<Connection, CacheError> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Backend(format!("redis connection: {e}")))
    }
}

fn backend(e: deadpool_redis::redis::RedisError) -> CacheError {
    CacheError::Backend(format!("redis: {e}"))
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        // SETEX rejects a zero expiry
        let secs = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, secs).await.map_err(backend)?;
        tracing::debug!(key = %key, ttl_secs = secs, "cache set");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn().await?;
        conn.get::<_, Option<String>>(key).await.map_err(backend)
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(key).await.map_err(backend)?;
        tracing::debug!(key = %key, "cache delete");
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        let _pong: String = cmd("PING").query_async(&mut conn).await.map_err(backend)?;
        Ok(())
    }
}
