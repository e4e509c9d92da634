//! In-memory [`CacheStore`] with TTL-based expiration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::{CacheError, CacheStore};

/// A cached entry with expiry.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// `DashMap`-backed cache. Expired entries are treated as absent and removed
/// lazily on read.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: DashMap<String, CacheEntry>,
    offline: AtomicBool,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the cache becoming unreachable (or reachable again).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn check_online(&self) -> Result<(), CacheError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(CacheError::Backend("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.check_online()?;
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| CacheError::Backend(format!("ttl out of range: {ttl:?}")))?;
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.check_online()?;
        let now = Utc::now();
        let live = self.entries.get(key).and_then(|entry| {
            if now < entry.expires_at {
                Some(entry.value.clone())
            } else {
                None
            }
        });
        if live.is_none() {
            self.entries.remove_if(key, |_, entry| now >= entry.expires_at);
        }
        Ok(live)
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        self.check_online()?;
        self.entries.remove(key);
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.check_online()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_returns_none_for_missing_key() {
        let cache = MemoryCacheStore::new();
        assert!(cache.get("unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_overwrites() {
        let cache = MemoryCacheStore::new();
        cache.set_ex("k1", "v1", Duration::from_secs(60)).await.unwrap();
        cache.set_ex("k1", "v2", Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("k1").await.unwrap().as_deref(), Some("v2"));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn expired_entry_returns_none_and_is_evicted() {
        let cache = MemoryCacheStore::new();
        // Zero TTL expires immediately
        cache.set_ex("k1", "v1", Duration::ZERO).await.unwrap();
        assert!(cache.get("k1").await.unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn ttl_past_the_calendar_is_rejected() {
        let cache = MemoryCacheStore::new();
        let result = cache
            .set_ex("k1", "v1", Duration::from_secs(10_000_000_000_000))
            .await;
        assert!(matches!(result, Err(CacheError::Backend(_))));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn del_missing_key_is_ok() {
        let cache = MemoryCacheStore::new();
        cache.del("nothing").await.unwrap();
    }

    #[tokio::test]
    async fn offline_cache_errors() {
        let cache = MemoryCacheStore::new();
        cache.set_offline(true);
        assert!(cache.set_ex("k", "v", Duration::from_secs(1)).await.is_err());
        assert!(cache.get("k").await.is_err());
        assert!(cache.ping().await.is_err());
        cache.set_offline(false);
        assert!(cache.ping().await.is_ok());
    }
}
