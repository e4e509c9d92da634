//! Session cache: cached user profiles and the per-user refresh slot.
//!
//! The cache is advisory. The credential store stays the source of truth for
//! profiles, and no authentication decision reads from here. Every key is
//! independent; there are no cross-key transactions.
//!
//! | Key                  | Value                  | TTL       |
//! |----------------------|------------------------|-----------|
//! | `user:{id}`          | JSON [`UserView`]      | 3600 s    |
//! | `refresh_token:{id}` | current refresh token  | 604800 s  |

pub mod memory;
pub mod redis;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::auth::UserView;

/// Default TTL for cached profiles: 1 hour.
pub const PROFILE_TTL: Duration = Duration::from_secs(3600);

/// Default TTL for the refresh slot: 7 days.
pub const REFRESH_SLOT_TTL: Duration = Duration::from_secs(604_800);

/// Cache failures.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend: {0}")]
    Backend(String),

    #[error("cache encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Raw string key-value store with per-key expiry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Set `key` to `value`, expiring after `ttl`. Overwrites any previous value.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Get a live value.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Delete `key`. Deleting a missing key is not an error.
    async fn del(&self, key: &str) -> Result<(), CacheError>;

    /// Reachability check for health reporting.
    async fn ping(&self) -> Result<(), CacheError>;
}

/// Typed session cache over a [`CacheStore`].
#[derive(Clone)]
pub struct SessionCache {
    store: Arc<dyn CacheStore>,
}

impl SessionCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    pub fn profile_key(user_id: i64) -> String {
        format!("user:{user_id}")
    }

    pub fn refresh_slot_key(user_id: i64) -> String {
        format!("refresh_token:{user_id}")
    }

    pub async fn put_profile(&self, user_id: i64, view: &UserView, ttl: Duration) -> Result<(), CacheError> {
        let value = serde_json::to_string(view)?;
        self.store.set_ex(&Self::profile_key(user_id), &value, ttl).await
    }

    /// Cached profile, if present. A value that no longer decodes is an
    /// [`CacheError::Encoding`] error.
    pub async fn get_profile(&self, user_id: i64) -> Result<Option<UserView>, CacheError> {
        match self.store.get(&Self::profile_key(user_id)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn drop_profile(&self, user_id: i64) -> Result<(), CacheError> {
        self.store.del(&Self::profile_key(user_id)).await
    }

    /// Store the user's current refresh token, superseding any previous one.
    pub async fn put_refresh_slot(&self, user_id: i64, token: &str, ttl: Duration) -> Result<(), CacheError> {
        self.store.set_ex(&Self::refresh_slot_key(user_id), token, ttl).await
    }

    pub async fn get_refresh_slot(&self, user_id: i64) -> Result<Option<String>, CacheError> {
        self.store.get(&Self::refresh_slot_key(user_id)).await
    }

    pub async fn drop_refresh_slot(&self, user_id: i64) -> Result<(), CacheError> {
        self.store.del(&Self::refresh_slot_key(user_id)).await
    }

    pub async fn ping(&self) -> Result<(), CacheError> {
        self.store.ping().await
    }
}
