//! In-memory [`CredentialStore`] for tests and local runs.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use super::AuthError;
use super::store::CredentialStore;
use crate::models::auth::{NewUser, User};

#[derive(Debug, Default)]
struct Users {
    last_id: i64,
    by_id: BTreeMap<i64, User>,
}

/// Mutex-guarded user table with the same uniqueness rules as the
/// Postgres schema. Check-and-insert happens under one lock, so concurrent
/// duplicate registrations resolve to one winner.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    users: Mutex<Users>,
    offline: AtomicBool,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the database becoming unreachable (or reachable again).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Delete a user outright.
    pub fn remove_user(&self, user_id: i64) -> Option<User> {
        self.lock().ok()?.by_id.remove(&user_id)
    }

    /// Number of stored users.
    pub fn len(&self) -> usize {
        self.lock().map(|users| users.by_id.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Users>, AuthError> {
        self.users
            .lock()
            .map_err(|_| AuthError::Internal("user table lock poisoned".into()))
    }

    fn check_online(&self) -> Result<(), AuthError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AuthError::Unavailable("database: connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User, AuthError> {
        self.check_online()?;
        let mut users = self.lock()?;
        let taken = users
            .by_id
            .values()
            .any(|u| u.username == new_user.username || u.email == new_user.email);
        if taken {
            return Err(AuthError::Conflict);
        }
        users.last_id += 1;
        let now = Utc::now();
        let user = User {
            id: users.last_id,
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            created_at: now,
            updated_at: now,
        };
        users.by_id.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError> {
        self.check_online()?;
        let users = self.lock()?;
        Ok(users.by_id.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, user_id: i64) -> Result<Option<User>, AuthError> {
        self.check_online()?;
        Ok(self.lock()?.by_id.get(&user_id).cloned())
    }

    async fn identity_taken(&self, username: &str, email: &str) -> Result<bool, AuthError> {
        self.check_online()?;
        let users = self.lock()?;
        Ok(users
            .by_id
            .values()
            .any(|u| u.username == username || u.email == email))
    }

    async fn ping(&self) -> Result<(), AuthError> {
        self.check_online()
    }
}
