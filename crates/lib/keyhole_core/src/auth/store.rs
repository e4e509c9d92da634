//! Credential store contract and its Postgres implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use super::{AuthError, queries};
use crate::models::auth::{NewUser, User};

/// Persistent user identities and password hashes. The source of truth for
/// every profile read that misses the cache.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a user. Fails with [`AuthError::Conflict`] when the username or
    /// email is taken, including when a concurrent insert wins the race.
    async fn create_user(&self, new_user: NewUser) -> Result<User, AuthError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError>;

    async fn find_by_id(&self, user_id: i64) -> Result<Option<User>, AuthError>;

    /// Whether the username or the email already belongs to a user.
    async fn identity_taken(&self, username: &str, email: &str) -> Result<bool, AuthError>;

    /// Reachability check for health reporting.
    async fn ping(&self) -> Result<(), AuthError>;
}

/// [`CredentialStore`] over the `users` table.
#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User, AuthError> {
        queries::create_user(&self.pool, &new_user).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError> {
        queries::find_user_by_username(&self.pool, username).await
    }

    async fn find_by_id(&self, user_id: i64) -> Result<Option<User>, AuthError> {
        queries::find_user_by_id(&self.pool, user_id).await
    }

    async fn identity_taken(&self, username: &str, email: &str) -> Result<bool, AuthError> {
        queries::identity_exists(&self.pool, username, email).await
    }

    async fn ping(&self) -> Result<(), AuthError> {
        queries::ping(&self.pool).await
    }
}
