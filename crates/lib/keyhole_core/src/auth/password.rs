//! Password hashing via bcrypt.
//!
//! bcrypt is CPU bound, so hashing and verification run on the blocking pool.

use std::fmt;
use std::sync::LazyLock;

use tokio::task;

use super::AuthError;

/// bcrypt cost factor.
pub const BCRYPT_COST: u32 = 12;

/// Hash checked when a login names no stored account, so that path costs the
/// same bcrypt work as a wrong password.
static DECOY_HASH: LazyLock<Option<PasswordHash>> =
    LazyLock::new(|| bcrypt::hash("keyhole-decoy", BCRYPT_COST).ok().map(PasswordHash));

/// A salted bcrypt hash.
///
/// Only [`hash_password`] and the credential stores (when loading a row) can
/// build one, so a plaintext or placeholder string can never end up in the
/// `password_hash` column.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wrap a hash read back from storage.
    pub(crate) fn from_stored(hash: String) -> Self {
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(..)")
    }
}

/// Hash a password with bcrypt (cost 12).
pub async fn hash_password(password: &str) -> Result<PasswordHash, AuthError> {
    let password = password.to_string();
    task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST))
        .await
        .map_err(|e| AuthError::Internal(format!("bcrypt task: {e}")))?
        .map(PasswordHash)
        .map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
}

/// Verify a password against a bcrypt hash.
pub async fn verify_password(password: &str, hash: &PasswordHash) -> Result<bool, AuthError> {
    let password = password.to_string();
    let hash = hash.0.clone();
    task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AuthError::Internal(format!("bcrypt task: {e}")))?
        .map_err(|e| AuthError::Internal(format!("bcrypt verify: {e}")))
}

/// Run a verification against a fixed hash and discard the outcome.
pub async fn verify_decoy(password: &str) -> Result<(), AuthError> {
    let password = password.to_string();
    task::spawn_blocking(move || {
        if let Some(decoy) = DECOY_HASH.as_ref() {
            // The outcome is never used.
            let _ = bcrypt::verify(password, &decoy.0);
        }
    })
    .await
    .map_err(|e| AuthError::Internal(format!("bcrypt task: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify() {
        let hash = hash_password("secret1").await.unwrap();
        assert!(verify_password("secret1", &hash).await.unwrap());
        assert!(!verify_password("secret2", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn hash_is_salted_with_fixed_cost() {
        let a = hash_password("secret1").await.unwrap();
        let b = hash_password("secret1").await.unwrap();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("$2b$12$"));
    }

    #[tokio::test]
    async fn decoy_is_a_full_cost_hash() {
        verify_decoy("secret1").await.unwrap();
        let decoy = DECOY_HASH.as_ref().expect("decoy hash");
        assert!(decoy.as_str().starts_with("$2b$12$"));
    }

    #[tokio::test]
    async fn debug_does_not_leak_hash() {
        let hash = hash_password("secret1").await.unwrap();
        assert_eq!(format!("{hash:?}"), "PasswordHash(..)");
    }
}
