//! Authentication and session logic.
//!
//! Provides password hashing, the JWT codec, the credential store contract
//! (Postgres and in-memory), input validation and the [`service::AuthService`]
//! that orchestrates them.

pub mod jwt;
pub mod memory;
pub mod password;
pub mod queries;
pub mod service;
pub mod store;
pub mod validation;

use thiserror::Error;

use crate::cache::CacheError;
use crate::models::auth::TokenKind;

/// Authentication errors.
///
/// `InvalidCredentials` and `Unauthorized` are deliberately coarse: callers
/// learn that a login or token was rejected, never which part was wrong.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Username or email already registered")]
    Conflict,

    #[error("Invalid credentials")]
    InvalidCredentials,

    /// A token presented where a token of the given kind is required was
    /// missing, malformed, wrongly signed, expired or of the other kind.
    #[error("Unauthorized")]
    Unauthorized(TokenKind),

    #[error("User not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => AuthError::Conflict,
            _ => AuthError::Unavailable(format!("database: {e}")),
        }
    }
}

impl From<CacheError> for AuthError {
    fn from(e: CacheError) -> Self {
        AuthError::Unavailable(e.to_string())
    }
}
