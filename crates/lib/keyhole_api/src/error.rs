//! Application error types.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use keyhole_core::auth::AuthError;
use keyhole_core::models::auth::TokenKind;
use thiserror::Error;
use tracing::{error, warn};

use crate::models::ErrorResponse;

/// Marker for any rejected access token. The client should refresh.
pub const TOKEN_EXPIRED: &str = "token_expired";
/// Marker for any rejected refresh token. The client must log in again.
pub const SESSION_EXPIRED: &str = "session_expired";
pub const INVALID_CREDENTIALS: &str = "invalid_credentials";
pub const CONFLICT: &str = "conflict";
pub const NOT_FOUND: &str = "not_found";
pub const VALIDATION_ERROR: &str = "validation_error";
pub const UNAVAILABLE: &str = "unavailable";
pub const INTERNAL_ERROR: &str = "internal_error";

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Access token rejected")]
    TokenExpired,

    #[error("Refresh token rejected")]
    SessionExpired,

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    /// Rejection for a missing or invalid token of `kind`.
    pub fn unauthorized(kind: TokenKind) -> Self {
        match kind {
            TokenKind::Access => AppError::TokenExpired,
            TokenKind::Refresh => AppError::SessionExpired,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::TokenExpired | AppError::SessionExpired => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn marker(&self) -> &'static str {
        match self {
            AppError::Validation(_) => VALIDATION_ERROR,
            AppError::NotFound(_) => NOT_FOUND,
            AppError::Conflict(_) => CONFLICT,
            AppError::InvalidCredentials => INVALID_CREDENTIALS,
            AppError::TokenExpired => TOKEN_EXPIRED,
            AppError::SessionExpired => SESSION_EXPIRED,
            AppError::Unavailable(_) => UNAVAILABLE,
            AppError::Internal(_) => INTERNAL_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::Validation(m) | AppError::NotFound(m) | AppError::Conflict(m) => m.clone(),
            AppError::InvalidCredentials => "Invalid username or password".into(),
            AppError::TokenExpired => "Access token is missing, invalid or expired".into(),
            AppError::SessionExpired => "Session expired, please log in again".into(),
            AppError::Unavailable(detail) => {
                warn!(detail = %detail, "backend unavailable");
                "Service temporarily unavailable".into()
            }
            AppError::Internal(detail) => {
                error!(detail = %detail, "internal error");
                "Internal server error".into()
            }
        };
        let body = Json(ErrorResponse {
            error: self.marker().to_string(),
            message,
        });
        (self.status(), body).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Conflict => AppError::Conflict("Username or email already registered".into()),
            AuthError::InvalidCredentials => AppError::InvalidCredentials,
            AuthError::Unauthorized(kind) => AppError::unauthorized(kind),
            AuthError::NotFound => AppError::NotFound("User not found".into()),
            AuthError::ValidationError(msg) => AppError::Validation(msg),
            AuthError::Unavailable(msg) => AppError::Unavailable(msg),
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::Validation(format!("Invalid request body: {}", e.body_text()))
    }
}
