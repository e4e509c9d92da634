//! Client error types.

use std::fmt;

use thiserror::Error;

/// Marker the API sends for a rejected access token.
pub const TOKEN_EXPIRED: &str = "token_expired";
/// Marker the API sends for a rejected refresh token.
pub const SESSION_EXPIRED: &str = "session_expired";

/// A non-success response from the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure {
    pub status: u16,
    /// Machine-checkable marker, e.g. `token_expired`.
    pub error: String,
    pub message: String,
}

impl ApiFailure {
    /// The access token was rejected and a refresh may help.
    pub fn needs_refresh(&self) -> bool {
        self.status == 401 && self.error == TOKEN_EXPIRED
    }
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (HTTP {}): {}", self.error, self.status, self.message)
    }
}

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid server URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("{0}")]
    Api(ApiFailure),

    /// No stored session; log in first.
    #[error("not logged in")]
    NotLoggedIn,

    /// The refresh token was rejected; local session data has been cleared.
    #[error("session expired, please log in again")]
    SessionExpired,

    #[error("session storage: {0}")]
    Session(String),
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::Session(e.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Session(e.to_string())
    }
}
