//! Bearer token extraction.
//!
//! The middleware only pulls the token out of the `Authorization` header;
//! verification happens in the auth service, which knows which kind of token
//! each operation requires.

use axum::{
    extract::Request,
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use keyhole_core::models::auth::TokenKind;

use crate::error::AppError;

/// Raw bearer token, stored in request extensions.
#[derive(Clone)]
pub struct BearerToken(pub String);

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

/// Extract `Authorization: Bearer <token>`. A missing header, another scheme
/// or an empty token is rejected as an invalid token of `required` kind.
pub fn bearer_token(headers: &HeaderMap, required: TokenKind) -> Result<BearerToken, AppError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| BearerToken(token.to_string()))
        .ok_or_else(|| AppError::unauthorized(required))
}

/// Axum middleware for routes that take an access token.
pub async fn require_access_token(mut request: Request, next: Next) -> Result<Response, AppError> {
    let token = bearer_token(request.headers(), TokenKind::Access)?;
    request.extensions_mut().insert(token);
    Ok(next.run(request).await)
}

/// Axum middleware for routes that take a refresh token.
pub async fn require_refresh_token(mut request: Request, next: Next) -> Result<Response, AppError> {
    let token = bearer_token(request.headers(), TokenKind::Refresh)?;
    request.extensions_mut().insert(token);
    Ok(next.run(request).await)
}
