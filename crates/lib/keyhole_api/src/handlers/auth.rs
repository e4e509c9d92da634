//! Authentication request handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::BearerToken;
use crate::models::{
    LoginRequest, LoginResponse, MessageResponse, ProfileResponse, RefreshResponse,
    RegisterRequest, RegisterResponse,
};

/// `POST /api/auth/register`: create a new user account.
pub async fn register_handler(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let Json(body) = body?;
    let user = state
        .auth
        .register(&body.username, &body.email, &body.password)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Registration successful".into(),
            user,
        }),
    ))
}

/// `POST /api/auth/login`: authenticate with username + password.
pub async fn login_handler(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<LoginResponse>> {
    let Json(body) = body?;
    let grant = state.auth.login(&body.username, &body.password).await?;
    Ok(Json(LoginResponse {
        message: "Login successful".into(),
        access_token: grant.access_token,
        refresh_token: grant.refresh_token,
        user: grant.user,
    }))
}

/// `POST /api/auth/refresh`: exchange the bearer refresh token for a new
/// access token.
pub async fn refresh_handler(
    State(state): State<AppState>,
    Extension(BearerToken(token)): Extension<BearerToken>,
) -> AppResult<Json<RefreshResponse>> {
    let grant = state.auth.refresh(&token).await?;
    Ok(Json(RefreshResponse {
        access_token: grant.access_token,
    }))
}

/// `GET /api/auth/profile`: the caller's profile.
pub async fn profile_handler(
    State(state): State<AppState>,
    Extension(BearerToken(token)): Extension<BearerToken>,
) -> AppResult<Json<ProfileResponse>> {
    let user = state.auth.fetch_profile(&token).await?;
    Ok(Json(ProfileResponse { user }))
}

/// `POST /api/auth/logout`: drop the server-side session state.
pub async fn logout_handler(
    State(state): State<AppState>,
    Extension(BearerToken(token)): Extension<BearerToken>,
) -> AppResult<Json<MessageResponse>> {
    state.auth.logout(&token).await?;
    Ok(Json(MessageResponse {
        message: "Logout successful".into(),
    }))
}
