//! # keyhole_api
//!
//! HTTP API library for Keyhole: the axum router over
//! [`keyhole_core::auth::service::AuthService`].

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::http::Uri;
use axum::routing::{get, post};
use keyhole_core::auth::jwt::TokenCodec;
use keyhole_core::auth::service::AuthService;
use keyhole_core::auth::store::CredentialStore;
use keyhole_core::cache::{CacheStore, SessionCache};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::error::AppError;
use crate::handlers::{auth, health};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Authentication service.
    pub auth: AuthService,
    /// API configuration.
    pub config: ApiConfig,
}

impl AppState {
    /// Wire the auth service from `config` and injected backends.
    pub fn new(config: ApiConfig, store: Arc<dyn CredentialStore>, cache: Arc<dyn CacheStore>) -> Self {
        let auth = AuthService::new(
            store,
            SessionCache::new(cache),
            TokenCodec::new(config.jwt_secret.as_bytes()),
            config.auth_settings(),
        );
        Self { auth, config }
    }
}

/// Run embedded database migrations.
///
/// Delegates to `keyhole_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    keyhole_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route(routes::POST_AUTH_REGISTER, post(auth::register_handler))
        .route(routes::POST_AUTH_LOGIN, post(auth::login_handler))
        .route(routes::GET_HEALTH, get(health::health_handler));

    // Routes taking the refresh token
    let refresh = Router::new()
        .route(routes::POST_AUTH_REFRESH, post(auth::refresh_handler))
        .layer(axum::middleware::from_fn(middleware::auth::require_refresh_token));

    // Routes taking the access token
    let protected = Router::new()
        .route(routes::GET_AUTH_PROFILE, get(auth::profile_handler))
        .route(routes::POST_AUTH_LOGOUT, post(auth::logout_handler))
        .layer(axum::middleware::from_fn(middleware::auth::require_access_token));

    Router::new()
        .merge(public)
        .merge(refresh)
        .merge(protected)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}
