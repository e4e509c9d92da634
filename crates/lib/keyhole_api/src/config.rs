//! API server configuration.

use std::time::Duration;

use keyhole_core::auth::jwt::resolve_jwt_secret;
use keyhole_core::config::{
    AuthSettings, DEFAULT_ACCESS_TOKEN_TTL, DEFAULT_REFRESH_TOKEN_TTL, MAX_TOKEN_TTL,
};
use tracing::warn;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8082";
pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost:5432/keyhole";
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/0";

/// Configuration for the API server.
#[derive(Clone)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:8082").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub pg_connection_url: String,
    /// Redis connection URL.
    pub redis_url: String,
    /// JWT signing secret.
    pub jwt_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("pg_connection_url", &self.pg_connection_url)
            .field("redis_url", &self.redis_url)
            .field("jwt_secret", &"<redacted>")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .finish()
    }
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                     | Default                              |
    /// |------------------------------|--------------------------------------|
    /// | `BIND_ADDR`                  | `127.0.0.1:8082`                     |
    /// | `DATABASE_URL`               | `postgres://localhost:5432/keyhole`  |
    /// | `REDIS_URL`                  | `redis://127.0.0.1:6379/0`           |
    /// | `JWT_SECRET` / `AUTH_SECRET` | generated & persisted to file        |
    /// | `JWT_ACCESS_EXPIRES_SECS`    | `900`                                |
    /// | `JWT_REFRESH_EXPIRES_SECS`   | `604800`                             |
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.into()),
            pg_connection_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.into()),
            redis_url: std::env::var("REDIS_URL").unwrap_or_else(|_| DEFAULT_REDIS_URL.into()),
            jwt_secret: resolve_jwt_secret(),
            access_token_ttl: env_secs("JWT_ACCESS_EXPIRES_SECS", DEFAULT_ACCESS_TOKEN_TTL),
            refresh_token_ttl: env_secs("JWT_REFRESH_EXPIRES_SECS", DEFAULT_REFRESH_TOKEN_TTL),
        }
    }

    /// Token and cache lifetimes for the auth service.
    pub fn auth_settings(&self) -> AuthSettings {
        AuthSettings::with_token_ttls(self.access_token_ttl, self.refresh_token_ttl)
    }
}

fn env_secs(name: &str, default: Duration) -> Duration {
    match std::env::var(name) {
        Ok(raw) => parse_secs(&raw).unwrap_or_else(|| {
            warn!(var = name, value = %raw, "ignoring invalid duration, using default");
            default
        }),
        Err(_) => default,
    }
}

/// Positive whole seconds, at most [`MAX_TOKEN_TTL`].
fn parse_secs(raw: &str) -> Option<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => None,
        Ok(secs) => Some(Duration::from_secs(secs)).filter(|ttl| *ttl <= MAX_TOKEN_TTL),
    }
}
