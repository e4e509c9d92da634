//! Keyhole API server binary.
//!
//! Connects to PostgreSQL and Redis, runs migrations and serves the REST API
//! until interrupted.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use keyhole_api::config::ApiConfig;
use keyhole_core::auth::store::PgCredentialStore;
use keyhole_core::cache::redis::{RedisCacheStore, RedisSettings};
use keyhole_core::config::MAX_TOKEN_TTL;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// CLI arguments for the API server.
///
/// Unset options fall back to the environment (see [`ApiConfig::from_env`]).
#[derive(Parser, Debug)]
#[command(name = "keyhole_api_server", version, about = "Keyhole API server")]
struct Args {
    /// Address to listen on [env: BIND_ADDR].
    #[arg(long)]
    bind_addr: Option<String>,

    /// PostgreSQL connection URL [env: DATABASE_URL].
    #[arg(long)]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Redis connection URL [env: REDIS_URL].
    #[arg(long)]
    redis_url: Option<String>,

    /// Maximum number of Redis connections in the pool.
    #[arg(long, default_value_t = 16)]
    redis_pool_size: usize,

    /// Access token lifetime in seconds [env: JWT_ACCESS_EXPIRES_SECS].
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=MAX_TOKEN_TTL.as_secs()))]
    access_expires_secs: Option<u64>,

    /// Refresh token lifetime in seconds [env: JWT_REFRESH_EXPIRES_SECS].
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=MAX_TOKEN_TTL.as_secs()))]
    refresh_expires_secs: Option<u64>,
}

impl Args {
    fn apply(&self, config: &mut ApiConfig) {
        if let Some(bind_addr) = &self.bind_addr {
            config.bind_addr = bind_addr.clone();
        }
        if let Some(url) = &self.database_url {
            config.pg_connection_url = url.clone();
        }
        if let Some(url) = &self.redis_url {
            config.redis_url = url.clone();
        }
        if let Some(secs) = self.access_expires_secs {
            config.access_token_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = self.refresh_expires_secs {
            config.refresh_token_ttl = Duration::from_secs(secs);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,keyhole_api=debug,keyhole_core=debug")),
        )
        .init();

    let args = Args::parse();
    let mut config = ApiConfig::from_env();
    args.apply(&mut config);

    info!(bind_addr = %config.bind_addr, version = keyhole_core::version(), "starting keyhole_api_server");
    info!(max_connections = args.max_connections, "configuring connection pool");

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.pg_connection_url)
        .await?;

    info!("running database migrations");
    keyhole_api::migrate(&pool).await?;

    let mut redis = RedisSettings::new(&config.redis_url);
    redis.pool_size = args.redis_pool_size;
    let cache = RedisCacheStore::connect(&redis)?;

    let state = keyhole_api::AppState::new(
        config.clone(),
        Arc::new(PgCredentialStore::new(pool.clone())),
        Arc::new(cache),
    );

    let report = state.auth.health().await;
    if !report.cache {
        warn!("redis unreachable at startup, continuing without a warm cache");
    }

    let app = keyhole_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "REST API listening");

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for interrupt");
                return;
            }
            info!("interrupt received, shutting down");
            shutdown.cancel();
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    pool.close().await;
    info!("server stopped");
    Ok(())
}
