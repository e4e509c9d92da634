//! Health endpoint.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;

use crate::AppState;
use crate::models::HealthResponse;

/// `GET /health`: pings the database and the cache.
///
/// Returns 503 with `status: "degraded"` when either is unreachable.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let report = state.auth.health().await;
    let (status, label) = if report.is_healthy() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };
    (
        status,
        Json(HealthResponse {
            status: label.into(),
            database: report.database,
            cache: report.cache,
            timestamp: Utc::now(),
        }),
    )
}
