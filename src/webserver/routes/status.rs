/// Health, status, and metrics endpoints
use std::sync::Arc;

use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use serde::Serialize;

use crate::metrics::{CacheSnapshot, PoolSnapshot};
use crate::webserver::state::AppState;
use crate::webserver::utils::success_response;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: chrono::DateTime<Utc>,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub name: String,
    pub env: String,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub pool: PoolSnapshot,
    pub cache: CacheSnapshot,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(system_status))
        .route("/metrics", get(system_metrics))
}

/// GET /api/health
async fn health_check() -> Response {
    success_response(HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /api/status
async fn system_status(State(state): State<Arc<AppState>>) -> Response {
    success_response(StatusResponse {
        name: state.config.app.name.clone(),
        env: state.config.app.env.clone(),
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_seconds(),
        pool: state.pool.stats().into(),
        cache: state.cache.stats().into(),
    })
}

/// GET /api/metrics
async fn system_metrics(State(state): State<Arc<AppState>>) -> Response {
    let snapshot = state.metrics.gather(&state.pool, &state.cache);
    success_response(snapshot)
}
