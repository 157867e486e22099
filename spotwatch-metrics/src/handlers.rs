//! Request handlers.

use std::sync::Arc;

use axum::{extract::State, http::header, response::IntoResponse, Json};
use serde::Serialize;

use crate::prometheus::{render_prometheus, CONTENT_TYPE};
use crate::state::MetricsState;

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"`
    pub status: String,
    /// Crate version
    pub version: String,
    /// Seconds since the server state was created
    pub uptime_seconds: u64,
    /// Interruptions counted so far, over all clusters
    pub interruptions_total: u64,
}

/// GET /health
pub async fn health_check(State(state): State<Arc<MetricsState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        uptime_seconds: state.started.elapsed().as_secs(),
        interruptions_total: state.counter.total(),
    })
}

/// GET {metrics path}
pub async fn scrape(State(state): State<Arc<MetricsState>>) -> impl IntoResponse {
    let body = render_prometheus(&state.counter.samples());
    ([(header::CONTENT_TYPE, CONTENT_TYPE)], body)
}
