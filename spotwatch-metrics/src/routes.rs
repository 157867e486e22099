//! Route configuration.

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::handlers;
use crate::state::MetricsState;

/// Creates the router serving `metrics_path` and `/health`.
pub fn create_router(state: Arc<MetricsState>, metrics_path: &str) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route(metrics_path, get(handlers::scrape))
        .with_state(state)
}
