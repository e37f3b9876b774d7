//! HTTP request handlers for the metrics endpoint.
//!
//! Serves retention metrics as JSON, grouped under a `retention` key, plus
//! a health check reporting the scanner's lifecycle state.

use axum::{extract::State, response::Json, routing::get, Router as AxumRouter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tidemark_retention::{RetentionMetrics, RetentionSnapshot, StopWaiter};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Live retention metrics
    pub metrics: Arc<RetentionMetrics>,
    /// Observer of the scanner's lifecycle
    pub scanner: StopWaiter,
}

/// Body of `GET /debug/vars`
#[derive(Debug, Serialize, Deserialize)]
pub struct VarsResponse {
    /// Retention metrics snapshot
    pub retention: RetentionSnapshot,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// Overall health status
    pub status: String,
    /// Scanner lifecycle state
    pub scanner: String,
}

/// GET /debug/vars - Current metrics, recomputed on every request
async fn debug_vars(State(state): State<AppState>) -> Json<VarsResponse> {
    Json(VarsResponse {
        retention: state.metrics.snapshot(),
    })
}

/// GET /health - Health check
async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "healthy".to_string(),
        scanner: state.scanner.state().as_str().to_string(),
    })
}

/// Create the axum router with all endpoints
pub fn create_router(state: AppState) -> AxumRouter {
    AxumRouter::new()
        .route("/debug/vars", get(debug_vars))
        .route("/health", get(health_check))
        .with_state(state)
}
