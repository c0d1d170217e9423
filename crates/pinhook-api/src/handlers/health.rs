//! Health check handlers for service monitoring.
//!
//! The service holds no connections of its own, so both probes only report
//! that the process is serving requests. Store reachability is surfaced by
//! webhook responses instead.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, instrument};

/// Health check response structure.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall service health status
    pub status: HealthStatus,
    /// Timestamp when health check was performed
    pub timestamp: DateTime<Utc>,
    /// Service version information
    pub version: String,
}

/// Overall health status enumeration.
#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Serving requests
    Healthy,
}

/// Health check endpoint handler.
#[instrument(name = "health_check")]
pub async fn health_check() -> Response {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    debug!(status = ?response.status, "Health check completed");

    (StatusCode::OK, Json(response)).into_response()
}

/// Liveness check endpoint for orchestrator probes.
#[instrument(name = "liveness_check")]
pub async fn liveness_check() -> Response {
    debug!("Performing liveness check");

    let response = serde_json::json!({
        "status": "alive",
        "timestamp": Utc::now(),
        "version": env!("CARGO_PKG_VERSION"),
        "service": "pinhook"
    });

    (StatusCode::OK, Json(response)).into_response()
}
