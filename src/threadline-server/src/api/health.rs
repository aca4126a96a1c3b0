//! Service banner and health check.

use std::sync::Arc;

use axum::{Json, extract::State};
use tracing::warn;

use crate::state::AppState;

use super::types::{HealthResponse, ServiceInfo};

pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "running".to_string(),
    })
}

/// Health check endpoint. Always 200; storage problems report `degraded`.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let (status, storage) = match state.pool.ping().await {
        Ok(()) => ("healthy", "connected".to_string()),
        Err(e) => {
            warn!(error = %e, "Storage health check failed");
            ("degraded", format!("error: {e}"))
        }
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime().as_secs(),
        storage,
        model: state.model_label.clone(),
    })
}
