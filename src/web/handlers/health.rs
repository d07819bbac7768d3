//! # Health Check Handler

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::web::errors::ApiResult;
use crate::web::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

/// Basic health check endpoint: GET /health
///
/// Pings storage; a failed ping is reported as a storage error.
pub async fn basic_health(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    state.task_service.health_check().await.map_err(|e| {
        error!(error = %e, "Health check failed");
        e
    })?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}
