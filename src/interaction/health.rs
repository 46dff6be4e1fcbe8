use axum::{Json, extract::State};

use crate::{base::types::HealthResponse, runtime::Runtime};

/// Axum handler for `GET /health`.
pub async fn health(State(runtime): State<Runtime>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        device: runtime.classifier.device(),
    })
}
