//! HTTP handlers for the symptom predictor.
//!
//! This module provides the request/response surface:
//! - `GET /health` reports liveness and the compute device
//! - `POST /predict` normalizes symptoms, classifies them, and enriches the results

pub mod health;
pub mod predict;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::runtime::Runtime;

/// Build the application router.
///
/// Cross-origin requests are allowed from anywhere so that mobile and web
/// clients can call the service directly.
pub fn router(runtime: Runtime) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/predict", post(predict::predict))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(runtime)
}
