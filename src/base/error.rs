//! Typed failures for the prediction path and their HTTP mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use super::{
    prompts::{MISSING_SYMPTOMS, PREDICTION_FAILED},
    types::ErrorResponse,
};

/// Everything that can go wrong while answering `POST /predict`.
///
/// The server-side kinds share one external shape but are logged separately.
#[derive(Debug, Error)]
pub enum PredictError {
    /// Blank, missing, or unparseable symptom text.
    #[error("symptoms is required")]
    MissingSymptoms,
    /// The classifier itself failed.
    #[error("{0:#}")]
    Inference(anyhow::Error),
    /// The classifier returned something that cannot be a ranked result list.
    #[error("malformed classifier result: {0}")]
    MalformedResult(String),
    /// The inference worker pool could not run the request.
    #[error("inference worker unavailable: {0}")]
    WorkerUnavailable(String),
}

/// A classifier's blocking worker panicked or was cancelled before finishing.
#[derive(Debug, Error)]
#[error("classifier worker stopped: {0}")]
pub struct WorkerStopped(pub String);

impl PredictError {
    /// Sort a classifier failure into the right kind.
    ///
    /// A lost worker is a pool failure, not a model failure.
    pub fn from_classifier(err: anyhow::Error) -> Self {
        if err.is::<WorkerStopped>() {
            PredictError::WorkerUnavailable(err.to_string())
        } else {
            PredictError::Inference(err)
        }
    }

    /// Short tag used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::MissingSymptoms => "missing_symptoms",
            PredictError::Inference(_) => "inference",
            PredictError::MalformedResult(_) => "malformed_result",
            PredictError::WorkerUnavailable(_) => "worker_unavailable",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            PredictError::MissingSymptoms => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorResponse {
        match self {
            PredictError::MissingSymptoms => ErrorResponse {
                error: MISSING_SYMPTOMS.to_string(),
                details: None,
            },
            other => ErrorResponse {
                error: PREDICTION_FAILED.to_string(),
                details: Some(other.to_string()),
            },
        }
    }
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!(kind = self.kind(), "Prediction failed: {}", self);
        }

        (status, Json(self.body())).into_response()
    }
}
