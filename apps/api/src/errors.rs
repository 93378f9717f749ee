use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::models::prediction::FallbackReason;
use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
/// Prediction endpoints never produce one for scoring failures; those
/// degrade to fallback predictions inside the engine.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Store(e) => {
                tracing::error!("Store error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_ERROR",
                    "A data store error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

/// Everything that can go wrong while scoring one (candidate, job) pair.
/// The engine converts each variant into a fallback prediction.
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error(
        "Isolation defect: embedding for job {job_id} is near-identical to job {other_job_id} (cosine {similarity:.5})"
    )]
    IsolationDefect {
        job_id: String,
        other_job_id: String,
        similarity: f64,
    },

    #[error("Embedding unavailable: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Candidate strength model unavailable: {0}")]
    Model(String),

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    #[error("Data unavailable: {0}")]
    Data(#[from] StoreError),
}

impl PredictionError {
    pub fn fallback_reason(&self) -> FallbackReason {
        match self {
            PredictionError::Validation(_) => FallbackReason::InvalidInput,
            PredictionError::IsolationDefect { .. } => FallbackReason::IsolationDefect,
            PredictionError::Embedding(_) => FallbackReason::EmbeddingUnavailable,
            PredictionError::Model(_) => FallbackReason::ModelUnavailable,
            PredictionError::Timeout { .. } => FallbackReason::UpstreamTimeout,
            PredictionError::Data(_) => FallbackReason::DataUnavailable,
        }
    }
}
