//! Axum route handlers for the Prediction API.

use axum::{extract::State, Json};
use serde::Deserialize;
use tracing::warn;

use crate::errors::{AppError, PredictionError};
use crate::models::prediction::ShortlistPrediction;
use crate::prediction::engine::ModelInfo;
use crate::prediction::what_if::{WhatIfResult, WhatIfScenario};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ShortlistRequest {
    pub candidate_id: String,
    pub job_id: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchShortlistRequest {
    pub candidate_id: String,
    pub job_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct WhatIfRequest {
    pub candidate_id: String,
    pub job_id: String,
    #[serde(default)]
    pub scenario: WhatIfScenario,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/predictions/shortlist
///
/// Always 200: scoring failures come back as `status = "fallback"`.
pub async fn handle_predict_shortlist(
    State(state): State<AppState>,
    Json(request): Json<ShortlistRequest>,
) -> Json<ShortlistPrediction> {
    let prediction = state
        .engine
        .predict(&request.candidate_id, &request.job_id)
        .await;

    record_history(&state, &request.candidate_id, &prediction).await;

    Json(prediction)
}

/// POST /api/v1/predictions/shortlist/batch
pub async fn handle_predict_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchShortlistRequest>,
) -> Result<Json<Vec<ShortlistPrediction>>, AppError> {
    let predictions = state
        .engine
        .predict_batch(&request.candidate_id, &request.job_ids)
        .await
        .map_err(|e| match e {
            PredictionError::Validation(msg) => AppError::Validation(msg),
            other => AppError::Internal(anyhow::anyhow!(other)),
        })?;

    for prediction in &predictions {
        record_history(&state, &request.candidate_id, prediction).await;
    }

    Ok(Json(predictions))
}

/// POST /api/v1/predictions/what-if
pub async fn handle_what_if(
    State(state): State<AppState>,
    Json(request): Json<WhatIfRequest>,
) -> Json<WhatIfResult> {
    let result = state
        .what_if
        .simulate(&request.candidate_id, &request.job_id, &request.scenario)
        .await;
    Json(result)
}

/// GET /api/v1/predictions/model
pub async fn handle_model_info(State(state): State<AppState>) -> Json<ModelInfo> {
    Json(state.engine.model_info().await)
}

async fn record_history(state: &AppState, candidate_id: &str, prediction: &ShortlistPrediction) {
    if let Err(e) = state.history.record(candidate_id, prediction).await {
        warn!(
            candidate_id,
            job_id = %prediction.job_id,
            "Failed to record prediction history: {e}"
        );
    }
}
