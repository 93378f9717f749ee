//! Axum route handlers for the Market API.

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::errors::AppError;
use crate::market::aggregator::{aggregate, MarketStat};
use crate::models::job::JobPosting;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MarketStatsRequest {
    pub jobs: Vec<JobPosting>,
}

/// POST /api/v1/market/stats
///
/// Aggregates the supplied postings. Does not touch the engine's market context.
pub async fn handle_market_stats(Json(request): Json<MarketStatsRequest>) -> Json<Vec<MarketStat>> {
    Json(aggregate(&request.jobs))
}

/// GET /api/v1/market/stats
///
/// Full recompute over the active job corpus. The result also becomes the
/// engine's market context for prediction explanations.
pub async fn handle_current_market_stats(
    State(state): State<AppState>,
) -> Result<Json<Vec<MarketStat>>, AppError> {
    let jobs = state.jobs.list_active_jobs().await?;
    let stats = aggregate(&jobs);
    state.engine.install_market_context(stats.clone()).await;
    Ok(Json(stats))
}
