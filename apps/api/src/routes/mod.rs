pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::market::handlers as market;
use crate::prediction::handlers as prediction;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Prediction API
        .route(
            "/api/v1/predictions/shortlist",
            post(prediction::handle_predict_shortlist),
        )
        .route(
            "/api/v1/predictions/shortlist/batch",
            post(prediction::handle_predict_batch),
        )
        .route(
            "/api/v1/predictions/what-if",
            post(prediction::handle_what_if),
        )
        .route(
            "/api/v1/predictions/model",
            get(prediction::handle_model_info),
        )
        // Market API
        .route(
            "/api/v1/market/stats",
            get(market::handle_current_market_stats).post(market::handle_market_stats),
        )
        .with_state(state)
}
