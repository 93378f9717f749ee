use std::sync::Arc;

use crate::prediction::engine::PredictionEngine;
use crate::prediction::what_if::WhatIfSimulator;
use crate::store::{JobStore, PredictionHistory};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Owns the embedding cache, request tracker and market context.
    pub engine: Arc<PredictionEngine>,
    pub what_if: Arc<WhatIfSimulator>,
    /// Job corpus for the market statistics endpoint.
    pub jobs: Arc<dyn JobStore>,
    /// Best-effort analytics sink. Failures are logged, never returned.
    pub history: Arc<dyn PredictionHistory>,
}
