mod config;
mod db;
mod embedding;
mod errors;
mod fingerprint;
mod market;
mod models;
mod prediction;
mod routes;
mod state;
mod store;
mod time_source;

#[cfg(test)]
mod testing;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::embedding::cache::CacheConfig;
use crate::embedding::{EmbeddingProvider, HashingEmbeddingProvider, HttpEmbeddingProvider};
use crate::prediction::calibration::CalibrationPolicy;
use crate::prediction::engine::{EngineConfig, PredictionEngine};
use crate::prediction::job_match::MatchWeights;
use crate::prediction::strength::{CandidateStrengthModel, LogisticStrengthModel};
use crate::prediction::what_if::WhatIfSimulator;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{CandidateStore, InMemoryStore, JobStore, PgStore, PredictionHistory};
use crate::time_source::SystemTimeSourceDefault;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting HirePulse prediction API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize stores: PostgreSQL when configured, otherwise in-memory
    let (candidates, jobs, history) = match &config.database_url {
        Some(url) => share_store(Arc::new(PgStore::new(
            create_pool(url, config.database_max_connections).await?,
        ))),
        None => {
            let store = match &config.seed_data_path {
                Some(path) => InMemoryStore::load_seed_file(path)?,
                None => InMemoryStore::new(),
            };
            info!("No DATABASE_URL set, using in-memory store");
            share_store(Arc::new(store))
        }
    };

    // Initialize embedding provider
    let provider: Arc<dyn EmbeddingProvider> = match &config.embedding_api_url {
        Some(url) => Arc::new(HttpEmbeddingProvider::new(
            url.clone(),
            config.embedding_api_key.clone(),
            config.embedding_model.clone(),
            config.embedding_dimension,
        )?),
        None => Arc::new(HashingEmbeddingProvider::new(config.embedding_dimension)),
    };
    info!(
        "Embedding provider initialized (model: {}, dimension: {})",
        provider.model_name(),
        provider.dimension()
    );

    // Initialize candidate strength model (built-in coefficients unless an export is given)
    let strength: Arc<dyn CandidateStrengthModel> = match &config.strength_model_path {
        Some(path) => Arc::new(LogisticStrengthModel::from_json_file(path)?),
        None => Arc::new(LogisticStrengthModel::default()),
    };
    info!(
        "Strength model initialized: {} ({} features)",
        strength.name(),
        strength.feature_names().len()
    );

    let calibration = match &config.calibration_config_path {
        Some(path) => CalibrationPolicy::from_json_file(path)?,
        None => CalibrationPolicy::default(),
    };

    let engine_config = EngineConfig {
        upstream_timeout: Duration::from_secs(config.upstream_timeout_secs),
        cache: CacheConfig {
            capacity: config.embedding_cache_capacity,
            ttl: chrono::Duration::seconds(config.embedding_cache_ttl_secs),
            ..CacheConfig::default()
        },
        match_weights: MatchWeights::default(),
        calibration,
    };

    let engine = Arc::new(PredictionEngine::new(
        candidates,
        jobs.clone(),
        provider,
        strength,
        engine_config,
        Arc::new(SystemTimeSourceDefault),
    )?);

    // Build app state
    let state = AppState {
        what_if: Arc::new(WhatIfSimulator::new(engine.clone())),
        engine,
        jobs,
        history,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the dashboard host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Hands one backend out as all three collaborator roles.
fn share_store<S>(
    store: Arc<S>,
) -> (
    Arc<dyn CandidateStore>,
    Arc<dyn JobStore>,
    Arc<dyn PredictionHistory>,
)
where
    S: CandidateStore + JobStore + PredictionHistory + 'static,
{
    (store.clone(), store.clone(), store)
}
