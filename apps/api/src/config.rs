use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Every backend is optional: without `DATABASE_URL` the service runs on the
/// in-memory store, without `EMBEDDING_API_URL` on the local hashing embedder.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub seed_data_path: Option<PathBuf>,
    pub embedding_api_url: Option<String>,
    pub embedding_api_key: Option<String>,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    pub strength_model_path: Option<PathBuf>,
    pub calibration_config_path: Option<PathBuf>,
    pub embedding_cache_capacity: usize,
    pub embedding_cache_ttl_secs: i64,
    pub upstream_timeout_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: optional_env("DATABASE_URL"),
            database_max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 10)?,
            seed_data_path: optional_env("SEED_DATA_PATH").map(PathBuf::from),
            embedding_api_url: optional_env("EMBEDDING_API_URL"),
            embedding_api_key: optional_env("EMBEDDING_API_KEY"),
            embedding_model: optional_env("EMBEDDING_MODEL")
                .unwrap_or_else(|| "text-embedding-3-small".to_string()),
            embedding_dimension: parse_env("EMBEDDING_DIMENSION", 384)?,
            strength_model_path: optional_env("STRENGTH_MODEL_PATH").map(PathBuf::from),
            calibration_config_path: optional_env("CALIBRATION_CONFIG_PATH").map(PathBuf::from),
            embedding_cache_capacity: parse_env("EMBEDDING_CACHE_CAPACITY", 512)?,
            embedding_cache_ttl_secs: parse_env("EMBEDDING_CACHE_TTL_SECS", 3600)?,
            upstream_timeout_secs: parse_env("UPSTREAM_TIMEOUT_SECS", 10)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>()
        .with_context(|| format!("Environment variable '{key}' has invalid value '{raw}'"))
}
