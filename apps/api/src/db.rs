use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

/// Tables read or written by `PgStore`.
pub const REQUIRED_TABLES: [&str; 3] = ["candidate_profiles", "jobs", "shortlist_predictions"];

/// Creates the PostgreSQL pool backing the candidate, job and history stores.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    info!("Connecting to PostgreSQL (max {max_connections} connections)...");

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    let missing = missing_tables(&pool).await?;
    if missing.is_empty() {
        info!("PostgreSQL connection pool established");
    } else {
        // Reads against a missing table surface as data_unavailable fallbacks.
        warn!(missing = ?missing, "PostgreSQL schema is missing prediction tables");
    }
    Ok(pool)
}

async fn missing_tables(pool: &PgPool) -> Result<Vec<String>> {
    let present: Vec<String> = sqlx::query_scalar(
        "SELECT table_name::text FROM information_schema.tables \
         WHERE table_schema = current_schema() AND table_name = ANY($1)",
    )
    .bind(&REQUIRED_TABLES[..])
    .fetch_all(pool)
    .await
    .context("Failed to inspect PostgreSQL schema")?;

    Ok(absent(&present))
}

fn absent(present: &[String]) -> Vec<String> {
    REQUIRED_TABLES
        .iter()
        .filter(|table| !present.iter().any(|p| p == *table))
        .map(|table| table.to_string())
        .collect()
}
