//! Collaborator adapters: candidate profiles, job corpus, prediction history.
//!
//! The engine only sees these traits. `PgStore` is the production backend;
//! `InMemoryStore` backs local runs (optionally seeded from JSON) and tests.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::candidate::CandidateProfile;
use crate::models::job::JobPosting;
use crate::models::prediction::ShortlistPrediction;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Malformed {entity} row {id}: {reason}")]
    Malformed {
        entity: &'static str,
        id: String,
        reason: String,
    },

    #[error("Seed data error: {0}")]
    Seed(String),
}

#[async_trait]
pub trait CandidateStore: Send + Sync {
    async fn get_candidate(&self, candidate_id: &str)
        -> Result<Option<CandidateProfile>, StoreError>;
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn get_job(&self, job_id: &str) -> Result<Option<JobPosting>, StoreError>;

    async fn list_active_jobs(&self) -> Result<Vec<JobPosting>, StoreError>;
}

/// Append-only analytics sink for served predictions.
#[async_trait]
pub trait PredictionHistory: Send + Sync {
    async fn record(
        &self,
        candidate_id: &str,
        prediction: &ShortlistPrediction,
    ) -> Result<(), StoreError>;
}
