use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::info;

use super::{CandidateStore, JobStore, PredictionHistory, StoreError};
use crate::models::candidate::CandidateProfile;
use crate::models::job::JobPosting;
use crate::models::prediction::ShortlistPrediction;

/// Shape of the optional `SEED_DATA_PATH` JSON file.
#[derive(Debug, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub candidates: Vec<CandidateProfile>,
    #[serde(default)]
    pub jobs: Vec<JobPosting>,
}

/// Process-local store. Used when no `DATABASE_URL` is configured, and in tests.
#[derive(Default)]
pub struct InMemoryStore {
    candidates: RwLock<HashMap<String, CandidateProfile>>,
    jobs: RwLock<HashMap<String, JobPosting>>,
    history: RwLock<Vec<(String, ShortlistPrediction)>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: SeedData) -> Self {
        Self {
            candidates: RwLock::new(
                seed.candidates
                    .into_iter()
                    .map(|c| (c.candidate_id.clone(), c))
                    .collect(),
            ),
            jobs: RwLock::new(seed.jobs.into_iter().map(|j| (j.job_id.clone(), j)).collect()),
            history: RwLock::new(Vec::new()),
        }
    }

    pub fn load_seed_file(path: &Path) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Seed(format!("{}: {e}", path.display())))?;
        let seed: SeedData = serde_json::from_str(&raw)
            .map_err(|e| StoreError::Seed(format!("{}: {e}", path.display())))?;
        info!(
            candidates = seed.candidates.len(),
            jobs = seed.jobs.len(),
            "Loaded seed data from {}",
            path.display()
        );
        Ok(Self::from_seed(seed))
    }

    #[cfg(test)]
    pub async fn upsert_candidate(&self, profile: CandidateProfile) {
        self.candidates
            .write()
            .await
            .insert(profile.candidate_id.clone(), profile);
    }

    #[cfg(test)]
    pub async fn upsert_job(&self, job: JobPosting) {
        self.jobs.write().await.insert(job.job_id.clone(), job);
    }

    #[cfg(test)]
    pub async fn history_len(&self) -> usize {
        self.history.read().await.len()
    }
}

#[async_trait]
impl CandidateStore for InMemoryStore {
    async fn get_candidate(
        &self,
        candidate_id: &str,
    ) -> Result<Option<CandidateProfile>, StoreError> {
        Ok(self.candidates.read().await.get(candidate_id).cloned())
    }
}

#[async_trait]
impl JobStore for InMemoryStore {
    async fn get_job(&self, job_id: &str) -> Result<Option<JobPosting>, StoreError> {
        Ok(self.jobs.read().await.get(job_id).cloned())
    }

    async fn list_active_jobs(&self) -> Result<Vec<JobPosting>, StoreError> {
        let mut jobs: Vec<JobPosting> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| a.job_id.cmp(&b.job_id));
        Ok(jobs)
    }
}

#[async_trait]
impl PredictionHistory for InMemoryStore {
    async fn record(
        &self,
        candidate_id: &str,
        prediction: &ShortlistPrediction,
    ) -> Result<(), StoreError> {
        self.history
            .write()
            .await
            .push((candidate_id.to_string(), prediction.clone()));
        Ok(())
    }
}
