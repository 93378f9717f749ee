//! Job embedding cache.
//!
//! Key space is exactly `{job_id}`; there is no default or shared key. Each
//! entry carries the hash of the description it was computed from; a hash
//! mismatch invalidates the entry. Eviction is LRU by capacity plus TTL by age,
//! and always removes whole entries keyed by their own job id.
//!
//! Computation happens outside the lock. The isolation check and the install
//! happen together under the lock, so a concurrent reader sees either the old
//! entry or the new one, never a partial write.

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use super::{cosine_similarity, EmbeddingProvider};
use crate::errors::PredictionError;
use crate::fingerprint::content_hash;
use crate::models::prediction::EmbeddingSource;
use crate::time_source::SystemTimeSource;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub capacity: usize,
    pub ttl: Duration,
    /// Number of recently computed vectors (across jobs) kept for the isolation check.
    pub history_window: usize,
    pub near_identity_threshold: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 512,
            ttl: Duration::hours(1),
            history_window: 32,
            near_identity_threshold: 0.999,
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    job_id: String,
    embedding: Arc<Vec<f32>>,
    description_hash: String,
    computed_at: DateTime<Utc>,
}

struct CacheState {
    entries: LruCache<String, Arc<CacheEntry>>,
    recent: VecDeque<Arc<CacheEntry>>,
}

/// An embedding handed out by the cache, tagged with where it came from.
#[derive(Debug, Clone)]
pub struct ResolvedEmbedding {
    pub job_id: String,
    pub vector: Arc<Vec<f32>>,
    pub description_hash: String,
    pub source: EmbeddingSource,
}

pub struct JobEmbeddingCache {
    provider: Arc<dyn EmbeddingProvider>,
    state: Mutex<CacheState>,
    config: CacheConfig,
    time_source: Arc<dyn SystemTimeSource>,
}

impl JobEmbeddingCache {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        config: CacheConfig,
        time_source: Arc<dyn SystemTimeSource>,
    ) -> Self {
        let capacity = NonZeroUsize::new(config.capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            provider,
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                recent: VecDeque::with_capacity(config.history_window),
            }),
            config,
            time_source,
        }
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    /// Returns the embedding for `job_id`, computing it when there is no live
    /// entry or when the stored description hash differs from `description`'s.
    pub async fn get_or_compute(
        &self,
        job_id: &str,
        description: &str,
    ) -> Result<ResolvedEmbedding, PredictionError> {
        if job_id.trim().is_empty() {
            return Err(PredictionError::Validation(
                "embedding cache requires a job id".to_string(),
            ));
        }

        let description_hash = content_hash(description);

        if let Some(entry) = self.lookup(job_id, &description_hash).await {
            debug!(job_id, "Job embedding served from cache");
            return Ok(ResolvedEmbedding {
                job_id: entry.job_id.clone(),
                vector: entry.embedding.clone(),
                description_hash: entry.description_hash.clone(),
                source: EmbeddingSource::Cache,
            });
        }

        let vector = self.provider.embed(description.trim()).await?;

        let entry = Arc::new(CacheEntry {
            job_id: job_id.to_string(),
            embedding: Arc::new(vector),
            description_hash,
            computed_at: self.time_source.now(),
        });

        self.install(entry.clone()).await?;

        Ok(ResolvedEmbedding {
            job_id: entry.job_id.clone(),
            vector: entry.embedding.clone(),
            description_hash: entry.description_hash.clone(),
            source: EmbeddingSource::Fresh,
        })
    }

    /// Drops the entry for one job. Other jobs' entries are untouched.
    #[cfg(test)]
    pub async fn invalidate(&self, job_id: &str) -> bool {
        let mut state = self.state.lock().await;
        state.recent.retain(|e| e.job_id != job_id);
        state.entries.pop(job_id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    async fn lookup(&self, job_id: &str, description_hash: &str) -> Option<Arc<CacheEntry>> {
        let mut state = self.state.lock().await;
        let entry = state.entries.get(job_id)?.clone();

        if entry.description_hash != description_hash {
            info!(
                job_id,
                stored_hash = %entry.description_hash,
                incoming_hash = %description_hash,
                "Job description changed, invalidating cached embedding"
            );
            state.entries.pop(job_id);
            return None;
        }

        if self.time_source.now() - entry.computed_at > self.config.ttl {
            debug!(job_id, "Cached job embedding expired");
            state.entries.pop(job_id);
            return None;
        }

        Some(entry)
    }

    async fn install(&self, entry: Arc<CacheEntry>) -> Result<(), PredictionError> {
        let mut state = self.state.lock().await;

        for other in state.recent.iter() {
            if other.job_id == entry.job_id || other.description_hash == entry.description_hash {
                continue;
            }
            let similarity = cosine_similarity(&entry.embedding, &other.embedding);
            if similarity > self.config.near_identity_threshold {
                error!(
                    severity = "critical",
                    job_id = %entry.job_id,
                    other_job_id = %other.job_id,
                    similarity,
                    "Isolation defect: distinct job descriptions produced indistinguishable embeddings"
                );
                return Err(PredictionError::IsolationDefect {
                    job_id: entry.job_id.clone(),
                    other_job_id: other.job_id.clone(),
                    similarity,
                });
            }
        }

        state.entries.put(entry.job_id.clone(), entry.clone());

        state.recent.retain(|e| e.job_id != entry.job_id);
        state.recent.push_back(entry);
        while state.recent.len() > self.config.history_window {
            state.recent.pop_front();
        }

        Ok(())
    }
}
