//! Prediction engine: the façade over validation, caching, scoring and calibration.
//!
//! `predict` never returns an error. Every failure is logged with its full
//! context and converted into a fallback prediction whose scores are fixed
//! constants, so a caller can never receive a number derived from a failed
//! or inconsistent intermediate step.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::embedding::cache::{CacheConfig, ResolvedEmbedding};
use crate::embedding::{EmbeddingProvider, JobEmbeddingCache};
use crate::errors::PredictionError;
use crate::fingerprint::content_hash;
use crate::market::aggregator::MarketStat;
use crate::market::categories::categorize;
use crate::models::candidate::CandidateProfile;
use crate::models::job::JobPosting;
use crate::models::prediction::{
    FallbackReason, PredictionRequest, PredictionStatus, ShortlistPrediction,
};
use crate::prediction::calibration::{CalibrationLayer, CalibrationPolicy, MatchEvidence};
use crate::prediction::job_match::{JobMatchScorer, MatchWeights};
use crate::prediction::skills::SkillVocabulary;
use crate::prediction::strength::CandidateStrengthModel;
use crate::prediction::tracker::{RequestTracker, TrackedRequest};
use crate::prediction::validation::validate_request;
use crate::store::{CandidateStore, JobStore};
use crate::time_source::SystemTimeSource;

/// Upper bound on jobs scored by one batch call.
pub const MAX_BATCH_JOBS: usize = 50;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Bound on each upstream call (embedding provider, strength model).
    pub upstream_timeout: Duration,
    pub cache: CacheConfig,
    pub match_weights: MatchWeights,
    pub calibration: CalibrationPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            upstream_timeout: Duration::from_secs(10),
            cache: CacheConfig::default(),
            match_weights: MatchWeights::default(),
            calibration: CalibrationPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub strength_model: String,
    pub strength_features: Vec<String>,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    pub cached_job_embeddings: usize,
    pub market_categories: usize,
    pub upstream_timeout_ms: u64,
}

pub struct PredictionEngine {
    candidates: Arc<dyn CandidateStore>,
    jobs: Arc<dyn JobStore>,
    cache: JobEmbeddingCache,
    strength: Arc<dyn CandidateStrengthModel>,
    matcher: JobMatchScorer,
    calibration: CalibrationLayer,
    vocabulary: SkillVocabulary,
    tracker: RequestTracker,
    market: RwLock<HashMap<String, MarketStat>>,
    time_source: Arc<dyn SystemTimeSource>,
    upstream_timeout: Duration,
}

impl PredictionEngine {
    pub fn new(
        candidates: Arc<dyn CandidateStore>,
        jobs: Arc<dyn JobStore>,
        provider: Arc<dyn EmbeddingProvider>,
        strength: Arc<dyn CandidateStrengthModel>,
        config: EngineConfig,
        time_source: Arc<dyn SystemTimeSource>,
    ) -> Result<Self> {
        Ok(Self {
            candidates,
            jobs,
            cache: JobEmbeddingCache::new(provider.clone(), config.cache, time_source.clone()),
            strength,
            matcher: JobMatchScorer::new(provider, config.match_weights),
            calibration: CalibrationLayer::new(config.calibration),
            vocabulary: SkillVocabulary::new()?,
            tracker: RequestTracker::default(),
            market: RwLock::new(HashMap::new()),
            time_source,
            upstream_timeout: config.upstream_timeout,
        })
    }

    // ────────────────────────────────────────────────────────────────────────
    // Public operations
    // ────────────────────────────────────────────────────────────────────────

    /// Scores one (candidate, job) pair. Always returns a prediction.
    pub async fn predict(&self, candidate_id: &str, job_id: &str) -> ShortlistPrediction {
        match self.load_pair(candidate_id, job_id).await {
            Ok((profile, job)) => self.predict_for_profile(&profile, &job).await,
            Err(e) => {
                let started = Instant::now();
                let prediction = self.fail(candidate_id, job_id, "", None, e);
                self.log_summary(candidate_id, &prediction, None, started);
                prediction
            }
        }
    }

    /// Scores an already-resolved profile against an already-resolved job.
    pub async fn predict_for_profile(
        &self,
        profile: &CandidateProfile,
        job: &JobPosting,
    ) -> ShortlistPrediction {
        self.run(profile, job, None, true).await
    }

    /// Scores up to [`MAX_BATCH_JOBS`] jobs concurrently. Output order matches `job_ids`.
    pub async fn predict_batch(
        self: &Arc<Self>,
        candidate_id: &str,
        job_ids: &[String],
    ) -> Result<Vec<ShortlistPrediction>, PredictionError> {
        if job_ids.len() > MAX_BATCH_JOBS {
            return Err(PredictionError::Validation(format!(
                "batch accepts at most {MAX_BATCH_JOBS} jobs, got {}",
                job_ids.len()
            )));
        }

        let mut tasks = JoinSet::new();
        for (index, job_id) in job_ids.iter().enumerate() {
            let engine = Arc::clone(self);
            let candidate_id = candidate_id.to_string();
            let job_id = job_id.clone();
            tasks.spawn(async move { (index, engine.predict(&candidate_id, &job_id).await) });
        }

        let mut slots: Vec<Option<ShortlistPrediction>> = vec![None; job_ids.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, prediction)) => slots[index] = Some(prediction),
                Err(e) => error!(candidate_id, "Batch prediction task failed: {e}"),
            }
        }

        let now = self.time_source.now();
        Ok(slots
            .into_iter()
            .zip(job_ids)
            .map(|(slot, job_id)| {
                slot.unwrap_or_else(|| {
                    ShortlistPrediction::fallback(
                        job_id,
                        "",
                        None,
                        FallbackReason::ModelUnavailable,
                        now,
                    )
                })
            })
            .collect())
    }

    /// Replaces the market snapshot in one step. Readers see the old or the new map.
    pub async fn install_market_context(&self, stats: Vec<MarketStat>) {
        let snapshot: HashMap<String, MarketStat> = stats
            .into_iter()
            .map(|s| (s.role_category.clone(), s))
            .collect();
        let categories = snapshot.len();
        *self.market.write().await = snapshot;
        info!(categories, "Installed market context");
    }

    pub async fn model_info(&self) -> ModelInfo {
        let provider = self.cache.provider();
        ModelInfo {
            strength_model: self.strength.name().to_string(),
            strength_features: self.strength.feature_names(),
            embedding_model: provider.model_name().to_string(),
            embedding_dimension: provider.dimension(),
            cached_job_embeddings: self.cache.len().await,
            market_categories: self.market.read().await.len(),
            upstream_timeout_ms: self.upstream_timeout.as_millis() as u64,
        }
    }

    // ────────────────────────────────────────────────────────────────────────
    // Building blocks shared with the what-if simulator
    // ────────────────────────────────────────────────────────────────────────

    pub(crate) async fn load_pair(
        &self,
        candidate_id: &str,
        job_id: &str,
    ) -> Result<(CandidateProfile, JobPosting), PredictionError> {
        if candidate_id.trim().is_empty() {
            return Err(PredictionError::Validation("candidate_id is required".to_string()));
        }
        if job_id.trim().is_empty() {
            return Err(PredictionError::Validation("job_id is required".to_string()));
        }

        let (profile, job) = tokio::join!(
            self.candidates.get_candidate(candidate_id),
            self.jobs.get_job(job_id)
        );
        let profile = profile?.ok_or_else(|| {
            PredictionError::Validation(format!("unknown candidate '{candidate_id}'"))
        })?;
        let job = job?.ok_or_else(|| PredictionError::Validation(format!("unknown job '{job_id}'")))?;

        Ok((profile, job))
    }

    pub(crate) fn prepare(
        &self,
        profile: &CandidateProfile,
        job: &JobPosting,
    ) -> Result<PredictionRequest, PredictionError> {
        let request = PredictionRequest {
            job_id: job.job_id.clone(),
            job_title: job.title.clone(),
            full_job_description: job.full_description.clone(),
            candidate_id: profile.candidate_id.clone(),
            resume_text: profile.resume_text.clone(),
        };
        validate_request(&request)?;
        Ok(request)
    }

    pub(crate) async fn resolve_job_embedding(
        &self,
        job: &JobPosting,
    ) -> Result<ResolvedEmbedding, PredictionError> {
        let resolved = self
            .bounded(
                "job_embedding",
                self.cache.get_or_compute(&job.job_id, &job.full_description),
            )
            .await?;

        if resolved.job_id != job.job_id {
            error!(
                severity = "critical",
                job_id = %job.job_id,
                served_job_id = %resolved.job_id,
                "Isolation defect: cache served an embedding for another job"
            );
            return Err(PredictionError::IsolationDefect {
                job_id: job.job_id.clone(),
                other_job_id: resolved.job_id,
                similarity: 1.0,
            });
        }
        Ok(resolved)
    }

    pub(crate) fn track(&self, job_id: &str, description_hash: &str) -> TrackedRequest<'_> {
        self.tracker.begin(job_id, description_hash)
    }

    /// Scores against an embedding resolved by the caller. The caller owns request tracking.
    pub(crate) async fn predict_pinned(
        &self,
        profile: &CandidateProfile,
        job: &JobPosting,
        embedding: &ResolvedEmbedding,
    ) -> ShortlistPrediction {
        self.run(profile, job, Some(embedding), false).await
    }

    /// `job` is `None` when the posting was never loaded; only the id is known then.
    pub(crate) fn fallback_for(
        &self,
        job_id: &str,
        job: Option<&JobPosting>,
        error: &PredictionError,
    ) -> ShortlistPrediction {
        let hash = job
            .filter(|j| !j.full_description.trim().is_empty())
            .map(|j| content_hash(&j.full_description));
        ShortlistPrediction::fallback(
            job_id,
            job.map(|j| j.title.as_str()).unwrap_or_default(),
            hash.as_deref(),
            error.fallback_reason(),
            self.time_source.now(),
        )
    }

    // ────────────────────────────────────────────────────────────────────────
    // Pipeline
    // ────────────────────────────────────────────────────────────────────────

    async fn run(
        &self,
        profile: &CandidateProfile,
        job: &JobPosting,
        pinned: Option<&ResolvedEmbedding>,
        track: bool,
    ) -> ShortlistPrediction {
        let started = Instant::now();

        let request = match self.prepare(profile, job) {
            Ok(request) => request,
            Err(e) => {
                let prediction = self.fail(&profile.candidate_id, &job.job_id, &job.title, None, e);
                self.log_summary(&profile.candidate_id, &prediction, None, started);
                return prediction;
            }
        };

        let description_hash = content_hash(&request.full_job_description);
        let resume_text = request.resume_text.as_deref().unwrap_or("");
        let resume_hash = content_hash(resume_text);

        info!(
            job_id = %request.job_id,
            job_title = %request.job_title,
            description_length = request.full_job_description.trim().chars().count(),
            description_hash = %description_hash,
            candidate_id = %request.candidate_id,
            resume_length = resume_text.trim().chars().count(),
            resume_hash = %resume_hash,
            "Job analysis"
        );

        let tracked = track.then(|| self.track(&request.job_id, &description_hash));

        let prediction = match self.score(profile, job, &description_hash, pinned).await {
            Ok(prediction) => prediction,
            Err(e) => self.fail(
                &request.candidate_id,
                &request.job_id,
                &request.job_title,
                Some(&description_hash),
                e,
            ),
        };
        self.log_summary(&request.candidate_id, &prediction, tracked.as_ref(), started);
        prediction
    }

    async fn score(
        &self,
        profile: &CandidateProfile,
        job: &JobPosting,
        description_hash: &str,
        pinned: Option<&ResolvedEmbedding>,
    ) -> Result<ShortlistPrediction, PredictionError> {
        let embedding = match pinned {
            Some(pinned) => {
                if pinned.job_id != job.job_id || pinned.description_hash != description_hash {
                    error!(
                        severity = "critical",
                        job_id = %job.job_id,
                        pinned_job_id = %pinned.job_id,
                        "Isolation defect: pinned embedding does not belong to this job"
                    );
                    return Err(PredictionError::IsolationDefect {
                        job_id: job.job_id.clone(),
                        other_job_id: pinned.job_id.clone(),
                        similarity: 1.0,
                    });
                }
                pinned.clone()
            }
            None => self.resolve_job_embedding(job).await?,
        };

        let required_skills = if job.required_skills.is_empty() {
            self.vocabulary.extract(&job.full_description)
        } else {
            job.required_skills.clone()
        };

        // Independent: the strength model sees only the profile
        let (strength, job_match) = tokio::join!(
            self.bounded("candidate_strength", self.strength.score(profile)),
            self.bounded(
                "job_match",
                self.matcher.score(
                    &profile.skills,
                    profile.resume_text(),
                    &embedding.vector,
                    &required_skills,
                )
            )
        );
        let strength = strength?;
        let job_match = job_match?;

        let raw_probability = strength.probability * job_match.score;

        let market = self.market_for(&job.title).await;
        let calibrated = self.calibration.calibrate(
            raw_probability,
            &profile.calibration_context(),
            MatchEvidence {
                matched: &job_match.matched,
                missing: &job_match.missing,
                weak: &job_match.weak,
            },
            market.as_ref(),
        );

        Ok(ShortlistPrediction {
            job_id: job.job_id.clone(),
            job_title: job.title.clone(),
            shortlist_probability: calibrated.probability,
            candidate_strength: round1(strength.probability * 100.0),
            job_match_score: round1(job_match.score * 100.0),
            matched_skills: job_match.matched,
            missing_skills: job_match.missing,
            weak_skills: job_match.weak,
            explanation: calibrated.explanation,
            job_description_hash: embedding.description_hash,
            embedding_source: Some(embedding.source),
            status: PredictionStatus::Success,
            fallback_reason: None,
            confidence: calibrated.confidence,
            timestamp: self.time_source.now(),
        })
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T, PredictionError>>,
    ) -> Result<T, PredictionError> {
        match tokio::time::timeout(self.upstream_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(PredictionError::Timeout {
                operation,
                timeout_ms: self.upstream_timeout.as_millis() as u64,
            }),
        }
    }

    async fn market_for(&self, job_title: &str) -> Option<MarketStat> {
        self.market.read().await.get(categorize(job_title)).cloned()
    }

    fn fail(
        &self,
        candidate_id: &str,
        job_id: &str,
        job_title: &str,
        description_hash: Option<&str>,
        error: PredictionError,
    ) -> ShortlistPrediction {
        let reason = error.fallback_reason();
        if reason == FallbackReason::InvalidInput {
            warn!(candidate_id, job_id, reason = reason.as_str(), "Prediction rejected: {error}");
        } else {
            error!(
                candidate_id,
                job_id,
                job_title,
                reason = reason.as_str(),
                description_hash = description_hash.unwrap_or(""),
                "Prediction failed, serving fallback: {error}"
            );
        }

        ShortlistPrediction::fallback(
            job_id,
            job_title,
            description_hash,
            reason,
            self.time_source.now(),
        )
    }

    fn log_summary(
        &self,
        candidate_id: &str,
        prediction: &ShortlistPrediction,
        tracked: Option<&TrackedRequest<'_>>,
        started: Instant,
    ) {
        let duplicate_of = tracked.and_then(|t| t.duplicate_of.as_deref()).unwrap_or("none");
        let state_leak_suspected = tracked.is_some_and(|t| t.state_leak_suspected);
        info!(
            job_id = %prediction.job_id,
            candidate_id,
            status = ?prediction.status,
            fallback_reason = prediction.fallback_reason.map(|r| r.as_str()).unwrap_or("none"),
            shortlist_probability = prediction.shortlist_probability,
            candidate_strength = prediction.candidate_strength,
            job_match_score = prediction.job_match_score,
            matched = prediction.matched_skills.len(),
            missing = prediction.missing_skills.len(),
            embedding_source = ?prediction.embedding_source,
            confidence = ?prediction.confidence,
            duplicate_of,
            state_leak_suspected,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Prediction summary"
        );
    }
}

fn round1(value: f64) -> f64 {
    (value.clamp(0.0, 100.0) * 10.0).round() / 10.0
}
