use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Neutral score returned for every fallback. Never derived from intermediate state.
pub const FALLBACK_PROBABILITY: f64 = 50.0;

/// Per-call request assembled from the candidate and job stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub job_id: String,
    pub job_title: String,
    pub full_job_description: String,
    pub candidate_id: String,
    #[serde(default)]
    pub resume_text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingSource {
    Fresh,
    Cache,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionStatus {
    Success,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// `high_at` and `medium_at` are inclusive lower bounds, in percent.
    pub fn from_percentage(percentage: f64, high_at: f64, medium_at: f64) -> Self {
        if percentage >= high_at {
            Confidence::High
        } else if percentage >= medium_at {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

/// Failure class carried by a fallback prediction. The raw error is logged, never exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    InvalidInput,
    IsolationDefect,
    EmbeddingUnavailable,
    ModelUnavailable,
    UpstreamTimeout,
    DataUnavailable,
}

impl FallbackReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FallbackReason::InvalidInput => "invalid_input",
            FallbackReason::IsolationDefect => "isolation_defect",
            FallbackReason::EmbeddingUnavailable => "embedding_unavailable",
            FallbackReason::ModelUnavailable => "model_unavailable",
            FallbackReason::UpstreamTimeout => "upstream_timeout",
            FallbackReason::DataUnavailable => "data_unavailable",
        }
    }

    fn explanation(self) -> &'static str {
        match self {
            FallbackReason::InvalidInput => {
                "We could not score this match because the job or profile data is incomplete."
            }
            FallbackReason::IsolationDefect => {
                "Scoring was halted by an internal consistency check. This estimate is a neutral placeholder."
            }
            FallbackReason::EmbeddingUnavailable => {
                "The job-matching service is temporarily unavailable. This estimate is a neutral placeholder."
            }
            FallbackReason::ModelUnavailable => {
                "The candidate-strength model is temporarily unavailable. This estimate is a neutral placeholder."
            }
            FallbackReason::UpstreamTimeout => {
                "Scoring took too long and was stopped. This estimate is a neutral placeholder."
            }
            FallbackReason::DataUnavailable => {
                "Profile or job data could not be loaded. This estimate is a neutral placeholder."
            }
        }
    }
}

/// The engine's output. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortlistPrediction {
    pub job_id: String,
    pub job_title: String,
    /// Calibrated percentage, 0–100.
    pub shortlist_probability: f64,
    /// Raw model output scaled to 0–100.
    pub candidate_strength: f64,
    /// Raw match output scaled to 0–100.
    pub job_match_score: f64,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub weak_skills: Vec<String>,
    pub explanation: String,
    pub job_description_hash: String,
    pub embedding_source: Option<EmbeddingSource>,
    pub status: PredictionStatus,
    pub fallback_reason: Option<FallbackReason>,
    pub confidence: Confidence,
    pub timestamp: DateTime<Utc>,
}

impl ShortlistPrediction {
    /// Builds the fixed safe-default result. Every score field is a constant.
    pub fn fallback(
        job_id: &str,
        job_title: &str,
        job_description_hash: Option<&str>,
        reason: FallbackReason,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            job_id: job_id.to_string(),
            job_title: job_title.to_string(),
            shortlist_probability: FALLBACK_PROBABILITY,
            candidate_strength: FALLBACK_PROBABILITY,
            job_match_score: FALLBACK_PROBABILITY,
            matched_skills: vec![],
            missing_skills: vec![],
            weak_skills: vec![],
            explanation: format!("{} ({})", reason.explanation(), reason.as_str()),
            job_description_hash: job_description_hash.unwrap_or_default().to_string(),
            embedding_source: None,
            status: PredictionStatus::Fallback,
            fallback_reason: Some(reason),
            confidence: Confidence::Low,
            timestamp,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.status == PredictionStatus::Fallback
    }
}
