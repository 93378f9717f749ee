//! Shared fakes and fixtures for in-crate tests.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::prelude::*;

use crate::embedding::{EmbeddingError, EmbeddingProvider, HashingEmbeddingProvider};
use crate::models::candidate::{CandidateProfile, CandidateSkill, Proficiency, UserLevel};
use crate::models::job::JobPosting;
use crate::prediction::engine::{EngineConfig, PredictionEngine};
use crate::prediction::strength::LogisticStrengthModel;
use crate::prediction::what_if::WhatIfSimulator;
use crate::state::AppState;
use crate::store::InMemoryStore;
use crate::time_source::SystemTimeSourceDefault;

// ────────────────────────────────────────────────────────────────────────────
// Embedding fakes
// ────────────────────────────────────────────────────────────────────────────

/// Hashing embedder that counts calls and can be switched into failure or slow mode.
pub struct CountingEmbeddingProvider {
    inner: HashingEmbeddingProvider,
    calls: AtomicUsize,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl CountingEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            inner: HashingEmbeddingProvider::new(dimension),
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            delay: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &HashingEmbeddingProvider {
        &self.inner
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl EmbeddingProvider for CountingEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(EmbeddingError::Api {
                status: 503,
                message: "simulated outage".to_string(),
            });
        }
        self.inner.embed_sync(text)
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_name(&self) -> &str {
        "counting-hashing"
    }
}

/// Returns the same vector for every input, simulating a stuck upstream model.
pub struct ConstantEmbeddingProvider {
    vector: Vec<f32>,
}

impl ConstantEmbeddingProvider {
    pub fn new(vector: Vec<f32>) -> Self {
        Self { vector }
    }
}

#[async_trait]
impl EmbeddingProvider for ConstantEmbeddingProvider {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.vector.clone())
    }

    fn dimension(&self) -> usize {
        self.vector.len()
    }

    fn model_name(&self) -> &str {
        "constant"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Fixtures
// ────────────────────────────────────────────────────────────────────────────

pub fn skill(name: &str) -> CandidateSkill {
    CandidateSkill::new(name, Proficiency::Intermediate)
}

pub fn student_profile(candidate_id: &str) -> CandidateProfile {
    CandidateProfile {
        candidate_id: candidate_id.to_string(),
        skills: vec![
            skill("Python"),
            skill("Machine Learning"),
            skill("SQL"),
            CandidateSkill::new("TensorFlow", Proficiency::Beginner),
        ],
        resume_text: Some(
            "Computer science student. Built machine learning projects in Python with \
             TensorFlow and pandas, and wrote SQL queries for a campus analytics dashboard."
                .to_string(),
        ),
        user_level: UserLevel::Student,
        resume_quality_score: Some(0.7),
        experience_months: 3,
        projects_count: 3,
        education_degree: Some("Bachelor".to_string()),
        cgpa: Some(8.1),
    }
}

pub fn ml_job(job_id: &str) -> JobPosting {
    JobPosting {
        job_id: job_id.to_string(),
        title: "Machine Learning Engineer".to_string(),
        company: Some("Acme AI".to_string()),
        full_description: "We are hiring a machine learning engineer to build and deploy models \
            with Python, TensorFlow, SQL and Docker on AWS."
            .to_string(),
        required_skills: vec![
            "Python".to_string(),
            "TensorFlow".to_string(),
            "SQL".to_string(),
            "Docker".to_string(),
            "AWS".to_string(),
        ],
        posted_at: Utc::now(),
        applicants: Some(120),
    }
}

pub fn frontend_job(job_id: &str) -> JobPosting {
    JobPosting {
        job_id: job_id.to_string(),
        title: "Frontend Developer".to_string(),
        company: Some("Pixel Labs".to_string()),
        full_description: "Frontend developer crafting accessible interfaces in React and \
            TypeScript, with strong CSS and HTML fundamentals."
            .to_string(),
        required_skills: vec![
            "React".to_string(),
            "TypeScript".to_string(),
            "CSS".to_string(),
            "HTML".to_string(),
        ],
        posted_at: Utc::now(),
        applicants: Some(80),
    }
}

pub fn job_posted(title: &str, posted_at: DateTime<Utc>, applicants: Option<u32>) -> JobPosting {
    JobPosting {
        job_id: format!("{title}-{}", posted_at.timestamp_nanos_opt().unwrap_or_default()),
        title: title.to_string(),
        company: None,
        full_description: format!("{title} role description with enough detail to be valid."),
        required_skills: vec![],
        posted_at,
        applicants,
    }
}

/// Router state over an in-memory store holding `cand-1`, `job-ml` and `job-fe`.
pub async fn test_state() -> (AppState, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    store.upsert_candidate(student_profile("cand-1")).await;
    store.upsert_job(ml_job("job-ml")).await;
    store.upsert_job(frontend_job("job-fe")).await;

    let engine = Arc::new(
        PredictionEngine::new(
            store.clone(),
            store.clone(),
            Arc::new(HashingEmbeddingProvider::new(128)),
            Arc::new(LogisticStrengthModel::default()),
            EngineConfig::default(),
            Arc::new(SystemTimeSourceDefault),
        )
        .unwrap(),
    );

    let state = AppState {
        what_if: Arc::new(WhatIfSimulator::new(engine.clone())),
        engine,
        jobs: store.clone(),
        history: store.clone(),
    };
    (state, store)
}

// ────────────────────────────────────────────────────────────────────────────
// Log capture
// ────────────────────────────────────────────────────────────────────────────

/// Captures every event emitted while installed, as its message followed by
/// ` name=value` pairs for the structured fields.
#[derive(Clone, Default)]
pub struct CapturedLogs {
    messages: Arc<Mutex<Vec<String>>>,
}

impl CapturedLogs {
    /// Installs a capturing subscriber for the current thread.
    pub fn install() -> (Self, tracing::subscriber::DefaultGuard) {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::registry().with(logs.clone());
        let guard = tracing::subscriber::set_default(subscriber);
        (logs, guard)
    }

    pub fn count(&self, needle: &str) -> usize {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.contains(needle))
            .count()
    }
}

struct MessageVisitor<'a>(&'a mut String);

impl Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0.insert_str(0, &format!("{value:?}"));
        } else {
            self.0.push_str(&format!(" {}={value:?}", field.name()));
        }
    }
}

impl<S: Subscriber> Layer<S> for CapturedLogs {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut message = String::new();
        event.record(&mut MessageVisitor(&mut message));
        self.messages.lock().unwrap().push(message);
    }
}
