//! What-if simulation: re-scores a candidate under hypothetical skill changes.
//!
//! The job embedding is resolved once and pinned, so baseline and projection
//! differ only in the candidate profile.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::PredictionError;
use crate::fingerprint::content_hash;
use crate::models::candidate::{CandidateProfile, CandidateSkill};
use crate::models::job::JobPosting;
use crate::models::prediction::ShortlistPrediction;
use crate::prediction::engine::PredictionEngine;
use crate::prediction::skills::normalize_skill;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WhatIfScenario {
    /// When present, must equal the job being simulated.
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub added_skills: Vec<CandidateSkill>,
    #[serde(default)]
    pub removed_skills: Vec<String>,
    #[serde(default)]
    pub modified_skills: Vec<CandidateSkill>,
}

impl WhatIfScenario {
    /// Removals, then proficiency changes (unknown skills are added), then
    /// additions (existing skills are left alone). Resume text is unchanged.
    pub fn apply(&self, profile: &CandidateProfile) -> CandidateProfile {
        let mut projected = profile.clone();

        let removed: Vec<String> = self.removed_skills.iter().map(|s| normalize_skill(s)).collect();
        projected
            .skills
            .retain(|s| !removed.contains(&normalize_skill(&s.name)));

        for change in &self.modified_skills {
            let key = normalize_skill(&change.name);
            match projected
                .skills
                .iter_mut()
                .find(|s| normalize_skill(&s.name) == key)
            {
                Some(existing) => existing.proficiency = change.proficiency,
                None => projected.skills.push(change.clone()),
            }
        }

        for addition in &self.added_skills {
            let key = normalize_skill(&addition.name);
            if key.is_empty() || projected.skills.iter().any(|s| normalize_skill(&s.name) == key) {
                continue;
            }
            projected.skills.push(addition.clone());
        }

        projected
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatIfResult {
    pub baseline: ShortlistPrediction,
    pub projected: ShortlistPrediction,
    pub probability_delta: f64,
    pub candidate_strength_delta: f64,
    pub job_match_delta: f64,
    /// False when either side fell back; deltas are then zero.
    pub comparable: bool,
}

impl WhatIfResult {
    fn new(baseline: ShortlistPrediction, projected: ShortlistPrediction) -> Self {
        let comparable = !baseline.is_fallback() && !projected.is_fallback();
        let delta = |a: f64, b: f64| {
            if comparable {
                ((b - a) * 10.0).round() / 10.0
            } else {
                0.0
            }
        };

        Self {
            probability_delta: delta(baseline.shortlist_probability, projected.shortlist_probability),
            candidate_strength_delta: delta(baseline.candidate_strength, projected.candidate_strength),
            job_match_delta: delta(baseline.job_match_score, projected.job_match_score),
            comparable,
            baseline,
            projected,
        }
    }
}

pub struct WhatIfSimulator {
    engine: Arc<PredictionEngine>,
}

impl WhatIfSimulator {
    pub fn new(engine: Arc<PredictionEngine>) -> Self {
        Self { engine }
    }

    pub async fn simulate(
        &self,
        candidate_id: &str,
        job_id: &str,
        scenario: &WhatIfScenario,
    ) -> WhatIfResult {
        if let Some(scenario_job) = scenario.job_id.as_deref() {
            if scenario_job != job_id {
                let error = PredictionError::Validation(format!(
                    "scenario job_id '{scenario_job}' does not match '{job_id}'"
                ));
                return self.both_failed(job_id, None, &error);
            }
        }

        let (profile, job) = match self.engine.load_pair(candidate_id, job_id).await {
            Ok(pair) => pair,
            Err(e) => return self.both_failed(job_id, None, &e),
        };

        if let Err(e) = self.engine.prepare(&profile, &job) {
            return self.both_failed(job_id, Some(&job), &e);
        }

        let _tracked = self
            .engine
            .track(&job.job_id, &content_hash(&job.full_description));

        let embedding = match self.engine.resolve_job_embedding(&job).await {
            Ok(embedding) => embedding,
            Err(e) => return self.both_failed(job_id, Some(&job), &e),
        };

        let projected_profile = scenario.apply(&profile);
        let (baseline, projected) = tokio::join!(
            self.engine.predict_pinned(&profile, &job, &embedding),
            self.engine.predict_pinned(&projected_profile, &job, &embedding)
        );

        let result = WhatIfResult::new(baseline, projected);
        info!(
            candidate_id,
            job_id,
            added = scenario.added_skills.len(),
            removed = scenario.removed_skills.len(),
            modified = scenario.modified_skills.len(),
            probability_delta = result.probability_delta,
            comparable = result.comparable,
            "What-if simulation"
        );
        result
    }

    fn both_failed(
        &self,
        job_id: &str,
        job: Option<&JobPosting>,
        error: &PredictionError,
    ) -> WhatIfResult {
        warn!(job_id, "What-if simulation not scored: {error}");
        let fallback = self.engine.fallback_for(job_id, job, error);
        WhatIfResult::new(fallback.clone(), fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingProvider;
    use crate::models::candidate::Proficiency;
    use crate::models::prediction::FallbackReason;
    use crate::prediction::engine::EngineConfig;
    use crate::prediction::strength::LogisticStrengthModel;
    use crate::models::candidate::UserLevel;
    use crate::store::InMemoryStore;
    use crate::testing::{ml_job, skill, student_profile, CountingEmbeddingProvider};
    use crate::time_source::{FakeSystemTimeSource, SystemTimeSource, SystemTimeSourceDefault};
    use chrono::{TimeZone, Utc};

    async fn simulator_with(
        profile: CandidateProfile,
        job: JobPosting,
        clock: Arc<dyn SystemTimeSource>,
    ) -> (WhatIfSimulator, Arc<CountingEmbeddingProvider>) {
        let store = Arc::new(InMemoryStore::new());
        store.upsert_candidate(profile).await;
        store.upsert_job(job).await;

        let provider = Arc::new(CountingEmbeddingProvider::new(256));
        let dyn_provider: Arc<dyn EmbeddingProvider> = provider.clone();
        let engine = PredictionEngine::new(
            store.clone(),
            store,
            dyn_provider,
            Arc::new(LogisticStrengthModel::default()),
            EngineConfig::default(),
            clock,
        )
        .unwrap();
        (WhatIfSimulator::new(Arc::new(engine)), provider)
    }

    async fn simulator() -> (WhatIfSimulator, Arc<CountingEmbeddingProvider>) {
        simulator_with(
            student_profile("cand-1"),
            ml_job("job-ml"),
            Arc::new(SystemTimeSourceDefault),
        )
        .await
    }

    fn job_requiring(job_id: &str, required: &[String]) -> JobPosting {
        JobPosting {
            required_skills: required.to_vec(),
            full_description: format!(
                "Platform engineer wanted. Day to day you will work with {}.",
                required.join(", ")
            ),
            ..ml_job(job_id)
        }
    }

    #[test]
    fn test_scenario_applies_in_order() {
        let profile = student_profile("cand-1");
        let scenario = WhatIfScenario {
            job_id: None,
            added_skills: vec![skill("Docker"), skill("python")],
            removed_skills: vec!["SQL".to_string()],
            modified_skills: vec![
                CandidateSkill::new("TensorFlow", Proficiency::Advanced),
                CandidateSkill::new("AWS", Proficiency::Beginner),
            ],
        };

        let projected = scenario.apply(&profile);
        let names: Vec<&str> = projected.skills.iter().map(|s| s.name.as_str()).collect();

        assert!(!names.contains(&"SQL"));
        assert!(names.contains(&"Docker"));
        assert!(names.contains(&"AWS"));
        // "python" duplicates "Python" and is ignored
        assert_eq!(names.iter().filter(|n| n.eq_ignore_ascii_case("python")).count(), 1);
        let tf = projected.skills.iter().find(|s| s.name == "TensorFlow").unwrap();
        assert_eq!(tf.proficiency, Proficiency::Advanced);
        assert_eq!(projected.resume_text, profile.resume_text);
    }

    #[test]
    fn test_added_skill_defaults_to_intermediate() {
        let scenario: WhatIfScenario =
            serde_json::from_str(r#"{"added_skills": [{"name": "Docker"}]}"#).unwrap();
        assert_eq!(scenario.added_skills[0].proficiency, Proficiency::Intermediate);
    }

    #[tokio::test]
    async fn test_empty_scenario_has_zero_deltas() {
        let (sim, _) = simulator().await;
        let result = sim
            .simulate("cand-1", "job-ml", &WhatIfScenario::default())
            .await;

        assert!(result.comparable);
        assert_eq!(result.probability_delta, 0.0);
        assert_eq!(result.job_match_delta, 0.0);
        assert_eq!(
            result.baseline.shortlist_probability,
            result.projected.shortlist_probability
        );
    }

    #[tokio::test]
    async fn test_adding_missing_skills_never_lowers_match() {
        let (sim, _) = simulator().await;
        let scenario = WhatIfScenario {
            added_skills: vec![skill("Docker"), skill("AWS")],
            ..WhatIfScenario::default()
        };

        let result = sim.simulate("cand-1", "job-ml", &scenario).await;
        assert!(result.comparable);
        assert!(result.job_match_delta > 0.0);
        assert!(result.probability_delta >= 0.0);
        assert!(result.projected.missing_skills.is_empty());
        assert_eq!(
            result.baseline.job_description_hash,
            result.projected.job_description_hash
        );
    }

    #[tokio::test]
    async fn test_adding_required_skill_never_lowers_probability_across_job_sizes() {
        for required_count in [5usize, 10, 20, 30] {
            let required: Vec<String> =
                (0..required_count).map(|i| format!("tool-{i:02}")).collect();
            let job = job_requiring("job-sweep", &required);

            for held in 1..=3usize {
                for level in [UserLevel::Student, UserLevel::Fresher, UserLevel::Senior] {
                    let profile = CandidateProfile {
                        skills: required[..held]
                            .iter()
                            .map(|name| CandidateSkill::new(name.clone(), Proficiency::Expert))
                            .collect(),
                        resume_text: Some(job.full_description.clone()),
                        user_level: level,
                        ..student_profile("cand-sweep")
                    };
                    let (sim, _) = simulator_with(
                        profile,
                        job.clone(),
                        Arc::new(SystemTimeSourceDefault),
                    )
                    .await;

                    let scenario = WhatIfScenario {
                        added_skills: vec![skill(&required[held])],
                        ..WhatIfScenario::default()
                    };
                    let result = sim.simulate("cand-sweep", "job-sweep", &scenario).await;

                    assert!(result.comparable);
                    assert!(
                        result.probability_delta >= 0.0,
                        "required={required_count} held={held} {level:?}: {} -> {}",
                        result.baseline.shortlist_probability,
                        result.projected.shortlist_probability
                    );
                    assert!(result.candidate_strength_delta >= 0.0);
                    assert!(result.job_match_delta > 0.0);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_rejected_simulation_uses_engine_clock() {
        let fixed = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let (sim, _) = simulator_with(
            student_profile("cand-1"),
            ml_job("job-ml"),
            Arc::new(FakeSystemTimeSource::new_set(fixed)),
        )
        .await;

        let result = sim
            .simulate("cand-1", "job-missing", &WhatIfScenario::default())
            .await;
        assert_eq!(result.baseline.fallback_reason, Some(FallbackReason::InvalidInput));
        assert_eq!(result.baseline.job_id, "job-missing");
        assert_eq!(result.baseline.timestamp, fixed);
        assert_eq!(result.projected.timestamp, fixed);
    }

    #[tokio::test]
    async fn test_job_embedding_resolved_once() {
        let (sim, provider) = simulator().await;
        sim.simulate("cand-1", "job-ml", &WhatIfScenario::default())
            .await;
        // one job embedding plus one resume embedding per side
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_mismatched_scenario_job_is_invalid() {
        let (sim, provider) = simulator().await;
        let scenario = WhatIfScenario {
            job_id: Some("job-other".to_string()),
            ..WhatIfScenario::default()
        };

        let result = sim.simulate("cand-1", "job-ml", &scenario).await;
        assert!(!result.comparable);
        assert_eq!(result.baseline.fallback_reason, Some(FallbackReason::InvalidInput));
        assert_eq!(result.probability_delta, 0.0);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_provider_outage_is_not_comparable() {
        let (sim, provider) = simulator().await;
        provider.set_failing(true);

        let result = sim
            .simulate("cand-1", "job-ml", &WhatIfScenario::default())
            .await;
        assert!(!result.comparable);
        assert_eq!(
            result.projected.fallback_reason,
            Some(FallbackReason::EmbeddingUnavailable)
        );
    }
}
