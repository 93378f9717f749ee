//! Job match scoring: measures a candidate's skills and resume against one job.
//!
//! Two signals, blended:
//! - lexical: alias-normalized intersection of candidate skills with the job's
//!   required skills. Beginner-level skills count half and are reported as weak.
//! - semantic: cosine similarity between the resume embedding and the job
//!   embedding, clamped to 0–1.
//!
//! The lexical weight depends on how specific the job's skill list is.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::embedding::{cosine_similarity, EmbeddingProvider};
use crate::errors::PredictionError;
use crate::models::candidate::{CandidateSkill, Proficiency};
use crate::prediction::skills::normalize_skill;

// ────────────────────────────────────────────────────────────────────────────
// Output data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMatch {
    /// 0.0 – 1.0
    pub score: f64,
    pub matched: Vec<String>,
    pub missing: Vec<String>,
    pub weak: Vec<String>,
    pub lexical_score: f64,
    pub semantic_score: f64,
}

/// Lexical share of the blend. The semantic share is `1 - lexical`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchWeights {
    /// Used when the job lists at least `specific_min_required` skills.
    pub specific_lexical: f64,
    /// Used when the job lists fewer, but at least one.
    pub sparse_lexical: f64,
    pub specific_min_required: usize,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            specific_lexical: 0.70,
            sparse_lexical: 0.35,
            specific_min_required: 3,
        }
    }
}

impl MatchWeights {
    pub fn lexical_weight(&self, required_count: usize) -> f64 {
        if required_count == 0 {
            0.0
        } else if required_count >= self.specific_min_required {
            self.specific_lexical
        } else {
            self.sparse_lexical
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scorer
// ────────────────────────────────────────────────────────────────────────────

pub struct JobMatchScorer {
    provider: Arc<dyn EmbeddingProvider>,
    weights: MatchWeights,
}

impl JobMatchScorer {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, weights: MatchWeights) -> Self {
        Self { provider, weights }
    }

    pub async fn score(
        &self,
        candidate_skills: &[CandidateSkill],
        resume_text: &str,
        job_embedding: &[f32],
        job_required_skills: &[String],
    ) -> Result<JobMatch, PredictionError> {
        let lexical = lexical_match(candidate_skills, job_required_skills);
        let semantic_score = self
            .semantic_score(candidate_skills, resume_text, job_embedding)
            .await?;

        let weight = self.weights.lexical_weight(lexical.required_count);
        let score = (weight * lexical.score + (1.0 - weight) * semantic_score).clamp(0.0, 1.0);

        Ok(JobMatch {
            score,
            matched: lexical.matched,
            missing: lexical.missing,
            weak: lexical.weak,
            lexical_score: lexical.score,
            semantic_score,
        })
    }

    async fn semantic_score(
        &self,
        candidate_skills: &[CandidateSkill],
        resume_text: &str,
        job_embedding: &[f32],
    ) -> Result<f64, PredictionError> {
        let text = if resume_text.trim().is_empty() {
            candidate_skills
                .iter()
                .map(|s| s.name.trim())
                .filter(|n| !n.is_empty())
                .collect::<Vec<_>>()
                .join(", ")
        } else {
            resume_text.trim().to_string()
        };

        if text.is_empty() {
            return Ok(0.0);
        }

        let candidate_embedding = self.provider.embed(&text).await?;
        Ok(cosine_similarity(&candidate_embedding, job_embedding).clamp(0.0, 1.0))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Core lexical algorithm
// ────────────────────────────────────────────────────────────────────────────

struct LexicalMatch {
    score: f64,
    required_count: usize,
    matched: Vec<String>,
    missing: Vec<String>,
    weak: Vec<String>,
}

/// `(matched + 0.5 * weak) / required`. Skill names are reported as the job spells them.
fn lexical_match(candidate_skills: &[CandidateSkill], required: &[String]) -> LexicalMatch {
    // Strongest proficiency wins when a candidate lists the same skill twice
    let mut held: HashMap<String, Proficiency> = HashMap::new();
    for skill in candidate_skills {
        let key = normalize_skill(&skill.name);
        if key.is_empty() {
            continue;
        }
        held.entry(key)
            .and_modify(|p| {
                if *p == Proficiency::Beginner {
                    *p = skill.proficiency;
                }
            })
            .or_insert(skill.proficiency);
    }

    let mut seen = Vec::new();
    let mut matched = Vec::new();
    let mut missing = Vec::new();
    let mut weak = Vec::new();

    for name in required {
        let key = normalize_skill(name);
        if key.is_empty() || seen.contains(&key) {
            continue;
        }
        seen.push(key.clone());

        match held.get(&key) {
            Some(Proficiency::Beginner) => weak.push(name.trim().to_string()),
            Some(_) => matched.push(name.trim().to_string()),
            None => missing.push(name.trim().to_string()),
        }
    }

    let required_count = seen.len();
    let score = if required_count == 0 {
        0.0
    } else {
        (matched.len() as f64 + 0.5 * weak.len() as f64) / required_count as f64
    };

    LexicalMatch {
        score,
        required_count,
        matched,
        missing,
        weak,
    }
}
