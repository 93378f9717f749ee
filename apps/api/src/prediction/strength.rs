//! Candidate strength: pluggable, trait-based model that scores a profile's
//! general strength on 0–1, independent of any particular job.
//!
//! Default: `LogisticStrengthModel`, a linear model over normalized profile
//! features. Coefficients come from an offline-trained export (JSON) or the
//! built-in defaults. The engine holds an `Arc<dyn CandidateStrengthModel>`,
//! so a tree ensemble or a remote model can be swapped in at startup.

use std::path::Path;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::PredictionError;
use crate::models::candidate::{CandidateProfile, Proficiency, UserLevel};

// ────────────────────────────────────────────────────────────────────────────
// Output data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureContribution {
    pub feature: String,
    pub value: f64,
    pub impact: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrengthScore {
    /// 0.0 – 1.0
    pub probability: f64,
    /// Distance from the decision boundary, 0.0 – 1.0.
    pub confidence: f64,
    pub contributions: Vec<FeatureContribution>,
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait CandidateStrengthModel: Send + Sync {
    /// Uses only the candidate profile. Never sees the job.
    async fn score(&self, profile: &CandidateProfile) -> Result<StrengthScore, PredictionError>;

    fn name(&self) -> &str;

    fn feature_names(&self) -> Vec<String>;
}

// ────────────────────────────────────────────────────────────────────────────
// Feature extraction
// ────────────────────────────────────────────────────────────────────────────

/// Every feature a model export may reference. All are normalized to 0–1.
pub const SUPPORTED_FEATURES: &[&str] = &[
    "skills_count",
    "advanced_skills",
    "experience",
    "projects",
    "has_degree",
    "cgpa",
    "resume_quality",
    "has_resume_text",
    "resume_length",
    "career_stage",
];

/// Features that never decrease when a skill is added to the profile. A model
/// must weight them non-negatively, otherwise learning a skill could lower
/// the candidate's strength.
const SKILL_MONOTONE_FEATURES: &[&str] = &["skills_count", "advanced_skills", "resume_quality"];

fn feature_value(name: &str, profile: &CandidateProfile) -> Option<f64> {
    let value = match name {
        "skills_count" => (profile.skills.len() as f64 / 20.0).min(1.0),
        "advanced_skills" => {
            let advanced = profile
                .skills
                .iter()
                .filter(|s| matches!(s.proficiency, Proficiency::Advanced | Proficiency::Expert))
                .count();
            (advanced as f64 / 10.0).min(1.0)
        }
        "experience" => (profile.experience_months as f64 / 120.0).min(1.0),
        "projects" => (profile.projects_count as f64 / 10.0).min(1.0),
        "has_degree" => {
            let present = profile
                .education_degree
                .as_deref()
                .is_some_and(|d| !d.trim().is_empty());
            if present {
                1.0
            } else {
                0.0
            }
        }
        "cgpa" => profile.cgpa.map(|g| (g / 10.0).clamp(0.0, 1.0)).unwrap_or(0.0),
        "resume_quality" => profile.effective_quality_score(),
        "has_resume_text" => {
            if profile.resume_text().trim().is_empty() {
                0.0
            } else {
                1.0
            }
        }
        "resume_length" => (profile.resume_text().trim().chars().count() as f64 / 4000.0).min(1.0),
        "career_stage" => match profile.user_level {
            UserLevel::Student => 0.0,
            UserLevel::Fresher => 0.25,
            UserLevel::Junior => 0.5,
            UserLevel::Mid => 0.75,
            UserLevel::Senior => 1.0,
        },
        _ => return None,
    };
    Some(value)
}

// ────────────────────────────────────────────────────────────────────────────
// LogisticStrengthModel (default implementation)
// ────────────────────────────────────────────────────────────────────────────

/// On-disk shape of an exported linear model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModelExport {
    #[serde(default = "default_model_name")]
    pub model_name: String,
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

fn default_model_name() -> String {
    "logistic-export".to_string()
}

/// `p = sigmoid(intercept + Σ coefᵢ · featureᵢ)`; contribution of a feature is `coefᵢ · featureᵢ`.
#[derive(Debug, Clone)]
pub struct LogisticStrengthModel {
    name: String,
    features: Vec<(String, f64)>,
    intercept: f64,
}

impl Default for LogisticStrengthModel {
    fn default() -> Self {
        let features = [
            ("skills_count", 1.2),
            ("advanced_skills", 0.8),
            ("experience", 1.0),
            ("projects", 1.0),
            ("has_degree", 0.4),
            ("cgpa", 0.6),
            ("resume_quality", 1.2),
            ("has_resume_text", 0.3),
            ("resume_length", 0.4),
            ("career_stage", 0.8),
        ]
        .into_iter()
        .map(|(name, coef)| (name.to_string(), coef))
        .collect();

        Self {
            name: "logistic-default".to_string(),
            features,
            intercept: -2.0,
        }
    }
}

impl LogisticStrengthModel {
    pub fn from_export(export: LogisticModelExport) -> Result<Self> {
        if export.feature_names.is_empty() {
            bail!("model export has no features");
        }
        if export.feature_names.len() != export.coefficients.len() {
            bail!(
                "model export has {} feature names but {} coefficients",
                export.feature_names.len(),
                export.coefficients.len()
            );
        }
        if let Some(unknown) = export
            .feature_names
            .iter()
            .find(|f| !SUPPORTED_FEATURES.contains(&f.as_str()))
        {
            bail!("model export references unknown feature '{unknown}'");
        }
        if !export.intercept.is_finite() || export.coefficients.iter().any(|c| !c.is_finite()) {
            bail!("model export contains non-finite coefficients");
        }
        if let Some((feature, coef)) = export
            .feature_names
            .iter()
            .zip(&export.coefficients)
            .find(|(f, c)| SKILL_MONOTONE_FEATURES.contains(&f.as_str()) && **c < 0.0)
        {
            bail!("model export weights skill feature '{feature}' negatively ({coef})");
        }

        Ok(Self {
            name: export.model_name,
            features: export
                .feature_names
                .into_iter()
                .zip(export.coefficients)
                .collect(),
            intercept: export.intercept,
        })
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read strength model export {}", path.display()))?;
        let export: LogisticModelExport = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid strength model export {}", path.display()))?;
        Self::from_export(export)
    }

    fn evaluate(&self, profile: &CandidateProfile) -> Result<StrengthScore, PredictionError> {
        let mut logit = self.intercept;
        let mut contributions = Vec::with_capacity(self.features.len());

        for (feature, coef) in &self.features {
            let value = feature_value(feature, profile).ok_or_else(|| {
                PredictionError::Model(format!("unsupported feature '{feature}'"))
            })?;
            let impact = coef * value;
            logit += impact;
            contributions.push(FeatureContribution {
                feature: feature.clone(),
                value,
                impact,
            });
        }

        let probability = 1.0 / (1.0 + (-logit).exp());
        if !probability.is_finite() {
            return Err(PredictionError::Model(format!(
                "non-finite output for candidate {}",
                profile.candidate_id
            )));
        }

        contributions.sort_by(|a, b| b.impact.abs().total_cmp(&a.impact.abs()));

        Ok(StrengthScore {
            probability,
            confidence: ((probability - 0.5).abs() * 2.0).min(1.0),
            contributions,
        })
    }
}

#[async_trait]
impl CandidateStrengthModel for LogisticStrengthModel {
    async fn score(&self, profile: &CandidateProfile) -> Result<StrengthScore, PredictionError> {
        self.evaluate(profile)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn feature_names(&self) -> Vec<String> {
        self.features.iter().map(|(f, _)| f.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::candidate::CandidateSkill;
    use crate::testing::student_profile;

    #[tokio::test]
    async fn test_default_model_scores_within_unit_interval() {
        let model = LogisticStrengthModel::default();
        let score = model.score(&student_profile("cand-1")).await.unwrap();

        assert!(score.probability > 0.0 && score.probability < 1.0);
        assert!((0.0..=1.0).contains(&score.confidence));
        assert_eq!(score.contributions.len(), SUPPORTED_FEATURES.len());
    }

    #[tokio::test]
    async fn test_stronger_profile_scores_higher() {
        let model = LogisticStrengthModel::default();
        let base = student_profile("cand-1");
        let mut stronger = base.clone();
        stronger.experience_months = 48;
        stronger.projects_count = 8;
        stronger
            .skills
            .push(CandidateSkill::new("Docker", Proficiency::Advanced));

        let a = model.score(&base).await.unwrap();
        let b = model.score(&stronger).await.unwrap();
        assert!(b.probability > a.probability);
    }

    #[tokio::test]
    async fn test_contributions_sorted_by_magnitude() {
        let model = LogisticStrengthModel::default();
        let score = model.score(&student_profile("cand-1")).await.unwrap();
        let impacts: Vec<f64> = score.contributions.iter().map(|c| c.impact.abs()).collect();
        assert!(impacts.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_export_with_mismatched_lengths_rejected() {
        let export = LogisticModelExport {
            model_name: "rf-export".to_string(),
            feature_names: vec!["skills_count".to_string(), "projects".to_string()],
            coefficients: vec![1.0],
            intercept: 0.0,
        };
        assert!(LogisticStrengthModel::from_export(export).is_err());
    }

    #[test]
    fn test_export_with_unknown_feature_rejected() {
        let export = LogisticModelExport {
            model_name: "rf-export".to_string(),
            feature_names: vec!["github_stars".to_string()],
            coefficients: vec![1.0],
            intercept: 0.0,
        };
        let err = LogisticStrengthModel::from_export(export).unwrap_err();
        assert!(err.to_string().contains("github_stars"));
    }

    #[tokio::test]
    async fn test_export_round_trips_through_json() {
        let json = r#"{
            "model_name": "exported-v3",
            "feature_names": ["projects", "resume_quality"],
            "coefficients": [2.0, 1.0],
            "intercept": -1.0
        }"#;
        let export: LogisticModelExport = serde_json::from_str(json).unwrap();
        let model = LogisticStrengthModel::from_export(export).unwrap();

        assert_eq!(model.name(), "exported-v3");
        assert_eq!(model.feature_names(), vec!["projects", "resume_quality"]);

        // projects 3/10 = 0.3, quality 0.7 → logit = -1 + 0.6 + 0.7 = 0.3
        let score = model.score(&student_profile("cand-1")).await.unwrap();
        let expected = 1.0 / (1.0 + (-0.3f64).exp());
        assert!((score.probability - expected).abs() < 1e-9);
    }

    #[test]
    fn test_export_with_negative_skill_weight_rejected() {
        let export = LogisticModelExport {
            model_name: "rf-export".to_string(),
            feature_names: vec!["projects".to_string(), "advanced_skills".to_string()],
            coefficients: vec![1.0, -0.5],
            intercept: 0.0,
        };
        let err = LogisticStrengthModel::from_export(export).unwrap_err();
        assert!(err.to_string().contains("advanced_skills"));
    }

    #[tokio::test]
    async fn test_adding_any_skill_never_lowers_strength() {
        let model = LogisticStrengthModel::default();
        for held in 1..=12 {
            let mut base = student_profile("cand-1");
            base.resume_quality_score = None;
            base.skills = (0..held)
                .map(|i| CandidateSkill::new(format!("held-{i}"), Proficiency::Expert))
                .collect();
            let before = model.score(&base).await.unwrap().probability;

            for proficiency in [
                Proficiency::Beginner,
                Proficiency::Intermediate,
                Proficiency::Advanced,
                Proficiency::Expert,
            ] {
                let mut grown = base.clone();
                grown.skills.push(CandidateSkill::new("added", proficiency));
                let after = model.score(&grown).await.unwrap().probability;
                assert!(
                    after >= before,
                    "held={held} {proficiency:?}: strength {before} -> {after}"
                );
            }
        }
    }

    #[test]
    fn test_missing_export_file_is_error() {
        assert!(LogisticStrengthModel::from_json_file(Path::new("/nonexistent/model.json")).is_err());
    }
}
