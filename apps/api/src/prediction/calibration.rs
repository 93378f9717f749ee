//! Calibration: maps a raw `strength × match` product into a career-stage-aware
//! percentage, a confidence band and a plain-language explanation.
//!
//! Entry-level candidates (students, freshers) are compared against a lower
//! benchmark and, above it, stretched into the 40–90% band. Professionals keep
//! their raw value above benchmark. Below benchmark everyone lands in 20–40%.
//! Every constant lives in `CalibrationPolicy`, overridable from JSON.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::market::aggregator::{DemandTrend, MarketStat};
use crate::models::candidate::{CalibrationContext, UserLevel};
use crate::models::prediction::Confidence;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationPolicy {
    pub student_benchmark: f64,
    pub fresher_benchmark: f64,
    pub professional_benchmark: f64,

    pub entry_floor: f64,
    pub entry_span: f64,
    pub below_floor: f64,
    pub below_slope: f64,

    pub quality_bonus: f64,
    pub quality_min_score: f64,
    pub quality_min_skills: usize,
    pub quality_min_projects: u32,
    pub entry_cap: f64,
    pub professional_cap: f64,

    /// Percent thresholds.
    pub high_confidence_at: f64,
    pub medium_confidence_at: f64,
    pub strong_band_at: f64,
    pub moderate_band_at: f64,
}

impl Default for CalibrationPolicy {
    fn default() -> Self {
        Self {
            student_benchmark: 0.15,
            fresher_benchmark: 0.20,
            professional_benchmark: 0.25,
            entry_floor: 0.40,
            entry_span: 0.50,
            below_floor: 0.20,
            below_slope: 0.20,
            quality_bonus: 0.10,
            quality_min_score: 0.6,
            quality_min_skills: 5,
            quality_min_projects: 1,
            entry_cap: 0.85,
            professional_cap: 0.90,
            high_confidence_at: 65.0,
            medium_confidence_at: 40.0,
            strong_band_at: 70.0,
            moderate_band_at: 45.0,
        }
    }
}

impl CalibrationPolicy {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read calibration policy {}", path.display()))?;
        let policy: CalibrationPolicy = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid calibration policy {}", path.display()))?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("student_benchmark", self.student_benchmark),
            ("fresher_benchmark", self.fresher_benchmark),
            ("professional_benchmark", self.professional_benchmark),
        ] {
            if !(value > 0.0 && value < 1.0) {
                bail!("{name} must be in (0, 1), got {value}");
            }
        }
        if self.entry_cap > 1.0 || self.professional_cap > 1.0 {
            bail!("bonus caps must not exceed 1.0");
        }
        if self.medium_confidence_at > self.high_confidence_at {
            bail!("medium_confidence_at must not exceed high_confidence_at");
        }
        if self.moderate_band_at > self.strong_band_at {
            bail!("moderate_band_at must not exceed strong_band_at");
        }
        Ok(())
    }

    fn benchmark(&self, level: UserLevel) -> f64 {
        match level {
            UserLevel::Student => self.student_benchmark,
            UserLevel::Fresher => self.fresher_benchmark,
            UserLevel::Junior | UserLevel::Mid | UserLevel::Senior => self.professional_benchmark,
        }
    }
}

/// Skill lists the explanation draws its concrete names from.
#[derive(Debug, Clone, Copy)]
pub struct MatchEvidence<'a> {
    pub matched: &'a [String],
    pub missing: &'a [String],
    pub weak: &'a [String],
}

#[derive(Debug, Clone, PartialEq)]
pub struct Calibrated {
    /// Percent, 0–100, one decimal.
    pub probability: f64,
    pub confidence: Confidence,
    pub explanation: String,
}

#[derive(Debug, Clone, Default)]
pub struct CalibrationLayer {
    policy: CalibrationPolicy,
}

impl CalibrationLayer {
    pub fn new(policy: CalibrationPolicy) -> Self {
        Self { policy }
    }

    pub fn calibrate(
        &self,
        raw: f64,
        context: &CalibrationContext,
        evidence: MatchEvidence<'_>,
        market: Option<&MarketStat>,
    ) -> Calibrated {
        let fraction = self.calibrated_fraction(raw, context);
        let probability = (fraction * 1000.0).round() / 10.0;
        let confidence = Confidence::from_percentage(
            probability,
            self.policy.high_confidence_at,
            self.policy.medium_confidence_at,
        );
        let explanation = self.explain(probability, context, evidence, market);

        Calibrated {
            probability,
            confidence,
            explanation,
        }
    }

    /// Monotone non-decreasing in `raw` for a fixed context.
    fn calibrated_fraction(&self, raw: f64, context: &CalibrationContext) -> f64 {
        let p = &self.policy;
        let raw = if raw.is_finite() { raw.clamp(0.0, 1.0) } else { 0.0 };
        let benchmark = p.benchmark(context.user_level);
        let entry_level = context.user_level.is_entry_level();

        let base = if raw >= benchmark {
            if entry_level {
                p.entry_floor + ((raw - benchmark) / (1.0 - benchmark)) * p.entry_span
            } else {
                raw
            }
        } else {
            p.below_floor + raw * p.below_slope
        };

        let qualifies = context.resume_quality_score > p.quality_min_score
            && context.skills_count >= p.quality_min_skills
            && context.projects_count >= p.quality_min_projects;

        let adjusted = if qualifies {
            let cap = if entry_level {
                p.entry_cap
            } else {
                p.professional_cap
            };
            // The cap limits the bonus only; it never pulls a score down
            (base + p.quality_bonus).min(cap).max(base)
        } else {
            base
        };

        adjusted.clamp(0.0, 1.0)
    }

    fn explain(
        &self,
        probability: f64,
        context: &CalibrationContext,
        evidence: MatchEvidence<'_>,
        market: Option<&MarketStat>,
    ) -> String {
        let matched = name_list(evidence.matched, 3);
        let missing = name_list(evidence.missing, 3);
        let weak = name_list(evidence.weak, 2);

        let mut text = if probability >= self.policy.strong_band_at {
            let strengths = matched.unwrap_or_else(|| "your core skills".to_string());
            let deepen = weak
                .clone()
                .or_else(|| missing.clone())
                .map(|s| format!(" Deepen expertise in {s} to stand out further."))
                .unwrap_or_else(|| " Deepen expertise in your strongest areas to stand out further.".to_string());
            format!("Strong match: {strengths} line up well with this role.{deepen}")
        } else if probability >= self.policy.moderate_band_at {
            let focus = missing
                .clone()
                .or_else(|| weak.clone())
                .unwrap_or_else(|| "the listed requirements".to_string());
            let base = matched
                .map(|m| format!(" You already bring {m}."))
                .unwrap_or_default();
            format!("This role is achievable. Focus on {focus} to strengthen your application.{base}")
        } else {
            let path = missing
                .clone()
                .map(|m| format!("start with {m}"))
                .unwrap_or_else(|| "build projects around the role's core requirements".to_string());
            let building_on = matched
                .map(|m| format!(", building on {m}"))
                .unwrap_or_default();
            format!("Worth exploring. Here is a path: {path}{building_on}.")
        };

        if context.user_level.is_entry_level() {
            text.push_str(" This estimate is calibrated for early-career candidates.");
        }

        if let Some(stat) = market {
            text.push(' ');
            text.push_str(&market_sentence(stat));
        }

        text
    }
}

fn name_list(names: &[String], limit: usize) -> Option<String> {
    let names: Vec<&str> = names
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .take(limit)
        .collect();
    match names.as_slice() {
        [] => None,
        [one] => Some(one.to_string()),
        [init @ .., last] => Some(format!("{} and {last}", init.join(", "))),
    }
}

fn level_word(score: f64) -> &'static str {
    if score >= 0.66 {
        "high"
    } else if score >= 0.33 {
        "moderate"
    } else {
        "low"
    }
}

fn market_sentence(stat: &MarketStat) -> String {
    let trend = match stat.demand_trend {
        DemandTrend::Rising => "rising",
        DemandTrend::Stable => "steady",
        DemandTrend::Falling => "cooling",
    };
    format!(
        "Market context: demand for {} roles is {} and {trend} across {} active postings, with {} competition.",
        stat.role_category,
        level_word(stat.market_demand_score),
        stat.total_active_jobs,
        level_word(stat.competition_score),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(level: UserLevel) -> CalibrationContext {
        CalibrationContext {
            user_level: level,
            resume_quality_score: 0.5,
            experience_months: 0,
            projects_count: 0,
            education_degree: None,
            skills_count: 3,
        }
    }

    fn strong_context(level: UserLevel) -> CalibrationContext {
        CalibrationContext {
            resume_quality_score: 0.8,
            projects_count: 2,
            skills_count: 6,
            ..context(level)
        }
    }

    fn no_evidence() -> MatchEvidence<'static> {
        MatchEvidence {
            matched: &[],
            missing: &[],
            weak: &[],
        }
    }

    #[test]
    fn test_student_raw_030_is_medium() {
        let layer = CalibrationLayer::default();
        let out = layer.calibrate(0.30, &context(UserLevel::Student), no_evidence(), None);
        // 0.40 + (0.15 / 0.85) · 0.50 = 0.4882
        assert_eq!(out.probability, 48.8);
        assert_eq!(out.confidence, Confidence::Medium);
    }

    #[test]
    fn test_below_benchmark_band() {
        let layer = CalibrationLayer::default();
        let out = layer.calibrate(0.10, &context(UserLevel::Fresher), no_evidence(), None);
        // 0.20 + 0.10 · 0.20
        assert_eq!(out.probability, 22.0);
        assert_eq!(out.confidence, Confidence::Low);
    }

    #[test]
    fn test_professional_keeps_raw_above_benchmark() {
        let layer = CalibrationLayer::default();
        let out = layer.calibrate(0.72, &context(UserLevel::Mid), no_evidence(), None);
        assert_eq!(out.probability, 72.0);
        assert_eq!(out.confidence, Confidence::High);
    }

    #[test]
    fn test_quality_bonus_is_capped() {
        let layer = CalibrationLayer::default();
        let ctx = strong_context(UserLevel::Student);

        let mid = layer.calibrate(0.30, &ctx, no_evidence(), None);
        assert_eq!(mid.probability, 58.8);

        let top = layer.calibrate(0.99, &ctx, no_evidence(), None);
        // base 0.8941 already exceeds the 0.85 cap; the cap does not lower it
        assert_eq!(top.probability, 89.4);
    }

    #[test]
    fn test_monotone_in_raw_for_every_level() {
        let layer = CalibrationLayer::default();
        for level in [
            UserLevel::Student,
            UserLevel::Fresher,
            UserLevel::Junior,
            UserLevel::Mid,
            UserLevel::Senior,
        ] {
            for ctx in [context(level), strong_context(level)] {
                let mut previous = f64::MIN;
                for step in 0..=1000 {
                    let raw = step as f64 / 1000.0;
                    let p = layer.calibrate(raw, &ctx, no_evidence(), None).probability;
                    assert!(p >= previous, "{level:?} raw={raw}: {p} < {previous}");
                    assert!((0.0..=100.0).contains(&p));
                    previous = p;
                }
            }
        }
    }

    #[test]
    fn test_non_finite_raw_treated_as_zero() {
        let layer = CalibrationLayer::default();
        let out = layer.calibrate(f64::NAN, &context(UserLevel::Junior), no_evidence(), None);
        assert_eq!(out.probability, 20.0);
    }

    #[test]
    fn test_explanations_name_skills_by_band() {
        let layer = CalibrationLayer::default();
        let matched = vec!["Python".to_string(), "SQL".to_string()];
        let missing = vec!["Docker".to_string(), "AWS".to_string()];
        let weak = vec!["TensorFlow".to_string()];
        let evidence = MatchEvidence {
            matched: &matched,
            missing: &missing,
            weak: &weak,
        };

        let strong = layer.calibrate(0.85, &context(UserLevel::Senior), evidence, None);
        assert!(strong.explanation.contains("Python and SQL"));
        assert!(strong.explanation.contains("Deepen expertise in TensorFlow"));

        let moderate = layer.calibrate(0.30, &context(UserLevel::Student), evidence, None);
        assert!(moderate.explanation.contains("achievable"));
        assert!(moderate.explanation.contains("Focus on Docker and AWS"));

        let low = layer.calibrate(0.05, &context(UserLevel::Junior), evidence, None);
        assert!(low.explanation.contains("Worth exploring"));
        assert!(low.explanation.contains("start with Docker and AWS"));
    }

    #[test]
    fn test_market_context_appends_one_sentence() {
        let layer = CalibrationLayer::default();
        let stat = MarketStat {
            role_category: "Data Analyst".to_string(),
            total_active_jobs: 12,
            average_applicants_per_job: 50.0,
            demand_trend: DemandTrend::Rising,
            market_demand_score: 0.75,
            competition_score: 0.1,
            sample_companies: vec![],
        };

        let without = layer.calibrate(0.5, &context(UserLevel::Mid), no_evidence(), None);
        let with = layer.calibrate(0.5, &context(UserLevel::Mid), no_evidence(), Some(&stat));

        assert_eq!(without.probability, with.probability);
        assert!(with.explanation.starts_with(&without.explanation));
        assert!(with
            .explanation
            .contains("demand for Data Analyst roles is high and rising across 12 active postings, with low competition"));
    }

    #[test]
    fn test_policy_validation() {
        let mut policy = CalibrationPolicy::default();
        assert!(policy.validate().is_ok());
        policy.student_benchmark = 1.0;
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_policy_partial_json_uses_defaults() {
        let policy: CalibrationPolicy = serde_json::from_str(r#"{"entry_cap": 0.8}"#).unwrap();
        assert_eq!(policy.entry_cap, 0.8);
        assert_eq!(policy.student_benchmark, 0.15);
    }
}
