use serde::{Deserialize, Serialize};

/// Career stage of the candidate. Drives the calibration benchmark.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserLevel {
    Student,
    #[default]
    Fresher,
    Junior,
    Mid,
    Senior,
}

impl UserLevel {
    /// Students and freshers are calibrated into the motivating entry-level band.
    pub fn is_entry_level(self) -> bool {
        matches!(self, UserLevel::Student | UserLevel::Fresher)
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "student" => Some(UserLevel::Student),
            "fresher" | "entry" | "graduate" => Some(UserLevel::Fresher),
            "junior" => Some(UserLevel::Junior),
            "mid" | "intermediate" => Some(UserLevel::Mid),
            "senior" | "lead" | "principal" => Some(UserLevel::Senior),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Proficiency {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
    Expert,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSkill {
    pub name: String,
    #[serde(default)]
    pub proficiency: Proficiency,
}

impl CandidateSkill {
    pub fn new(name: impl Into<String>, proficiency: Proficiency) -> Self {
        Self {
            name: name.into(),
            proficiency,
        }
    }
}

/// Resolved candidate profile as supplied by the candidate store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub candidate_id: String,
    #[serde(default)]
    pub skills: Vec<CandidateSkill>,
    #[serde(default)]
    pub resume_text: Option<String>,
    #[serde(default)]
    pub user_level: UserLevel,
    #[serde(default)]
    pub resume_quality_score: Option<f64>,
    #[serde(default)]
    pub experience_months: u32,
    #[serde(default)]
    pub projects_count: u32,
    #[serde(default)]
    pub education_degree: Option<String>,
    /// Grade point average on a 10-point scale, when the resume carries one.
    #[serde(default)]
    pub cgpa: Option<f64>,
}

impl CandidateProfile {
    pub fn resume_text(&self) -> &str {
        self.resume_text.as_deref().unwrap_or("")
    }

    /// Stored quality score, or a completeness estimate when the resume
    /// parser did not provide one. Four equally weighted components:
    /// skills (10 = full), education present, experience (120 months = full),
    /// projects (5 = full).
    pub fn effective_quality_score(&self) -> f64 {
        if let Some(score) = self.resume_quality_score {
            return score.clamp(0.0, 1.0);
        }

        let skills = (self.skills.len() as f64 / 10.0).min(1.0);
        let education = if self
            .education_degree
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty())
        {
            1.0
        } else {
            0.0
        };
        let experience = (self.experience_months as f64 / 120.0).min(1.0);
        let projects = (self.projects_count as f64 / 5.0).min(1.0);

        0.25 * (skills + education + experience + projects)
    }

    pub fn calibration_context(&self) -> CalibrationContext {
        CalibrationContext {
            user_level: self.user_level,
            resume_quality_score: self.effective_quality_score(),
            experience_months: self.experience_months,
            projects_count: self.projects_count,
            education_degree: self.education_degree.clone(),
            skills_count: self.skills.len(),
        }
    }
}

/// Per-request calibration inputs. Immutable for the lifetime of one prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationContext {
    pub user_level: UserLevel,
    pub resume_quality_score: f64,
    pub experience_months: u32,
    pub projects_count: u32,
    pub education_degree: Option<String>,
    pub skills_count: usize,
}
