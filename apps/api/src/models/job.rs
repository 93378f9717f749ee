use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A job posting as supplied by the job corpus store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPosting {
    pub job_id: String,
    pub title: String,
    #[serde(default)]
    pub company: Option<String>,
    pub full_description: String,
    /// Explicit requirement list. When empty, requirements are extracted
    /// from `full_description`.
    #[serde(default)]
    pub required_skills: Vec<String>,
    pub posted_at: DateTime<Utc>,
    #[serde(default)]
    pub applicants: Option<u32>,
}
