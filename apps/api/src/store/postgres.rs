use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{CandidateStore, JobStore, PredictionHistory, StoreError};
use crate::models::candidate::{CandidateProfile, CandidateSkill, UserLevel};
use crate::models::job::JobPosting;
use crate::models::prediction::ShortlistPrediction;

/// Postgres-backed collaborator store. Read-only for candidates and jobs;
/// append-only for prediction history. Schema ownership lives elsewhere.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct CandidateProfileRow {
    pub candidate_id: String,
    pub skills: Value,
    pub resume_text: Option<String>,
    pub user_level: String,
    pub resume_quality_score: Option<f64>,
    pub experience_months: i32,
    pub projects_count: i32,
    pub education_degree: Option<String>,
    pub cgpa: Option<f64>,
}

impl TryFrom<CandidateProfileRow> for CandidateProfile {
    type Error = StoreError;

    fn try_from(row: CandidateProfileRow) -> Result<Self, Self::Error> {
        let malformed = |reason: String| StoreError::Malformed {
            entity: "candidate",
            id: row.candidate_id.clone(),
            reason,
        };

        let skills: Vec<CandidateSkill> = serde_json::from_value(row.skills.clone())
            .map_err(|e| malformed(format!("skills: {e}")))?;
        let user_level = UserLevel::parse(&row.user_level)
            .ok_or_else(|| malformed(format!("unknown user_level '{}'", row.user_level)))?;

        Ok(CandidateProfile {
            candidate_id: row.candidate_id.clone(),
            skills,
            resume_text: row.resume_text,
            user_level,
            resume_quality_score: row.resume_quality_score,
            experience_months: row.experience_months.max(0) as u32,
            projects_count: row.projects_count.max(0) as u32,
            education_degree: row.education_degree,
            cgpa: row.cgpa,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    pub job_id: String,
    pub title: String,
    pub company: Option<String>,
    pub full_description: String,
    pub required_skills: Vec<String>,
    pub posted_at: DateTime<Utc>,
    pub applicants: Option<i32>,
}

impl From<JobRow> for JobPosting {
    fn from(row: JobRow) -> Self {
        JobPosting {
            job_id: row.job_id,
            title: row.title,
            company: row.company,
            full_description: row.full_description,
            required_skills: row.required_skills,
            posted_at: row.posted_at,
            applicants: row.applicants.map(|a| a.max(0) as u32),
        }
    }
}

const JOB_COLUMNS: &str = r#"
    id AS job_id, title, company,
    COALESCE(full_description, '') AS full_description,
    COALESCE(required_skills, '{}') AS required_skills,
    posted_at, applicants
"#;

#[async_trait]
impl CandidateStore for PgStore {
    async fn get_candidate(
        &self,
        candidate_id: &str,
    ) -> Result<Option<CandidateProfile>, StoreError> {
        let row: Option<CandidateProfileRow> = sqlx::query_as(
            r#"
            SELECT candidate_id, skills, resume_text, user_level, resume_quality_score,
                   experience_months, projects_count, education_degree, cgpa
            FROM candidate_profiles
            WHERE candidate_id = $1
            "#,
        )
        .bind(candidate_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CandidateProfile::try_from).transpose()
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn get_job(&self, job_id: &str) -> Result<Option<JobPosting>, StoreError> {
        let row: Option<JobRow> =
            sqlx::query_as(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1"))
                .bind(job_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(JobPosting::from))
    }

    async fn list_active_jobs(&self) -> Result<Vec<JobPosting>, StoreError> {
        let rows: Vec<JobRow> = sqlx::query_as(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE is_active = TRUE ORDER BY posted_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(JobPosting::from).collect())
    }
}

#[async_trait]
impl PredictionHistory for PgStore {
    async fn record(
        &self,
        candidate_id: &str,
        prediction: &ShortlistPrediction,
    ) -> Result<(), StoreError> {
        let payload = serde_json::to_value(prediction).map_err(|e| StoreError::Malformed {
            entity: "prediction",
            id: prediction.job_id.clone(),
            reason: e.to_string(),
        })?;

        // Append-only: one row per served prediction
        sqlx::query(
            r#"
            INSERT INTO shortlist_predictions
                (id, candidate_id, job_id, shortlist_probability, candidate_strength,
                 job_match_score, job_description_hash, status, confidence, payload, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(candidate_id)
        .bind(&prediction.job_id)
        .bind(prediction.shortlist_probability)
        .bind(prediction.candidate_strength)
        .bind(prediction.job_match_score)
        .bind(&prediction.job_description_hash)
        .bind(payload["status"].as_str().unwrap_or("fallback"))
        .bind(payload["confidence"].as_str().unwrap_or("low"))
        .bind(&payload)
        .bind(prediction.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
