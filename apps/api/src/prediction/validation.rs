use crate::errors::PredictionError;
use crate::models::prediction::PredictionRequest;

/// Shortest trimmed job description the engine will score.
pub const MIN_DESCRIPTION_CHARS: usize = 20;

/// Rejects requests the engine cannot score meaningfully. Runs before any
/// hashing, caching or upstream call.
pub fn validate_request(request: &PredictionRequest) -> Result<(), PredictionError> {
    let required = [
        ("job_id", &request.job_id),
        ("job_title", &request.job_title),
        ("candidate_id", &request.candidate_id),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(PredictionError::Validation(format!("{field} is required")));
        }
    }

    let description_len = request.full_job_description.trim().chars().count();
    if description_len < MIN_DESCRIPTION_CHARS {
        return Err(PredictionError::Validation(format!(
            "full_job_description must be at least {MIN_DESCRIPTION_CHARS} characters (got {description_len})"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> PredictionRequest {
        PredictionRequest {
            job_id: "job-1".to_string(),
            job_title: "Backend Engineer".to_string(),
            full_job_description: "Build and operate Rust services on Kubernetes.".to_string(),
            candidate_id: "cand-1".to_string(),
            resume_text: None,
        }
    }

    #[test]
    fn test_valid_request_passes() {
        assert!(validate_request(&request()).is_ok());
    }

    #[test]
    fn test_blank_ids_rejected() {
        let mut r = request();
        r.job_id = "   ".to_string();
        assert!(matches!(
            validate_request(&r),
            Err(PredictionError::Validation(msg)) if msg.contains("job_id")
        ));

        let mut r = request();
        r.candidate_id = String::new();
        assert!(validate_request(&r).is_err());

        let mut r = request();
        r.job_title = String::new();
        assert!(validate_request(&r).is_err());
    }

    #[test]
    fn test_short_description_rejected_after_trim() {
        let mut r = request();
        r.full_job_description = format!("   {}   ", "x".repeat(19));
        assert!(validate_request(&r).is_err());

        r.full_job_description = "x".repeat(20);
        assert!(validate_request(&r).is_ok());
    }

    #[test]
    fn test_missing_resume_is_allowed() {
        let mut r = request();
        r.resume_text = None;
        assert!(validate_request(&r).is_ok());
    }
}
