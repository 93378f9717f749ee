use sha2::{Digest, Sha256};

/// Hex SHA-256 of the trimmed text. Used as the job-description and resume
/// fingerprint in logs, cache entries and predictions.
pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.trim().as_bytes()))
}
