//! Text embedding: the leaf dependency behind job and resume similarity.
//!
//! `AppState` carries an `Arc<dyn EmbeddingProvider>`; the backend is chosen at
//! startup: `HttpEmbeddingProvider` when `EMBEDDING_API_URL` is set, otherwise the
//! deterministic `HashingEmbeddingProvider`.

use async_trait::async_trait;
use thiserror::Error;

pub mod cache;
pub mod hashing;
pub mod http;

pub use cache::JobEmbeddingCache;
pub use hashing::HashingEmbeddingProvider;
pub use http::HttpEmbeddingProvider;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Embedding API returned no vectors")]
    Empty,

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },

    #[error("Cannot embed empty text")]
    EmptyInput,

    #[error("Gave up after {retries} retries")]
    RetriesExhausted { retries: u32 },
}

/// Turns free text into a fixed-length vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;
}

/// Cosine similarity in [-1, 1]. Zero vectors and length mismatches score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

/// Scales `vec` to unit length in place. Zero vectors are left untouched.
pub fn normalize(vec: &mut [f32]) {
    let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vec.iter_mut() {
            *x /= norm;
        }
    }
}
