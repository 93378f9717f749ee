//! Deterministic feature-hashing embedder.
//!
//! Each token is hashed into one of `dimension` buckets; bucket weights use
//! sublinear term frequency and the vector is L2-normalized. The same text
//! always produces the same vector, so this backend doubles as the offline
//! default and the test backend.

use std::collections::HashMap;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{normalize, EmbeddingError, EmbeddingProvider};

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is", "it", "of", "on",
    "or", "our", "that", "the", "to", "we", "will", "with", "you", "your",
];

pub struct HashingEmbeddingProvider {
    dimension: usize,
}

impl HashingEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn embed_sync(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut counts: HashMap<String, u32> = HashMap::new();
        for token in tokenize(text) {
            *counts.entry(token).or_default() += 1;
        }
        if counts.is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let mut vec = vec![0.0_f32; self.dimension];
        for (token, count) in counts {
            let bucket = bucket_for(&token, self.dimension);
            vec[bucket] += 1.0 + (count as f32).ln();
        }

        normalize(&mut vec);
        Ok(vec)
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_sync(text)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "feature-hashing"
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
}

fn bucket_for(token: &str, dimension: usize) -> usize {
    let digest = Sha256::digest(token.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    (u64::from_le_bytes(bytes) % dimension as u64) as usize
}
