//! Deterministic local embeddings via character-trigram feature hashing.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use super::EmbeddingProvider;
use crate::types::VaultError;

/// Local embedding provider with no network dependency.
///
/// Each text is lowercased and tokenized on whitespace; every character
/// trigram of every token (whole token when shorter than three characters)
/// is hashed into a fixed-size bucket histogram, which is then
/// L2-normalized. Texts sharing surface vocabulary land close together
/// under cosine similarity, which is enough for tests, demos, and
/// deployments that cannot reach a real model.
///
/// `FxHasher` is unseeded, so the same text maps to the same vector across
/// processes and runs — persisted vectors stay comparable with future
/// queries.
#[derive(Clone, Debug)]
pub struct HashedEmbeddings {
    dimension: usize,
}

impl HashedEmbeddings {
    /// Default bucket count; matches the default [`super::OpenAiEmbeddings`]
    /// dimension so the two providers are interchangeable per deployment.
    pub const DEFAULT_DIMENSION: usize = 1536;

    /// Creates a provider with [`Self::DEFAULT_DIMENSION`] buckets.
    pub fn new() -> Self {
        Self::with_dimension(Self::DEFAULT_DIMENSION)
    }

    /// Creates a provider with an explicit bucket count.
    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let lowered = text.to_lowercase();
        for token in lowered.split_whitespace() {
            let chars: Vec<char> = token.chars().collect();
            if chars.len() < 3 {
                let bucket = self.bucket_of(&chars);
                vector[bucket] += 1.0;
                continue;
            }
            for window in chars.windows(3) {
                let bucket = self.bucket_of(window);
                vector[bucket] += 1.0;
            }
        }

        let norm = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }

    fn bucket_of(&self, gram: &[char]) -> usize {
        let mut hasher = FxHasher::default();
        gram.hash(&mut hasher);
        (hasher.finish() as usize) % self.dimension
    }
}

impl Default for HashedEmbeddings {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for HashedEmbeddings {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, VaultError> {
        super::reject_empty_batch(texts)?;
        let vectors: Vec<Vec<f32>> = texts.iter().map(|text| self.embed_one(text)).collect();
        super::ensure_batch_shape(texts.len(), &vectors, self.dimension)?;
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
