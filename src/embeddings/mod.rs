//! Embedding generation behind a pluggable provider capability.
//!
//! The pipeline only ever talks to [`EmbeddingProvider`], so backends can be
//! swapped without touching ingestion or retrieval: the HTTP-backed
//! [`OpenAiEmbeddings`] for production, the deterministic
//! [`HashedEmbeddings`] for hermetic tests and offline demos, or anything
//! else a deployment injects.
//!
//! A provider embeds a whole batch with one backend round trip. One call per
//! chunk would multiply network latency by the chunk count; batching keeps
//! ingestion of a multi-sentence fragment at a single suspension point.

mod hashed;
mod openai;

pub use hashed::HashedEmbeddings;
pub use openai::{EmbeddingConfig, OpenAiEmbeddings};

use async_trait::async_trait;

use crate::types::VaultError;

/// Capability interface for embedding backends.
///
/// Implementations must return exactly one vector per input text, in input
/// order, each of [`dimension`](Self::dimension) length. An empty batch is
/// an error: the caller filtered its chunks already, so an empty batch
/// indicates a bug upstream, not a no-op.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds every text in `texts` with a single backend round trip.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, VaultError>;

    /// Dimension of every vector this provider produces.
    fn dimension(&self) -> usize;
}

/// Validates that a backend response matches the batch it was asked for.
fn ensure_batch_shape(
    input_count: usize,
    vectors: &[Vec<f32>],
    dimension: usize,
) -> Result<(), VaultError> {
    if vectors.len() != input_count {
        return Err(VaultError::EmbeddingBackend(format!(
            "backend returned {} vectors for {} inputs",
            vectors.len(),
            input_count
        )));
    }
    for vector in vectors {
        if vector.len() != dimension {
            return Err(VaultError::EmbeddingBackend(format!(
                "backend returned a {}-dimensional vector, expected {}",
                vector.len(),
                dimension
            )));
        }
    }
    Ok(())
}

fn reject_empty_batch(texts: &[String]) -> Result<(), VaultError> {
    if texts.is_empty() {
        return Err(VaultError::EmbeddingBackend(
            "cannot embed an empty batch".to_string(),
        ));
    }
    Ok(())
}
