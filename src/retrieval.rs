//! Read path: embed the query, search the index.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::embeddings::EmbeddingProvider;
use crate::types::VaultError;
use crate::vault::VectorIndex;

/// One retrieval result: the chunk text and its cosine similarity to the
/// query, in `[-1.0, 1.0]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetrievalHit {
    pub content: String,
    pub score: f32,
}

/// Embeds queries and runs top-k similarity search. Read-only: never
/// mutates either store.
pub struct RetrievalService {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl RetrievalService {
    /// Creates a service over the given index and embedding provider.
    pub fn new(index: Arc<VectorIndex>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { index, embedder }
    }

    /// Returns up to `k` chunks most similar to `query`, ordered by
    /// descending score with ties broken toward the earlier-ingested chunk.
    ///
    /// The query is embedded as a single-item batch; an empty corpus yields
    /// an empty result, not an error.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievalHit>, VaultError> {
        if k == 0 {
            return Err(VaultError::Validation(
                "k must be a positive integer".to_string(),
            ));
        }
        if query.trim().is_empty() {
            return Err(VaultError::Validation("query must not be empty".to_string()));
        }

        let batch = [query.to_string()];
        let mut vectors = self.embedder.embed_batch(&batch).await?;
        let vector = vectors.pop().ok_or_else(|| {
            VaultError::EmbeddingBackend("backend returned no vector for the query".to_string())
        })?;

        let hits = self.index.search(&vector, k)?;
        debug!(k, results = hits.len(), "retrieval complete");
        Ok(hits
            .into_iter()
            .map(|(record, score)| RetrievalHit {
                content: record.content,
                score,
            })
            .collect())
    }
}
