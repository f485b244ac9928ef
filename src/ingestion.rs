//! Write path: validate, chunk, persist, embed, persist embeddings.
//!
//! The pipeline owns the consistency protocol between the two stores. A
//! resource is persisted before its embedding records, and if embedding
//! generation or the embedding insert ultimately fails, the just-created
//! resource is deleted through the same cascade path the public delete
//! uses — a resource that can never be retrieved is worse than a clean
//! failure. Embedding-backend failures are retried a bounded number of
//! times first, since they are usually transient.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::chunking::chunk_text;
use crate::embeddings::EmbeddingProvider;
use crate::stores::{NewEmbedding, Resource};
use crate::types::VaultError;
use crate::vault::VectorIndex;

/// Default number of embedding attempts per ingest (first try + retries).
const DEFAULT_EMBED_ATTEMPTS: u32 = 2;

/// Orchestrates one logical, partially-recoverable ingest operation.
pub struct IngestionPipeline {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    embed_attempts: u32,
}

impl IngestionPipeline {
    /// Creates a pipeline over the given index and embedding provider.
    pub fn new(index: Arc<VectorIndex>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            index,
            embedder,
            embed_attempts: DEFAULT_EMBED_ATTEMPTS,
        }
    }

    /// Sets how many times the embedding batch is attempted before the
    /// pipeline gives up and compensates. Clamped to at least one.
    #[must_use]
    pub fn with_embed_attempts(mut self, attempts: u32) -> Self {
        self.embed_attempts = attempts.max(1);
        self
    }

    /// Ingests one knowledge fragment.
    ///
    /// On success the returned [`Resource`] is durably stored and every
    /// chunk of it is searchable. On failure nothing of this ingest
    /// remains: input that fails validation is rejected before any write,
    /// and a resource whose embeddings could not be produced is removed
    /// again before the error is surfaced.
    pub async fn ingest(&self, content: &str) -> Result<Resource, VaultError> {
        if content.trim().is_empty() {
            return Err(VaultError::Validation(
                "content must not be empty".to_string(),
            ));
        }
        let chunks = chunk_text(content);
        if chunks.is_empty() {
            return Err(VaultError::Validation(
                "content contains no indexable sentences".to_string(),
            ));
        }

        let resource = self.index.insert_resource(content).await?;
        debug!(
            resource_id = %resource.id,
            chunks = chunks.len(),
            "resource persisted, embedding chunks"
        );

        match self.embed_and_store(&resource, &chunks).await {
            Ok(stored) => {
                debug!(resource_id = %resource.id, embeddings = stored, "ingest complete");
                Ok(resource)
            }
            Err(err) => {
                warn!(
                    resource_id = %resource.id,
                    error = %err,
                    "embedding failed, removing the just-created resource"
                );
                if let Err(delete_err) = self.index.delete_resource(&resource.id).await {
                    // The orphan sweep at next open covers this window.
                    warn!(
                        resource_id = %resource.id,
                        error = %delete_err,
                        "compensating delete failed"
                    );
                }
                Err(err)
            }
        }
    }

    async fn embed_and_store(
        &self,
        resource: &Resource,
        chunks: &[String],
    ) -> Result<usize, VaultError> {
        let vectors = self.embed_with_retry(chunks).await?;
        let batch: Vec<NewEmbedding> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| NewEmbedding {
                resource_id: resource.id.clone(),
                content: chunk.clone(),
                vector,
            })
            .collect();
        let records = self.index.insert_many(batch).await?;
        Ok(records.len())
    }

    async fn embed_with_retry(&self, chunks: &[String]) -> Result<Vec<Vec<f32>>, VaultError> {
        let mut last_err: Option<VaultError> = None;
        for attempt in 1..=self.embed_attempts {
            match self.embedder.embed_batch(chunks).await {
                Ok(vectors) => return Ok(vectors),
                Err(err @ VaultError::EmbeddingBackend(_)) => {
                    warn!(attempt, error = %err, "embedding batch failed");
                    last_err = Some(err);
                }
                // Anything else is not transient; retrying cannot help.
                Err(err) => return Err(err),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            VaultError::EmbeddingBackend("embedding failed before any attempt".to_string())
        }))
    }
}
