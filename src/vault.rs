//! The vault: durable rows bound to an in-memory searcher, plus the public
//! facade the surrounding application calls.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::embeddings::{EmbeddingProvider, OpenAiEmbeddings};
use crate::index::{ExactIndex, NswConfig, NswIndex, SearcherKind, VectorSearcher};
use crate::ingestion::IngestionPipeline;
use crate::retrieval::{RetrievalHit, RetrievalService};
use crate::stores::{EmbeddingRecord, NewEmbedding, Resource, SqliteKnowledgeStore};
use crate::types::VaultError;

/// Durable vector index: SQLite rows plus an in-memory searcher mirror.
///
/// Every mutation writes SQLite first, then updates the mirror under a
/// write lock; searches run entirely under a read lock. A concurrent
/// reader therefore observes a resource's embeddings either fully present
/// or fully absent, never a partial set. At open, the mirror is rebuilt
/// from the rows in insertion order, which also restores the tie-break
/// ranking.
pub struct VectorIndex {
    store: SqliteKnowledgeStore,
    searcher: RwLock<Box<dyn VectorSearcher>>,
}

impl VectorIndex {
    /// Opens an index over `store`, sweeping orphaned resources and
    /// replaying stored embeddings into a fresh searcher.
    pub async fn open(
        store: SqliteKnowledgeStore,
        kind: SearcherKind,
        config: NswConfig,
    ) -> Result<Self, VaultError> {
        let swept = store.sweep_orphan_resources().await?;
        if swept > 0 {
            warn!(
                swept,
                "removed resources left without embeddings by an interrupted ingest"
            );
        }

        let mut searcher: Box<dyn VectorSearcher> = match kind {
            SearcherKind::Nsw => Box::new(NswIndex::new(config)),
            SearcherKind::Exact => Box::new(ExactIndex::new()),
        };
        let records = store.load_embeddings().await?;
        let count = records.len();
        for record in records {
            searcher.insert(record);
        }
        if count > 0 {
            info!(embeddings = count, "rebuilt vector searcher from store");
        }

        Ok(Self {
            store,
            searcher: RwLock::new(searcher),
        })
    }

    /// The underlying durable store.
    pub fn store(&self) -> &SqliteKnowledgeStore {
        &self.store
    }

    /// Inserts a parent resource record.
    pub async fn insert_resource(&self, content: &str) -> Result<Resource, VaultError> {
        self.store.insert_resource(content).await
    }

    /// Bulk-inserts embedding records: all-or-nothing in the store, then
    /// mirrored into the searcher. A dimension mismatch rejects the entire
    /// batch and leaves both untouched.
    pub async fn insert_many(
        &self,
        batch: Vec<NewEmbedding>,
    ) -> Result<Vec<EmbeddingRecord>, VaultError> {
        let records = self.store.insert_embeddings(batch).await?;
        let mut searcher = self.searcher.write();
        for record in &records {
            searcher.insert(record.clone());
        }
        Ok(records)
    }

    /// Cascading delete: the resource row and its embedding rows vanish in
    /// one store transaction, then the mirror is purged under the write
    /// lock. Returns the number of embedding records removed.
    pub async fn delete_resource(&self, resource_id: &str) -> Result<usize, VaultError> {
        let removed_rows = self.store.delete_resource(resource_id).await?;
        let removed_mirror = self.searcher.write().remove_resource(resource_id);
        debug!(
            resource_id,
            rows = removed_rows,
            mirrored = removed_mirror,
            "cascade delete complete"
        );
        Ok(removed_rows)
    }

    /// Top-k cosine similarity search over the mirror.
    ///
    /// An empty index yields an empty vec; a query vector of the wrong
    /// dimension is a [`VaultError::SchemaViolation`].
    pub fn search(
        &self,
        query_vector: &[f32],
        k: usize,
    ) -> Result<Vec<(EmbeddingRecord, f32)>, VaultError> {
        if query_vector.len() != self.store.dimension() {
            return Err(VaultError::SchemaViolation {
                expected: self.store.dimension(),
                actual: query_vector.len(),
            });
        }
        Ok(self.searcher.read().search(query_vector, k))
    }

    /// Number of records currently searchable.
    pub fn searchable_count(&self) -> usize {
        self.searcher.read().len()
    }
}

/// The knowledge base facade: the sole surface the surrounding application
/// calls, wiring the chunker, embedder, stores and searcher together.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use ragvault::{HashedEmbeddings, KnowledgeVault};
///
/// # async fn run() -> Result<(), ragvault::VaultError> {
/// let vault = KnowledgeVault::builder()
///     .with_embedding_provider(Arc::new(HashedEmbeddings::new()))
///     .build()
///     .await?;
///
/// vault.ingest("The sky is blue. Water boils at 100 degrees.").await?;
/// let hits = vault.retrieve("boiling point", 1).await?;
/// assert_eq!(hits.len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct KnowledgeVault {
    index: Arc<VectorIndex>,
    pipeline: IngestionPipeline,
    retrieval: RetrievalService,
}

impl KnowledgeVault {
    /// Starts building a vault.
    pub fn builder() -> KnowledgeVaultBuilder {
        KnowledgeVaultBuilder::default()
    }

    /// Ingests one knowledge fragment; see [`IngestionPipeline::ingest`].
    pub async fn ingest(&self, content: &str) -> Result<Resource, VaultError> {
        self.pipeline.ingest(content).await
    }

    /// Retrieves the `k` chunks most similar to `query`; see
    /// [`RetrievalService::retrieve`].
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievalHit>, VaultError> {
        self.retrieval.retrieve(query, k).await
    }

    /// Deletes a resource and all of its embedding records.
    pub async fn delete(&self, resource_id: &str) -> Result<usize, VaultError> {
        self.index.delete_resource(resource_id).await
    }

    /// Number of stored resources.
    pub async fn resource_count(&self) -> Result<usize, VaultError> {
        self.index.store().resource_count().await
    }

    /// Number of stored embedding records.
    pub async fn embedding_count(&self) -> Result<usize, VaultError> {
        self.index.store().embedding_count().await
    }

    /// The underlying vector index, for callers composing their own
    /// pipelines.
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }
}

/// Builder for [`KnowledgeVault`].
#[derive(Default)]
pub struct KnowledgeVaultBuilder {
    path: Option<PathBuf>,
    provider: Option<Arc<dyn EmbeddingProvider>>,
    searcher: SearcherKind,
    nsw_config: NswConfig,
    embed_attempts: Option<u32>,
}

impl KnowledgeVaultBuilder {
    /// Persists the vault to a SQLite database at `path`. Without this the
    /// vault lives in a private in-memory database.
    #[must_use]
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Injects the embedding backend. When omitted, `build` falls back to
    /// [`OpenAiEmbeddings::from_env`].
    #[must_use]
    pub fn with_embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Chooses the in-memory searcher implementation.
    #[must_use]
    pub fn searcher(mut self, kind: SearcherKind) -> Self {
        self.searcher = kind;
        self
    }

    /// Tunes the navigable small-world graph parameters.
    #[must_use]
    pub fn nsw_config(mut self, config: NswConfig) -> Self {
        self.nsw_config = config;
        self
    }

    /// Sets how many times an embedding batch is attempted per ingest.
    #[must_use]
    pub fn embed_attempts(mut self, attempts: u32) -> Self {
        self.embed_attempts = Some(attempts);
        self
    }

    /// Opens the store, rebuilds the searcher, and wires the pipeline and
    /// retrieval service.
    pub async fn build(self) -> Result<KnowledgeVault, VaultError> {
        let provider: Arc<dyn EmbeddingProvider> = match self.provider {
            Some(provider) => provider,
            None => Arc::new(OpenAiEmbeddings::from_env()?),
        };
        let dimension = provider.dimension();

        let store = match self.path {
            Some(path) => SqliteKnowledgeStore::open(path, dimension).await?,
            None => SqliteKnowledgeStore::in_memory(dimension).await?,
        };

        let index = Arc::new(VectorIndex::open(store, self.searcher, self.nsw_config).await?);

        let mut pipeline = IngestionPipeline::new(Arc::clone(&index), Arc::clone(&provider));
        if let Some(attempts) = self.embed_attempts {
            pipeline = pipeline.with_embed_attempts(attempts);
        }
        let retrieval = RetrievalService::new(Arc::clone(&index), provider);

        Ok(KnowledgeVault {
            index,
            pipeline,
            retrieval,
        })
    }
}
