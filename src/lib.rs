//! # ragvault
//!
//! Durable retrieval core for RAG knowledge bases: free-text fragments go
//! in, semantically relevant chunks come back out. The crate owns the
//! pipeline between those two calls — deterministic sentence chunking,
//! batched embedding generation behind a pluggable provider, a two-table
//! SQLite layer with explicit cascade deletes, and a swappable in-memory
//! similarity searcher (navigable small-world graph or exact scan).
//!
//! ```text
//! ingest(text) ──► chunking ──► embeddings ──┐
//!                                            │
//!                     ┌──────────────────────┴─────────────┐
//!                     │ VectorIndex                        │
//!                     │   resources + embeddings (SQLite)  │
//!                     │   NSW graph / exact scan (memory)  │
//!                     └──────────────────────┬─────────────┘
//!                                            │
//! retrieve(query, k) ◄── top-k cosine search ┘
//! ```
//!
//! Conversation handling, prompt construction, and HTTP routing live in
//! the surrounding application; this crate is the part that must not lose
//! data or return stale references. Deleting a resource removes every one
//! of its embedding records in one transaction, a failed ingest removes
//! the resource it created, and search results are deterministic down to
//! the tie-break.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use ragvault::{HashedEmbeddings, KnowledgeVault};
//!
//! # async fn run() -> Result<(), ragvault::VaultError> {
//! let vault = KnowledgeVault::builder()
//!     .database_path("knowledge.sqlite")
//!     .with_embedding_provider(Arc::new(HashedEmbeddings::new()))
//!     .build()
//!     .await?;
//!
//! vault.ingest("Rust has no garbage collector.").await?;
//! for hit in vault.retrieve("memory management", 3).await? {
//!     println!("{:.3}  {}", hit.score, hit.content);
//! }
//! # Ok(())
//! # }
//! ```

pub mod chunking;
pub mod embeddings;
pub mod index;
pub mod ingestion;
pub mod retrieval;
pub mod stores;
pub mod types;
pub mod vault;

pub use embeddings::{EmbeddingConfig, EmbeddingProvider, HashedEmbeddings, OpenAiEmbeddings};
pub use index::{NswConfig, NswIndex, SearcherKind, VectorSearcher};
pub use retrieval::RetrievalHit;
pub use stores::{EmbeddingRecord, NewEmbedding, Resource, SqliteKnowledgeStore};
pub use types::VaultError;
pub use vault::{KnowledgeVault, KnowledgeVaultBuilder, VectorIndex};
