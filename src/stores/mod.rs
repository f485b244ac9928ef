//! Durable records and the SQLite-backed store.
//!
//! Two logical tables back the whole system: `resources` holds parent
//! content records, `embeddings` holds one row per retrievable chunk with
//! its vector. Referential integrity between them is enforced by explicit
//! transactions in [`SqliteKnowledgeStore`] rather than a database-engine
//! foreign-key feature, so the cascade behaves identically on stores
//! without referential actions.

pub mod sqlite;

pub use sqlite::SqliteKnowledgeStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A parent content record. Immutable once created; destroyed only by an
/// explicit cascading delete.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Opaque unique identifier.
    pub id: String,
    /// The raw ingested text.
    pub content: String,
    /// Creation time (UTC).
    pub created_at: DateTime<Utc>,
}

/// One retrievable unit: a chunk of a resource plus its embedding vector.
///
/// Every record references exactly one existing [`Resource`]; the store's
/// cascade guarantees a record never outlives its parent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Opaque unique identifier, stable and independent of insertion order.
    pub id: String,
    /// The parent resource.
    pub resource_id: String,
    /// The chunk text; never empty.
    pub content: String,
    /// Fixed-dimension embedding vector.
    pub vector: Vec<f32>,
}

/// Insert payload for [`SqliteKnowledgeStore::insert_embeddings`]; record
/// ids are assigned by the store.
#[derive(Clone, Debug)]
pub struct NewEmbedding {
    pub resource_id: String,
    pub content: String,
    pub vector: Vec<f32>,
}
