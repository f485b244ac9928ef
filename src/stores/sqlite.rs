//! SQLite persistence for resources and embedding records.

use std::path::Path;

use chrono::{DateTime, Utc};
use tokio_rusqlite::rusqlite;
use tokio_rusqlite::{Connection, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

use super::{EmbeddingRecord, NewEmbedding, Resource};
use crate::types::VaultError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS resources (
    id         TEXT PRIMARY KEY,
    content    TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS embeddings (
    id          TEXT PRIMARY KEY,
    resource_id TEXT NOT NULL,
    content     TEXT NOT NULL,
    vector      BLOB NOT NULL
);
CREATE INDEX IF NOT EXISTS embeddings_resource_idx ON embeddings (resource_id);
";

/// Durable two-table store over one SQLite connection.
///
/// The store owns the deployment's vector dimension `D`: every write is
/// validated against it before a transaction starts, and every read decodes
/// against it, so a vector of any other length can neither enter nor leave.
#[derive(Clone)]
pub struct SqliteKnowledgeStore {
    conn: Connection,
    dimension: usize,
}

impl SqliteKnowledgeStore {
    /// Opens (creating if needed) a store at `path`.
    pub async fn open(path: impl AsRef<Path>, dimension: usize) -> Result<Self, VaultError> {
        let conn = Connection::open(path)
            .await
            .map_err(|err| VaultError::Storage(err.to_string()))?;
        Self::init(conn, dimension).await
    }

    /// Opens a private in-memory store; useful for tests and demos.
    pub async fn in_memory(dimension: usize) -> Result<Self, VaultError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|err| VaultError::Storage(err.to_string()))?;
        Self::init(conn, dimension).await
    }

    async fn init(conn: Connection, dimension: usize) -> Result<Self, VaultError> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)
        })
        .await
        .map_err(|err| VaultError::Storage(err.to_string()))?;
        Ok(Self { conn, dimension })
    }

    /// The vector dimension this store was opened with.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Inserts a resource record, assigning its id and timestamp. The
    /// single-statement insert is atomic: the row is durably visible in
    /// full or not at all.
    pub async fn insert_resource(&self, content: &str) -> Result<Resource, VaultError> {
        let resource = Resource {
            id: Uuid::new_v4().to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        };
        let row = resource.clone();
        self.conn
            .call(move |conn| -> rusqlite::Result<()> {
                let created_at = row.created_at.to_rfc3339();
                conn.execute(
                    "INSERT INTO resources (id, content, created_at) VALUES (?1, ?2, ?3)",
                    (&row.id, &row.content, &created_at),
                )
                ?;
                Ok(())
            })
            .await
            .map_err(|err| VaultError::Storage(err.to_string()))?;
        debug!(resource_id = %resource.id, "inserted resource");
        Ok(resource)
    }

    /// Fetches a resource by id.
    pub async fn get_resource(&self, id: &str) -> Result<Option<Resource>, VaultError> {
        let target = id.to_string();
        let row = self
            .conn
            .call(move |conn| {
                conn.query_row(
                    "SELECT id, content, created_at FROM resources WHERE id = ?1",
                    [&target],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                        ))
                    },
                )
                .optional()            })
            .await
            .map_err(|err| VaultError::Storage(err.to_string()))?;

        row.map(|(id, content, created_at)| {
            let created_at = DateTime::parse_from_rfc3339(&created_at)
                .map_err(|err| VaultError::Storage(format!("corrupt created_at: {err}")))?
                .with_timezone(&Utc);
            Ok(Resource {
                id,
                content,
                created_at,
            })
        })
        .transpose()
    }

    /// Bulk-inserts embedding records in one transaction, all-or-nothing.
    ///
    /// Every vector is checked against the store dimension before the
    /// transaction starts; a single mismatch rejects the whole batch with
    /// [`VaultError::SchemaViolation`] and writes nothing.
    pub async fn insert_embeddings(
        &self,
        batch: Vec<NewEmbedding>,
    ) -> Result<Vec<EmbeddingRecord>, VaultError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        for item in &batch {
            if item.vector.len() != self.dimension {
                return Err(VaultError::SchemaViolation {
                    expected: self.dimension,
                    actual: item.vector.len(),
                });
            }
        }

        let records: Vec<EmbeddingRecord> = batch
            .into_iter()
            .map(|item| EmbeddingRecord {
                id: Uuid::new_v4().to_string(),
                resource_id: item.resource_id,
                content: item.content,
                vector: item.vector,
            })
            .collect();

        let rows = records.clone();
        self.conn
            .call(move |conn| -> rusqlite::Result<()> {
                let tx = conn
                    .transaction()
                    ?;
                {
                    let mut stmt = tx
                        .prepare(
                            "INSERT INTO embeddings (id, resource_id, content, vector) \
                             VALUES (?1, ?2, ?3, ?4)",
                        )
                        ?;
                    for record in &rows {
                        let blob = encode_vector(&record.vector);
                        stmt.execute((&record.id, &record.resource_id, &record.content, &blob))
                            ?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(|err| VaultError::Storage(err.to_string()))?;

        debug!(count = records.len(), "inserted embedding batch");
        Ok(records)
    }

    /// Deletes a resource and every embedding record referencing it, as one
    /// transaction. No observer can see the resource gone while its records
    /// remain, or the reverse.
    ///
    /// Returns the number of embedding rows removed, or
    /// [`VaultError::NotFound`] (with the transaction rolled back) when the
    /// resource does not exist.
    pub async fn delete_resource(&self, id: &str) -> Result<usize, VaultError> {
        let target = id.to_string();
        let removed = self
            .conn
            .call(move |conn| -> rusqlite::Result<Option<usize>> {
                let tx = conn
                    .transaction()
                    ?;
                let embeddings_removed = tx
                    .execute("DELETE FROM embeddings WHERE resource_id = ?1", [&target])
                    ?;
                let resources_removed = tx
                    .execute("DELETE FROM resources WHERE id = ?1", [&target])
                    ?;
                if resources_removed == 0 {
                    // Dropping the transaction rolls back the embedding delete.
                    return Ok(None);
                }
                tx.commit()?;
                Ok(Some(embeddings_removed))
            })
            .await
            .map_err(|err| VaultError::Storage(err.to_string()))?;

        match removed {
            Some(count) => {
                debug!(resource_id = %id, embeddings = count, "deleted resource with cascade");
                Ok(count)
            }
            None => Err(VaultError::NotFound(id.to_string())),
        }
    }

    /// Loads every embedding record in insertion (rowid) order, for
    /// rebuilding the in-memory searcher at open.
    pub async fn load_embeddings(&self) -> Result<Vec<EmbeddingRecord>, VaultError> {
        let rows = self
            .conn
            .call(|conn| -> rusqlite::Result<Vec<(String, String, String, Vec<u8>)>> {
                let mut stmt = conn
                    .prepare(
                        "SELECT id, resource_id, content, vector FROM embeddings ORDER BY rowid",
                    )
                    ?;
                let mapped = stmt
                    .query_map([], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, Vec<u8>>(3)?,
                        ))
                    })
                    ?;
                let mut rows = Vec::new();
                for row in mapped {
                    rows.push(row?);
                }
                Ok(rows)
            })
            .await
            .map_err(|err| VaultError::Storage(err.to_string()))?;

        rows.into_iter()
            .map(|(id, resource_id, content, blob)| {
                let vector = decode_vector(&blob, self.dimension)?;
                Ok(EmbeddingRecord {
                    id,
                    resource_id,
                    content,
                    vector,
                })
            })
            .collect()
    }

    /// Deletes resources that have no embedding rows.
    ///
    /// A crash or cancellation between the resource insert and the
    /// embedding insert leaves exactly this state behind; sweeping at open
    /// restores the no-orphan invariant.
    pub async fn sweep_orphan_resources(&self) -> Result<usize, VaultError> {
        self.conn
            .call(|conn| {
                conn.execute(
                    "DELETE FROM resources WHERE id NOT IN \
                     (SELECT DISTINCT resource_id FROM embeddings)",
                    [],
                )            })
            .await
            .map_err(|err| VaultError::Storage(err.to_string()))
    }

    /// Number of resource rows.
    pub async fn resource_count(&self) -> Result<usize, VaultError> {
        self.count("SELECT COUNT(*) FROM resources").await
    }

    /// Number of embedding rows.
    pub async fn embedding_count(&self) -> Result<usize, VaultError> {
        self.count("SELECT COUNT(*) FROM embeddings").await
    }

    async fn count(&self, sql: &'static str) -> Result<usize, VaultError> {
        self.conn
            .call(move |conn| -> rusqlite::Result<usize> {
                let count: i64 = conn
                    .query_row(sql, [], |row| row.get(0))
                    ?;
                Ok(count as usize)
            })
            .await
            .map_err(|err| VaultError::Storage(err.to_string()))
    }
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(std::mem::size_of_val(vector));
    for &value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

fn decode_vector(blob: &[u8], dimension: usize) -> Result<Vec<f32>, VaultError> {
    let expected = dimension * std::mem::size_of::<f32>();
    if blob.len() != expected {
        return Err(VaultError::Storage(format!(
            "corrupt embedding blob: expected {expected} bytes, got {}",
            blob.len()
        )));
    }
    Ok(blob
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
