//! SQLite-backed vector index.
//!
//! Vectors are stored as little-endian `f32` blobs and scored by cosine
//! similarity in process. A `meta` table remembers which embedding model
//! built the index so that vectors from different models are never mixed.

use crate::embeddings::EmbeddingConfig;
use crate::types::NoteId;
use crate::vector_index::{OwnerFilter, VectorIndex, VectorMatch, VectorMetadata, VectorQuery, VectorRecord};
use async_trait::async_trait;
use recall_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};

const EMBEDDING_META_KEY: &str = "embedding";

/// Embedding identity recorded in the `meta` table.
#[derive(Debug, Serialize, Deserialize)]
struct IndexedEmbedding {
    provider: String,
    model: String,
    dimensions: usize,
}

impl From<&EmbeddingConfig> for IndexedEmbedding {
    fn from(config: &EmbeddingConfig) -> Self {
        Self {
            provider: config.provider.clone(),
            model: config.model.clone(),
            dimensions: config.dimensions,
        }
    }
}

pub struct SqliteVectorIndex {
    conn: Arc<Mutex<Connection>>,
    dimensions: usize,
}

impl SqliteVectorIndex {
    /// Open (or create) the index at `db_path`.
    ///
    /// Fails when the index was built with a different embedding provider,
    /// model or dimension count.
    pub fn open(db_path: &Path, embedding: &EmbeddingConfig) -> AppResult<Self> {
        Self::init(open_connection(db_path)?, embedding, false)
    }

    /// Open the index at `db_path`, discarding every stored vector first.
    /// Used when rebuilding after an embedding model change.
    pub fn open_rebuild(db_path: &Path, embedding: &EmbeddingConfig) -> AppResult<Self> {
        Self::init(open_connection(db_path)?, embedding, true)
    }

    pub fn open_in_memory(embedding: &EmbeddingConfig) -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Index(format!("Failed to open in-memory index: {}", e)))?;
        Self::init(conn, embedding, false)
    }

    fn init(conn: Connection, embedding: &EmbeddingConfig, reset: bool) -> AppResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS vectors (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                embedding BLOB NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_vectors_owner ON vectors(owner_id);

            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| AppError::Index(format!("Failed to create tables: {}", e)))?;

        if reset {
            conn.execute_batch("DELETE FROM vectors; DELETE FROM meta;")
                .map_err(|e| AppError::Index(format!("Failed to reset index: {}", e)))?;
            tracing::info!("Reset vector index");
        }

        check_embedding(&conn, embedding)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            dimensions: embedding.dimensions,
        })
    }

    /// Run `op` on the blocking pool so callers can time out a slow scan.
    async fn with_conn<T, F>(&self, op: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> AppResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| AppError::Index("Vector index lock poisoned".to_string()))?;
            op(&guard)
        })
        .await
        .map_err(|e| AppError::Index(format!("Vector index task failed: {}", e)))?
    }

    fn ensure_dimensions(&self, vector: &[f32]) -> AppResult<()> {
        if vector.len() != self.dimensions {
            return Err(AppError::Index(format!(
                "Vector has {} dimensions, index expects {}",
                vector.len(),
                self.dimensions
            )));
        }
        Ok(())
    }
}

fn open_connection(db_path: &Path) -> AppResult<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::Index(format!("Failed to create index directory: {}", e)))?;
    }

    let conn = Connection::open(db_path)
        .map_err(|e| AppError::Index(format!("Failed to open SQLite index: {}", e)))?;
    tracing::debug!("Opened vector index at {:?}", db_path);
    Ok(conn)
}

/// Record the embedding identity on first use; afterwards require a match.
fn check_embedding(conn: &Connection, embedding: &EmbeddingConfig) -> AppResult<()> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = ?1",
            params![EMBEDDING_META_KEY],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| AppError::Index(format!("Failed to read index metadata: {}", e)))?;

    match stored {
        Some(json) => {
            let indexed: IndexedEmbedding = serde_json::from_str(&json)?;
            let indexed = EmbeddingConfig {
                provider: indexed.provider,
                model: indexed.model,
                dimensions: indexed.dimensions,
                ..EmbeddingConfig::default()
            };
            indexed.validate_consistency(embedding).map_err(|e| match e {
                AppError::Index(msg) => AppError::Index(format!(
                    "{}. The index was built with a different embedding model; run `recall resync --rebuild`",
                    msg
                )),
                other => other,
            })
        }
        None => {
            let json = serde_json::to_string(&IndexedEmbedding::from(embedding))?;
            conn.execute(
                "INSERT INTO meta (key, value) VALUES (?1, ?2)",
                params![EMBEDDING_META_KEY, json],
            )
            .map_err(|e| AppError::Index(format!("Failed to write index metadata: {}", e)))?;
            Ok(())
        }
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    async fn upsert(&self, record: VectorRecord) -> AppResult<()> {
        self.ensure_dimensions(&record.values)?;
        let bytes = embedding_to_bytes(&record.values);

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO vectors (id, owner_id, embedding) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET owner_id = excluded.owner_id, embedding = excluded.embedding",
                params![record.id.as_str(), record.metadata.owner_id.as_str(), bytes],
            )
            .map_err(|e| AppError::Index(format!("Failed to upsert vector {}: {}", record.id, e)))?;

            tracing::debug!(id = %record.id, "Upserted vector");
            Ok(())
        })
        .await
    }

    async fn delete(&self, id: &NoteId) -> AppResult<()> {
        let id = id.clone();
        self.with_conn(move |conn| {
            let removed = conn
                .execute("DELETE FROM vectors WHERE id = ?1", params![id.as_str()])
                .map_err(|e| AppError::Index(format!("Failed to delete vector {}: {}", id, e)))?;

            tracing::debug!(id = %id, removed, "Deleted vector");
            Ok(())
        })
        .await
    }

    async fn query(&self, query: &VectorQuery) -> AppResult<Vec<VectorMatch>> {
        self.ensure_dimensions(&query.vector)?;
        if query.top_k == 0 {
            return Ok(Vec::new());
        }

        let query = query.clone();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare("SELECT id, embedding FROM vectors WHERE owner_id = ?1 ORDER BY rowid")
                .map_err(|e| AppError::Index(format!("Failed to prepare query: {}", e)))?;
            let rows: Vec<(String, Vec<u8>)> = stmt
                .query_map(params![query.filter.owner_id.as_str()], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })
                .map_err(|e| AppError::Index(format!("Failed to query vectors: {}", e)))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| AppError::Index(format!("Failed to read vector row: {}", e)))?;

            let mut scored = Vec::with_capacity(rows.len());
            for (id, bytes) in rows {
                let values = bytes_to_embedding(&bytes)?;
                let score = cosine_similarity(&query.vector, &values);
                scored.push((id, values, score));
            }

            // Stable: equal scores keep insertion order.
            scored.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));
            scored.truncate(query.top_k);

            tracing::debug!(
                owner = %query.filter.owner_id,
                matches = scored.len(),
                top_k = query.top_k,
                "Vector query complete"
            );

            Ok(scored
                .into_iter()
                .map(|(id, values, score)| VectorMatch {
                    id: NoteId::from(id),
                    score: Some(score),
                    metadata: query.include_metadata.then(|| VectorMetadata {
                        owner_id: query.filter.owner_id.clone(),
                    }),
                    values: query.include_values.then_some(values),
                })
                .collect())
        })
        .await
    }

    async fn ids(&self, filter: &OwnerFilter) -> AppResult<Vec<NoteId>> {
        let owner = filter.owner_id.clone();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare("SELECT id FROM vectors WHERE owner_id = ?1 ORDER BY rowid")
                .map_err(|e| AppError::Index(format!("Failed to prepare query: {}", e)))?;
            let ids = stmt
                .query_map(params![owner.as_str()], |row| row.get::<_, String>(0))
                .map_err(|e| AppError::Index(format!("Failed to list vectors: {}", e)))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| AppError::Index(format!("Failed to read vector row: {}", e)))?;
            Ok(ids.into_iter().map(NoteId::from).collect())
        })
        .await
    }

    async fn count(&self, filter: &OwnerFilter) -> AppResult<u64> {
        let owner = filter.owner_id.clone();
        self.with_conn(move |conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM vectors WHERE owner_id = ?1",
                    params![owner.as_str()],
                    |row| row.get(0),
                )
                .map_err(|e| AppError::Index(format!("Failed to count vectors: {}", e)))?;
            Ok(count as u64)
        })
        .await
    }
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Index("Invalid embedding bytes length".to_string()));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Calculate cosine similarity between two vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
