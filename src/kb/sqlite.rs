//! SQLite-backed chunk index.
//!
//! Stores chunk text + metadata in SQLite, with serialized embeddings
//! for brute-force cosine similarity search. In-process and durable; no
//! external server required.
//!
//! The index is bound to one embedding model: the model id and vector
//! dimension are recorded in a meta table when the database is created,
//! and opening it with a different model is a configuration error;
//! vectors from different models must never be compared.
//!
//! Writers are serialized through the connection pool and WAL journal
//! within this process; multi-process writers are out of scope.

use std::path::PathBuf;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{ChunkSearchResult, StoredChunk, VectorStore};
use crate::core::errors::ApiError;

#[derive(Debug)]
pub struct SqliteVectorStore {
    pool: SqlitePool,
    #[allow(dead_code)]
    db_path: PathBuf,
}

impl SqliteVectorStore {
    /// Open (or create) the index at `db_path`, bound to the given
    /// embedding model.
    pub async fn open(
        db_path: PathBuf,
        embedding_model: &str,
        dimension: usize,
    ) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let store = Self { pool, db_path };
        store.init_schema().await?;
        store.check_model(embedding_model, dimension).await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS kb_chunks (
                chunk_id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                source TEXT NOT NULL DEFAULT '',
                metadata TEXT DEFAULT '{}',
                embedding BLOB,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_kb_source ON kb_chunks(source)")
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS kb_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    /// Record the embedding model on first open; reject a mismatch after.
    async fn check_model(&self, embedding_model: &str, dimension: usize) -> Result<(), ApiError> {
        let stored: Option<String> =
            sqlx::query_scalar("SELECT value FROM kb_meta WHERE key = 'embedding_model'")
                .fetch_optional(&self.pool)
                .await
                .map_err(ApiError::internal)?;

        match stored {
            None => {
                sqlx::query(
                    "INSERT INTO kb_meta (key, value) VALUES
                     ('embedding_model', ?1), ('embedding_dimension', ?2)",
                )
                .bind(embedding_model)
                .bind(dimension.to_string())
                .execute(&self.pool)
                .await
                .map_err(ApiError::internal)?;
                Ok(())
            }
            Some(existing) if existing == embedding_model => Ok(()),
            Some(existing) => Err(ApiError::Configuration(format!(
                "index was built with embedding model '{existing}' but '{embedding_model}' is \
                 configured; delete the index file to re-ingest with the new model"
            ))),
        }
    }

    /// Serialize embedding to bytes (little-endian f32).
    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    /// Compute cosine similarity between two vectors.
    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        let denom = norm_a * norm_b;

        if denom <= f32::EPSILON {
            0.0
        } else {
            dot / denom
        }
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn insert_batch(&self, items: Vec<(StoredChunk, Vec<f32>)>) -> Result<(), ApiError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        for (chunk, embedding) in &items {
            let blob = Self::serialize_embedding(embedding);
            let metadata_str = chunk
                .metadata
                .as_ref()
                .map(|m| serde_json::to_string(m).unwrap_or_default())
                .unwrap_or_else(|| "{}".to_string());

            sqlx::query(
                "INSERT OR REPLACE INTO kb_chunks (chunk_id, content, source, metadata, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(&chunk.chunk_id)
            .bind(&chunk.content)
            .bind(&chunk.source)
            .bind(&metadata_str)
            .bind(&blob)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;
        }

        tx.commit().await.map_err(ApiError::internal)?;
        tracing::debug!("Inserted {} chunks into the index", items.len());
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, ApiError> {
        let rows = sqlx::query(
            "SELECT chunk_id, content, source, metadata, embedding FROM kb_chunks",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        // Score each chunk via cosine similarity
        let mut scored: Vec<ChunkSearchResult> = rows
            .iter()
            .filter_map(|row| {
                let embedding_bytes: Vec<u8> = row.get("embedding");
                if embedding_bytes.is_empty() {
                    return None;
                }
                let stored_emb = Self::deserialize_embedding(&embedding_bytes);
                let score = Self::cosine_similarity(query_embedding, &stored_emb);

                let metadata_str: String = row.get("metadata");
                let metadata = serde_json::from_str(&metadata_str).ok();

                Some(ChunkSearchResult {
                    chunk: StoredChunk {
                        chunk_id: row.get("chunk_id"),
                        content: row.get("content"),
                        source: row.get("source"),
                        metadata,
                    },
                    score,
                })
            })
            .collect();

        // Sort by score descending and take top-k
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);

        Ok(scored)
    }

    async fn delete_source(&self, source: &str) -> Result<usize, ApiError> {
        let result = sqlx::query("DELETE FROM kb_chunks WHERE source = ?1")
            .bind(source)
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(result.rows_affected() as usize)
    }

    async fn count(&self) -> Result<usize, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM kb_chunks")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> SqliteVectorStore {
        let tmp = std::env::temp_dir().join(format!(
            "askdocs-kb-test-{}.db",
            uuid::Uuid::new_v4()
        ));
        SqliteVectorStore::open(tmp, "all-minilm-l6-v2", 3)
            .await
            .unwrap()
    }

    fn chunk(id: &str, content: &str, source: &str) -> StoredChunk {
        StoredChunk {
            chunk_id: id.to_string(),
            content: content.to_string(),
            source: source.to_string(),
            metadata: None,
        }
    }

    #[tokio::test]
    async fn insert_and_search() {
        let store = test_store().await;

        store
            .insert_batch(vec![(chunk("c1", "Hello world", "test.txt"), vec![1.0, 0.0, 0.0])])
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 1);

        let results = store.search(&[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.chunk_id, "c1");
        assert_eq!(results[0].chunk.source, "test.txt");
        assert!(results[0].score > 0.99);
    }

    #[tokio::test]
    async fn search_orders_best_match_first() {
        let store = test_store().await;

        store
            .insert_batch(vec![
                (chunk("far", "unrelated", "a.txt"), vec![0.0, 1.0, 0.0]),
                (chunk("near", "on topic", "b.txt"), vec![0.9, 0.1, 0.0]),
                (chunk("mid", "somewhat", "c.txt"), vec![0.5, 0.5, 0.0]),
            ])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.chunk_id, "near");
        assert_eq!(results[1].chunk.chunk_id, "mid");
    }

    #[tokio::test]
    async fn empty_index_returns_no_results() {
        let store = test_store().await;
        let results = store.search(&[1.0, 0.0, 0.0], 4).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn delete_source_removes_only_that_source() {
        let store = test_store().await;

        store
            .insert_batch(vec![
                (chunk("c1", "one", "keep.txt"), vec![1.0, 0.0, 0.0]),
                (chunk("c2", "two", "drop.txt"), vec![0.0, 1.0, 0.0]),
                (chunk("c3", "three", "drop.txt"), vec![0.0, 0.0, 1.0]),
            ])
            .await
            .unwrap();

        let deleted = store.delete_source("drop.txt").await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.count().await.unwrap(), 1);

        let deleted_again = store.delete_source("drop.txt").await.unwrap();
        assert_eq!(deleted_again, 0);
    }

    #[tokio::test]
    async fn reopening_with_a_different_model_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("kb.db");

        let store = SqliteVectorStore::open(db_path.clone(), "all-minilm-l6-v2", 3)
            .await
            .unwrap();
        drop(store);

        let err = SqliteVectorStore::open(db_path, "bge-small-en-v1.5", 3)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Configuration(_)));
    }

    #[tokio::test]
    async fn reopening_with_the_same_model_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("kb.db");

        {
            let store = SqliteVectorStore::open(db_path.clone(), "all-minilm-l6-v2", 3)
                .await
                .unwrap();
            store
                .insert_batch(vec![(chunk("c1", "persisted", "a.txt"), vec![1.0, 0.0, 0.0])])
                .await
                .unwrap();
        }

        let reopened = SqliteVectorStore::open(db_path, "all-minilm-l6-v2", 3)
            .await
            .unwrap();
        assert_eq!(reopened.count().await.unwrap(), 1);
    }
}
