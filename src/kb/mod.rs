//! Knowledge base: document ingestion and semantic retrieval.
//!
//! This module provides:
//! - `KnowledgeBase`: chunks documents, embeds them, and stores them in
//!   a durable vector index
//! - `Context`: a retrieved chunk paired with its source label, the unit
//!   handed to the prompt builder

pub mod chunker;
pub mod sqlite;
pub mod store;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

pub use chunker::{chunk_text, ChunkConfig};
pub use sqlite::SqliteVectorStore;
pub use store::{ChunkSearchResult, StoredChunk, VectorStore};

use crate::core::errors::ApiError;
use crate::embed::Embedder;

/// Source label used when a stored chunk carries no source.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// A retrieved chunk with its source label. Built fresh per query and
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    pub source: String,
    pub text: String,
}

/// Chunking, embedding and index access behind one handle.
///
/// Constructed once at startup and shared; both the store and the
/// embedder are injected so tests can substitute fakes.
pub struct KnowledgeBase {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    chunking: ChunkConfig,
}

impl KnowledgeBase {
    /// Build a knowledge base. Rejects an invalid chunking configuration
    /// immediately rather than on the first ingest.
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        chunking: ChunkConfig,
    ) -> Result<Self, ApiError> {
        chunking.validate()?;
        Ok(Self {
            store,
            embedder,
            chunking,
        })
    }
}

impl std::fmt::Debug for KnowledgeBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeBase")
            .field("chunking", &self.chunking)
            .finish_non_exhaustive()
    }
}

impl KnowledgeBase {

    /// Ingest extracted document text under a source name.
    ///
    /// Splits the text into overlapping chunks, embeds each one, and
    /// stores the batch. Re-ingesting a source replaces its previous
    /// chunks. Empty or whitespace-only text stores nothing and returns
    /// zero.
    pub async fn ingest(&self, text: &str, source: &str) -> Result<usize, ApiError> {
        if text.trim().is_empty() {
            return Ok(0);
        }

        let chunks = chunk_text(text, self.chunking)?;
        let embeddings = self.embed_blocking(chunks.clone()).await?;
        if embeddings.len() != chunks.len() {
            return Err(ApiError::Internal(format!(
                "embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let replaced = self.store.delete_source(source).await?;
        if replaced > 0 {
            tracing::info!("Replacing {} existing chunks for source {}", replaced, source);
        }

        let items: Vec<(StoredChunk, Vec<f32>)> = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(index, (content, embedding))| {
                (
                    StoredChunk {
                        chunk_id: Uuid::new_v4().to_string(),
                        content,
                        source: source.to_string(),
                        metadata: Some(json!({ "chunk_index": index })),
                    },
                    embedding,
                )
            })
            .collect();

        let count = items.len();
        self.store.insert_batch(items).await?;
        tracing::info!("Ingested {} chunks from {}", count, source);
        Ok(count)
    }

    /// Retrieve the `k` chunks most similar to `question`, best first.
    ///
    /// An empty index yields an empty list, not an error.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<Context>, ApiError> {
        let query_embedding = self
            .embed_blocking(vec![question.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Internal("embedder returned no query vector".to_string()))?;

        let results = self.store.search(&query_embedding, k).await?;

        Ok(results
            .into_iter()
            .map(|result| Context {
                source: if result.chunk.source.is_empty() {
                    UNKNOWN_SOURCE.to_string()
                } else {
                    result.chunk.source
                },
                text: result.chunk.content,
            })
            .collect())
    }

    /// Total number of stored chunks.
    pub async fn chunk_count(&self) -> Result<usize, ApiError> {
        self.store.count().await
    }

    /// Run the embedder on the blocking pool; model inference is
    /// CPU-bound and must not stall the async runtime.
    async fn embed_blocking(&self, inputs: Vec<String>) -> Result<Vec<Vec<f32>>, ApiError> {
        let embedder = Arc::clone(&self.embedder);
        tokio::task::spawn_blocking(move || embedder.embed(&inputs))
            .await
            .map_err(|e| ApiError::Internal(format!("embedding task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::testing::HashEmbedder;

    const DIM: usize = 32;

    async fn test_kb(chunking: ChunkConfig) -> KnowledgeBase {
        let tmp = std::env::temp_dir().join(format!(
            "askdocs-kb-pipeline-{}.db",
            Uuid::new_v4()
        ));
        let store = SqliteVectorStore::open(tmp, "hash-stub", DIM).await.unwrap();
        KnowledgeBase::new(
            Arc::new(store),
            Arc::new(HashEmbedder::new(DIM)),
            chunking,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn ingest_counts_chunks() {
        let kb = test_kb(ChunkConfig::default()).await;
        let text = "A".repeat(1000);
        let count = kb.ingest(&text, "doc1.txt").await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(kb.chunk_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn whitespace_only_document_is_a_noop() {
        let kb = test_kb(ChunkConfig::default()).await;
        let count = kb.ingest("   \n\t  ", "blank.txt").await.unwrap();
        assert_eq!(count, 0);
        assert_eq!(kb.chunk_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn verbatim_chunk_text_is_retrieved_top_k() {
        let chunking = ChunkConfig {
            chunk_size: 40,
            chunk_overlap: 10,
        };
        let kb = test_kb(chunking).await;

        let text = "the quarterly report covers revenue growth and churn in detail \
                    while the appendix lists regional numbers";
        kb.ingest(text, "report.txt").await.unwrap();

        let chunks = chunk_text(text, chunking).unwrap();
        let probe = chunks[1].clone();

        let contexts = kb.retrieve(&probe, 4).await.unwrap();
        assert!(!contexts.is_empty());
        assert_eq!(contexts[0].text, probe);
        assert_eq!(contexts[0].source, "report.txt");
    }

    #[tokio::test]
    async fn reingesting_a_source_replaces_its_chunks() {
        let kb = test_kb(ChunkConfig::default()).await;

        kb.ingest(&"A".repeat(1000), "doc.txt").await.unwrap();
        assert_eq!(kb.chunk_count().await.unwrap(), 2);

        let count = kb.ingest("a much shorter revision", "doc.txt").await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(kb.chunk_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn retrieve_from_empty_index_returns_nothing() {
        let kb = test_kb(ChunkConfig::default()).await;
        let contexts = kb.retrieve("anything at all", 4).await.unwrap();
        assert!(contexts.is_empty());
    }

    #[tokio::test]
    async fn missing_source_maps_to_unknown() {
        let tmp = std::env::temp_dir().join(format!(
            "askdocs-kb-pipeline-{}.db",
            Uuid::new_v4()
        ));
        let store = Arc::new(SqliteVectorStore::open(tmp, "hash-stub", DIM).await.unwrap());
        let embedder = Arc::new(HashEmbedder::new(DIM));

        let embedding = embedder.embed(&["orphan".to_string()]).unwrap().remove(0);
        store
            .insert_batch(vec![(
                StoredChunk {
                    chunk_id: "c1".to_string(),
                    content: "orphan".to_string(),
                    source: String::new(),
                    metadata: None,
                },
                embedding,
            )])
            .await
            .unwrap();

        let kb = KnowledgeBase::new(store, embedder, ChunkConfig::default()).unwrap();
        let contexts = kb.retrieve("orphan", 1).await.unwrap();
        assert_eq!(contexts[0].source, UNKNOWN_SOURCE);
    }

    #[tokio::test]
    async fn invalid_chunking_rejected_at_construction() {
        let tmp = std::env::temp_dir().join(format!(
            "askdocs-kb-pipeline-{}.db",
            Uuid::new_v4()
        ));
        let store = SqliteVectorStore::open(tmp, "hash-stub", DIM).await.unwrap();
        let err = KnowledgeBase::new(
            Arc::new(store),
            Arc::new(HashEmbedder::new(DIM)),
            ChunkConfig {
                chunk_size: 100,
                chunk_overlap: 100,
            },
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Configuration(_)));
    }
}
