//! VectorStore trait, the abstract interface for the chunk index.
//!
//! Provides a clean abstraction over the durable vector index so the
//! knowledge base can be tested against lightweight fakes. The primary
//! implementation is `SqliteVectorStore` in the `sqlite` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

/// A stored document chunk with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    /// Unique chunk identifier.
    pub chunk_id: String,
    /// The text content of the chunk.
    pub content: String,
    /// Source identifier (the uploaded file name).
    pub source: String,
    /// Optional metadata (JSON); carries the chunk's position in its source.
    pub metadata: Option<serde_json::Value>,
}

/// Result of a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSearchResult {
    pub chunk: StoredChunk,
    /// Similarity score (higher = better).
    pub score: f32,
}

/// Abstract trait for the chunk index backend.
///
/// Implementations must return results best-match-first and treat an
/// empty index as an empty result set, never an error.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert multiple chunks with their embedding vectors.
    async fn insert_batch(
        &self,
        items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<(), ApiError>;

    /// Search for chunks similar to the query embedding.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, ApiError>;

    /// Delete all chunks ingested under a source name. Returns the
    /// number of chunks removed.
    async fn delete_source(&self, source: &str) -> Result<usize, ApiError>;

    /// Get the total chunk count.
    async fn count(&self) -> Result<usize, ApiError>;
}
