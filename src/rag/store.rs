//! VectorStore trait — abstract interface for knowledge-chunk storage.
//!
//! Chunks belong to exactly one owning agent and are immutable after
//! insertion; the only removal path is `delete_all` for an owner.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ApiError;

/// A chunk ready for insertion: text, its embedding and source metadata.
#[derive(Debug, Clone)]
pub struct NewChunk {
    pub content: String,
    pub embedding: Vec<f32>,
    pub metadata: Value,
}

/// One nearest-neighbor match. Distance is the store's fixed metric
/// (cosine distance, `1 - cosine similarity`); smaller is more relevant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMatch {
    pub content: String,
    pub distance: f32,
    pub metadata: Value,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert one chunk. Fails with `Storage` when the embedding width
    /// does not match the store's configured dimension.
    async fn insert(&self, agent_id: &str, chunk: NewChunk) -> Result<String, ApiError>;

    /// Insert a batch of chunks inside one transaction: either every chunk
    /// lands or none do.
    async fn insert_batch(&self, agent_id: &str, chunks: Vec<NewChunk>) -> Result<(), ApiError>;

    /// At most `k` chunks owned by `agent_id`, ordered by ascending
    /// distance; ties resolve to the earlier-inserted chunk. Empty result
    /// (not an error) when the owner has no chunks.
    async fn nearest_neighbors(
        &self,
        agent_id: &str,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<ChunkMatch>, ApiError>;

    async fn count(&self, agent_id: &str) -> Result<usize, ApiError>;

    /// Remove the owner's whole knowledge base; returns rows removed.
    async fn delete_all(&self, agent_id: &str) -> Result<usize, ApiError>;
}
