//! Ingestion coordinator: document text -> chunks -> embeddings -> store.

use std::sync::Arc;

use serde_json::{json, Value};

use super::chunker;
use super::store::{NewChunk, VectorStore};
use crate::errors::ApiError;
use crate::llm::provider::EmbeddingProvider;

/// Drives one whole document through chunking, embedding and storage.
///
/// The operation is all-or-nothing: chunks are embedded one at a time
/// (rate-limit safety), collected, and written in a single transaction, so
/// a failure on any chunk leaves the knowledge base untouched.
#[derive(Clone)]
pub struct IngestionCoordinator {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl IngestionCoordinator {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            chunk_size,
            chunk_overlap,
        }
    }

    /// Ingests `text` for `agent_id`, attaching `base_metadata` plus
    /// `chunk_index` / `chunk_count` to every chunk. Returns the number of
    /// chunks created, only on full success.
    pub async fn ingest(
        &self,
        agent_id: &str,
        text: &str,
        base_metadata: Value,
    ) -> Result<usize, ApiError> {
        let chunks = chunker::chunk(text, self.chunk_size, self.chunk_overlap)?;
        if chunks.is_empty() {
            return Err(ApiError::validation(
                "EMPTY_DOCUMENT",
                "document contained no text after extraction",
            ));
        }

        let chunk_count = chunks.len();
        let base = base_metadata.as_object().cloned().unwrap_or_default();

        let mut prepared = Vec::with_capacity(chunk_count);
        for (chunk_index, content) in chunks.into_iter().enumerate() {
            let embedding = self.embedder.embed(&content).await?;

            let mut metadata = base.clone();
            metadata.insert("chunk_index".to_string(), json!(chunk_index));
            metadata.insert("chunk_count".to_string(), json!(chunk_count));

            prepared.push(NewChunk {
                content,
                embedding,
                metadata: Value::Object(metadata),
            });
        }

        self.store.insert_batch(agent_id, prepared).await?;

        tracing::info!("Stored {} chunks for agent {}", chunk_count, agent_id);
        Ok(chunk_count)
    }
}
