//! Retrieval coordinator: query embedding + nearest-neighbor lookup.

use std::sync::Arc;

use super::store::{ChunkMatch, VectorStore};
use crate::errors::ApiError;
use crate::llm::provider::EmbeddingProvider;

#[derive(Clone)]
pub struct RetrievalCoordinator {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    default_top_k: usize,
}

impl RetrievalCoordinator {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        default_top_k: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            default_top_k,
        }
    }

    pub async fn has_knowledge(&self, agent_id: &str) -> Result<bool, ApiError> {
        Ok(self.store.count(agent_id).await? > 0)
    }

    /// The `top_k` most relevant chunks for `query`, ascending by
    /// distance. Owners without any indexed chunks get an empty result
    /// without an embedding call.
    pub async fn retrieve(
        &self,
        query: &str,
        agent_id: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<ChunkMatch>, ApiError> {
        let top_k = top_k.unwrap_or(self.default_top_k);
        if top_k == 0 {
            return Err(ApiError::validation(
                "INVALID_TOP_K",
                "top_k must be a positive integer",
            ));
        }

        if !self.has_knowledge(agent_id).await? {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;
        let matches = self
            .store
            .nearest_neighbors(agent_id, &query_embedding, top_k)
            .await?;

        tracing::debug!(
            "Retrieved {} chunks for agent {}",
            matches.len(),
            agent_id
        );
        Ok(matches)
    }
}
