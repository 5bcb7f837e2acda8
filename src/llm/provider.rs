use async_trait::async_trait;

use super::types::{Completion, CompletionRequest};
use crate::errors::ApiError;

/// Text -> fixed-dimension vector, via a remote provider call.
///
/// Stateless per call; transport failures, rate limits and malformed
/// responses surface as `Upstream`. No internal retries.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ApiError>;
}

/// Conversational completion over a remote provider.
///
/// Variants differ only in request shaping; callers see one contract.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ApiError>;
}
