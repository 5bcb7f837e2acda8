//! Remote LLM capabilities: embedding and generation provider adapters.

pub mod anthropic;
pub mod openai;
pub mod pricing;
pub mod provider;
pub mod types;

use std::collections::HashMap;
use std::sync::Arc;

use self::provider::GenerationProvider;
use self::types::Provider;

use crate::errors::ApiError;

/// Maps a configured provider to its generation client.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    generation: HashMap<Provider, Arc<dyn GenerationProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Provider, client: Arc<dyn GenerationProvider>) {
        self.generation.insert(provider, client);
    }

    pub fn generation(&self, provider: Provider) -> Result<Arc<dyn GenerationProvider>, ApiError> {
        self.generation.get(&provider).cloned().ok_or_else(|| {
            ApiError::Internal(format!(
                "no generation client registered for provider '{}'",
                provider.as_str()
            ))
        })
    }
}
