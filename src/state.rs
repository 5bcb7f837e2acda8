use std::num::NonZeroU32;
use std::sync::Arc;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};

use crate::agents::AgentStore;
use crate::chat::ChatOrchestrator;
use crate::config::{AppConfig, AppPaths};
use crate::errors::ApiError;
use crate::history::HistoryStore;
use crate::llm::anthropic::AnthropicClient;
use crate::llm::openai::OpenAiClient;
use crate::llm::provider::EmbeddingProvider;
use crate::llm::types::Provider;
use crate::llm::ProviderRegistry;
use crate::rag::{
    IngestionCoordinator, RetrievalCoordinator, SqliteVectorStore, VectorStore,
};

/// Global application state shared across all routes.
pub struct AppState {
    pub config: AppConfig,
    pub agents: AgentStore,
    pub history: HistoryStore,
    pub vector_store: Arc<dyn VectorStore>,
    pub ingestion: IngestionCoordinator,
    pub retrieval: RetrievalCoordinator,
    pub chat: ChatOrchestrator,
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl AppState {
    pub async fn initialize(config: AppConfig, paths: &AppPaths) -> Result<Arc<Self>, ApiError> {
        std::fs::create_dir_all(&paths.data_dir).map_err(ApiError::internal)?;

        let options = SqliteConnectOptions::new()
            .filename(&paths.db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::storage)?;

        let agents = AgentStore::new(pool.clone()).await?;
        let history = HistoryStore::new(pool.clone()).await?;
        let vector_store: Arc<dyn VectorStore> = Arc::new(
            SqliteVectorStore::new(pool, config.embedding_dimension).await?,
        );

        let openai = Arc::new(OpenAiClient::new(
            config.openai_base_url.clone(),
            config.openai_api_key.clone(),
            config.embedding_model.clone(),
        ));
        let anthropic = Arc::new(AnthropicClient::new(
            config.anthropic_base_url.clone(),
            config.anthropic_api_key.clone(),
        ));

        let embedder: Arc<dyn EmbeddingProvider> = openai.clone();
        let mut providers = ProviderRegistry::new();
        providers.register(Provider::OpenAi, openai);
        providers.register(Provider::Anthropic, anthropic);

        let ingestion = IngestionCoordinator::new(
            embedder.clone(),
            vector_store.clone(),
            config.chunk_size,
            config.chunk_overlap,
        );
        let retrieval =
            RetrievalCoordinator::new(embedder, vector_store.clone(), config.top_k);
        let chat = ChatOrchestrator::new(
            agents.clone(),
            retrieval.clone(),
            providers,
            history.clone(),
            config.temperature,
            config.max_tokens,
        );

        let per_minute = NonZeroU32::new(config.requests_per_minute.max(1))
            .expect("non-zero after max(1)");
        let limiter = RateLimiter::direct(Quota::per_minute(per_minute));

        Ok(Arc::new(AppState {
            config,
            agents,
            history,
            vector_store,
            ingestion,
            retrieval,
            chat,
            limiter,
        }))
    }

    pub fn check_rate_limit(&self) -> Result<(), ApiError> {
        self.limiter.check().map_err(|_| ApiError::RateLimited)
    }
}
