//! Chat orchestration.
//!
//! One chat turn walks a fixed sequence: validate the agent, consult the
//! knowledge base when one exists, assemble the prompt, call the
//! generation backend, persist the turn and its usage record atomically.
//! A failure at any step fails the whole turn; no partial side effect
//! stays observable.

use std::time::Instant;

use serde::Serialize;
use uuid::Uuid;

use crate::agents::{AgentStatus, AgentStore};
use crate::errors::ApiError;
use crate::history::{HistoryStore, NewConversationTurn, NewUsageRecord};
use crate::llm::types::{ChatMessage, CompletionRequest};
use crate::llm::ProviderRegistry;
use crate::rag::RetrievalCoordinator;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// Completed turn as reported to the caller. `rag_context` is `None` when
/// no knowledge base was consulted.
#[derive(Debug, Clone, Serialize)]
pub struct ChatOutcome {
    pub response: String,
    pub tokens_used: i64,
    pub response_time_ms: i64,
    pub rag_context: Option<Vec<String>>,
}

#[derive(Clone)]
pub struct ChatOrchestrator {
    agents: AgentStore,
    retrieval: RetrievalCoordinator,
    providers: ProviderRegistry,
    history: HistoryStore,
    temperature: f64,
    max_tokens: u32,
}

impl ChatOrchestrator {
    pub fn new(
        agents: AgentStore,
        retrieval: RetrievalCoordinator,
        providers: ProviderRegistry,
        history: HistoryStore,
        temperature: f64,
        max_tokens: u32,
    ) -> Self {
        Self {
            agents,
            retrieval,
            providers,
            history,
            temperature,
            max_tokens,
        }
    }

    pub async fn chat(&self, agent_id: &str, message: &str) -> Result<ChatOutcome, ApiError> {
        let started = Instant::now();

        // Validating
        Uuid::parse_str(agent_id)
            .map_err(|_| ApiError::validation("INVALID_UUID", "invalid agent id format"))?;
        if message.trim().is_empty() {
            return Err(ApiError::validation("EMPTY_MESSAGE", "message must not be empty"));
        }

        let agent = self
            .agents
            .get(agent_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("agent {} not found", agent_id)))?;

        if agent.status != AgentStatus::Active {
            return Err(ApiError::InvalidState(format!(
                "agent is not active (status: {})",
                agent.status.as_str()
            )));
        }

        // RetrievingContext. Not best-effort: when a knowledge base
        // exists, a retrieval failure fails the turn.
        let rag_context = if self.retrieval.has_knowledge(agent_id).await? {
            let matches = self.retrieval.retrieve(message, agent_id, None).await?;
            let texts: Vec<String> = matches.into_iter().map(|m| m.content).collect();
            if texts.is_empty() {
                None
            } else {
                Some(texts)
            }
        } else {
            None
        };

        let messages = vec![
            ChatMessage::system(build_system_content(
                agent.system_prompt.as_deref(),
                rag_context.as_deref(),
            )),
            ChatMessage::user(message),
        ];

        // Generating
        tracing::info!(
            "Sending chat request to {} ({})",
            agent.provider.as_str(),
            agent.model
        );
        let client = self.providers.generation(agent.provider)?;
        let completion = client
            .complete(CompletionRequest {
                model: agent.model.clone(),
                messages,
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            })
            .await?;

        let response_time_ms = started.elapsed().as_millis() as i64;

        // Persisting: conversation row and usage row, atomically.
        self.history
            .record_turn(
                NewConversationTurn {
                    agent_id: agent.id.clone(),
                    user_message: message.to_string(),
                    agent_response: completion.text.clone(),
                    tokens_used: completion.tokens_used,
                    response_time_ms,
                    rag_context: rag_context.clone(),
                },
                NewUsageRecord {
                    agent_id: agent.id.clone(),
                    provider: agent.provider,
                    model: agent.model.clone(),
                    tokens_used: completion.tokens_used,
                    cost_usd: completion.estimated_cost,
                },
            )
            .await?;

        tracing::info!(
            "Chat completed for agent {}: {}ms, {} tokens",
            agent.id,
            response_time_ms,
            completion.tokens_used
        );

        Ok(ChatOutcome {
            response: completion.text,
            tokens_used: completion.tokens_used,
            response_time_ms,
            rag_context,
        })
    }
}

/// System prompt plus, when context was retrieved, one delimited block per
/// retrieved item.
fn build_system_content(system_prompt: Option<&str>, context: Option<&[String]>) -> String {
    let mut content = match system_prompt {
        Some(prompt) if !prompt.trim().is_empty() => prompt.to_string(),
        _ => DEFAULT_SYSTEM_PROMPT.to_string(),
    };

    if let Some(items) = context {
        if !items.is_empty() {
            let blocks: Vec<String> = items
                .iter()
                .enumerate()
                .map(|(i, text)| format!("[Document {}]\n{}", i + 1, text))
                .collect();
            content.push_str(
                "\n\nUse the following context to answer questions accurately:\n\n",
            );
            content.push_str(&blocks.join("\n\n"));
        }
    }

    content
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::agents::NewAgent;
    use crate::llm::provider::testing::{MockEmbedder, MockGenerator};
    use crate::llm::types::Provider;
    use crate::rag::store::{NewChunk, VectorStore};
    use crate::rag::SqliteVectorStore;
    use crate::testutil::test_pool;

    struct Harness {
        orchestrator: ChatOrchestrator,
        agents: AgentStore,
        history: HistoryStore,
        store: Arc<SqliteVectorStore>,
        embedder: Arc<MockEmbedder>,
        generator: Arc<MockGenerator>,
    }

    async fn harness(generator: MockGenerator) -> Harness {
        let pool = test_pool().await;
        let agents = AgentStore::new(pool.clone()).await.unwrap();
        let history = HistoryStore::new(pool.clone()).await.unwrap();
        let store = Arc::new(SqliteVectorStore::new(pool, 3).await.unwrap());
        let embedder = Arc::new(MockEmbedder::new(3));
        let generator = Arc::new(generator);

        let retrieval = RetrievalCoordinator::new(embedder.clone(), store.clone(), 3);
        let mut providers = ProviderRegistry::new();
        providers.register(Provider::OpenAi, generator.clone());

        let orchestrator = ChatOrchestrator::new(
            agents.clone(),
            retrieval,
            providers,
            history.clone(),
            0.7,
            1000,
        );

        Harness {
            orchestrator,
            agents,
            history,
            store,
            embedder,
            generator,
        }
    }

    async fn active_agent(harness: &Harness) -> String {
        harness
            .agents
            .create(NewAgent {
                name: "helper".to_string(),
                provider: Provider::OpenAi,
                model: "gpt-4".to_string(),
                system_prompt: None,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn turn_without_knowledge_base() {
        let harness = harness(MockGenerator::new("Hi there!", 12)).await;
        let agent_id = active_agent(&harness).await;

        let outcome = harness.orchestrator.chat(&agent_id, "Hello").await.unwrap();

        assert_eq!(outcome.response, "Hi there!");
        assert_eq!(outcome.tokens_used, 12);
        assert!(outcome.rag_context.is_none());
        assert_eq!(harness.embedder.calls(), 0);

        // System message carries no context block.
        let request = harness.generator.last_request().unwrap();
        assert_eq!(request.messages[0].role, "system");
        assert_eq!(request.messages[0].content, DEFAULT_SYSTEM_PROMPT);
        assert!(!request.messages[0].content.contains("[Document"));

        assert_eq!(harness.history.conversation_count(&agent_id).await.unwrap(), 1);
        assert_eq!(harness.history.usage_count(&agent_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn turn_with_knowledge_base_injects_context() {
        let harness = harness(MockGenerator::new("Thirty days.", 30)).await;
        let agent_id = active_agent(&harness).await;

        for text in ["Returns within 30 days.", "Free shipping over 50.", "Support is 24/7."] {
            harness
                .store
                .insert(
                    &agent_id,
                    NewChunk {
                        content: text.to_string(),
                        embedding: harness.embedder.vector_for(text),
                        metadata: json!({}),
                    },
                )
                .await
                .unwrap();
        }

        let outcome = harness
            .orchestrator
            .chat(&agent_id, "Returns within 30 days.")
            .await
            .unwrap();

        let context = outcome.rag_context.unwrap();
        assert!(!context.is_empty());
        assert!(context.len() <= 3);
        assert_eq!(context[0], "Returns within 30 days.");

        let request = harness.generator.last_request().unwrap();
        assert!(request.messages[0].content.contains("[Document 1]"));
        assert_eq!(request.messages[1].role, "user");

        let turns = harness.history.list_recent(&agent_id, 10).await.unwrap();
        assert_eq!(turns[0].rag_context.as_ref().unwrap().len(), context.len());
    }

    #[tokio::test]
    async fn inactive_agent_fails_without_side_effects() {
        let harness = harness(MockGenerator::new("never", 0)).await;
        let agent_id = active_agent(&harness).await;
        harness
            .agents
            .update(
                &agent_id,
                crate::agents::AgentUpdate {
                    status: Some(AgentStatus::Inactive),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = harness.orchestrator.chat(&agent_id, "Hello").await.unwrap_err();

        assert_eq!(err.code(), "AGENT_INACTIVE");
        assert_eq!(harness.generator.calls(), 0);
        assert_eq!(harness.history.conversation_count(&agent_id).await.unwrap(), 0);
        assert_eq!(harness.history.usage_count(&agent_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_agent_is_not_found() {
        let harness = harness(MockGenerator::new("never", 0)).await;
        let missing = uuid::Uuid::new_v4().to_string();

        let err = harness.orchestrator.chat(&missing, "Hello").await.unwrap_err();
        assert_eq!(err.code(), "AGENT_NOT_FOUND");
    }

    #[tokio::test]
    async fn malformed_id_and_empty_message_are_rejected() {
        let harness = harness(MockGenerator::new("never", 0)).await;
        let agent_id = active_agent(&harness).await;

        let err = harness.orchestrator.chat("not-a-uuid", "Hello").await.unwrap_err();
        assert_eq!(err.code(), "INVALID_UUID");

        let err = harness.orchestrator.chat(&agent_id, "   ").await.unwrap_err();
        assert_eq!(err.code(), "EMPTY_MESSAGE");
    }

    #[tokio::test]
    async fn generation_failure_persists_nothing() {
        let harness = harness(MockGenerator::failing()).await;
        let agent_id = active_agent(&harness).await;

        let err = harness.orchestrator.chat(&agent_id, "Hello").await.unwrap_err();

        assert_eq!(err.code(), "UPSTREAM_PROVIDER_ERROR");
        assert_eq!(harness.history.conversation_count(&agent_id).await.unwrap(), 0);
        assert_eq!(harness.history.usage_count(&agent_id).await.unwrap(), 0);
    }

    #[test]
    fn custom_prompt_survives_context_append() {
        let items = vec!["Treasure is buried at dawn.".to_string()];
        let content = build_system_content(Some("You are a pirate."), Some(&items));
        assert!(content.starts_with("You are a pirate."));
        assert!(content.contains("[Document 1]\nTreasure is buried at dawn."));

        let bare = build_system_content(None, None);
        assert_eq!(bare, DEFAULT_SYSTEM_PROMPT);
    }
}
