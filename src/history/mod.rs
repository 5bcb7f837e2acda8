//! Conversation log and usage ledger.
//!
//! A completed chat turn produces exactly one conversation row and one
//! usage row; `record_turn` writes both inside a single transaction so a
//! persistence failure leaves neither behind.

use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use crate::errors::ApiError;
use crate::llm::pricing::CostUsd;
use crate::llm::types::Provider;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: String,
    pub agent_id: String,
    pub user_message: String,
    pub agent_response: String,
    pub tokens_used: i64,
    pub response_time_ms: i64,
    pub rag_context: Option<Vec<String>>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewConversationTurn {
    pub agent_id: String,
    pub user_message: String,
    pub agent_response: String,
    pub tokens_used: i64,
    pub response_time_ms: i64,
    pub rag_context: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct NewUsageRecord {
    pub agent_id: String,
    pub provider: Provider,
    pub model: String,
    pub tokens_used: i64,
    pub cost_usd: CostUsd,
}

#[derive(Clone)]
pub struct HistoryStore {
    pool: SqlitePool,
}

impl HistoryStore {
    pub async fn new(pool: SqlitePool) -> Result<Self, ApiError> {
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                agent_id TEXT NOT NULL,
                user_message TEXT NOT NULL,
                agent_response TEXT NOT NULL,
                tokens_used INTEGER NOT NULL,
                response_time_ms INTEGER NOT NULL,
                rag_context TEXT,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::storage)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_conversations_agent ON conversations(agent_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::storage)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS usage_records (
                id TEXT PRIMARY KEY,
                agent_id TEXT NOT NULL,
                provider TEXT NOT NULL,
                model TEXT NOT NULL,
                tokens_used INTEGER NOT NULL,
                cost_usd TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::storage)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_usage_agent ON usage_records(agent_id)")
            .execute(&self.pool)
            .await
            .map_err(ApiError::storage)?;

        Ok(())
    }

    /// Persists a turn and its usage record atomically. Returns the new
    /// conversation id.
    pub async fn record_turn(
        &self,
        turn: NewConversationTurn,
        usage: NewUsageRecord,
    ) -> Result<String, ApiError> {
        let conversation_id = uuid::Uuid::new_v4().to_string();
        let usage_id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        let rag_context = turn
            .rag_context
            .as_ref()
            .map(|items| serde_json::to_string(items).map_err(ApiError::internal))
            .transpose()?;

        let mut tx = self.pool.begin().await.map_err(ApiError::storage)?;

        sqlx::query(
            "INSERT INTO conversations
             (id, agent_id, user_message, agent_response, tokens_used, response_time_ms, rag_context, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&conversation_id)
        .bind(&turn.agent_id)
        .bind(&turn.user_message)
        .bind(&turn.agent_response)
        .bind(turn.tokens_used)
        .bind(turn.response_time_ms)
        .bind(&rag_context)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(ApiError::storage)?;

        sqlx::query(
            "INSERT INTO usage_records
             (id, agent_id, provider, model, tokens_used, cost_usd, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&usage_id)
        .bind(&usage.agent_id)
        .bind(usage.provider.as_str())
        .bind(&usage.model)
        .bind(usage.tokens_used)
        .bind(usage.cost_usd.to_string())
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(ApiError::storage)?;

        tx.commit().await.map_err(ApiError::storage)?;

        Ok(conversation_id)
    }

    pub async fn list_recent(
        &self,
        agent_id: &str,
        limit: i64,
    ) -> Result<Vec<ConversationTurn>, ApiError> {
        let rows = sqlx::query(
            "SELECT * FROM conversations
             WHERE agent_id = ?1
             ORDER BY created_at DESC, id
             LIMIT ?2",
        )
        .bind(agent_id)
        .bind(limit.max(1))
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::storage)?;

        let mut turns = Vec::with_capacity(rows.len());
        for row in &rows {
            let rag_context: Option<String> = row.get("rag_context");
            let rag_context = rag_context
                .as_deref()
                .map(serde_json::from_str::<Vec<String>>)
                .transpose()
                .map_err(ApiError::internal)?;

            turns.push(ConversationTurn {
                id: row.get("id"),
                agent_id: row.get("agent_id"),
                user_message: row.get("user_message"),
                agent_response: row.get("agent_response"),
                tokens_used: row.get("tokens_used"),
                response_time_ms: row.get("response_time_ms"),
                rag_context,
                created_at: row.get("created_at"),
            });
        }

        Ok(turns)
    }

    pub async fn conversation_count(&self, agent_id: &str) -> Result<i64, ApiError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM conversations WHERE agent_id = ?1")
            .bind(agent_id)
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::storage)
    }

    pub async fn total_tokens(&self, agent_id: &str) -> Result<i64, ApiError> {
        let total: Option<i64> =
            sqlx::query_scalar("SELECT SUM(tokens_used) FROM usage_records WHERE agent_id = ?1")
                .bind(agent_id)
                .fetch_one(&self.pool)
                .await
                .map_err(ApiError::storage)?;

        Ok(total.unwrap_or(0))
    }

    pub async fn usage_count(&self, agent_id: &str) -> Result<i64, ApiError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM usage_records WHERE agent_id = ?1")
            .bind(agent_id)
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::storage)
    }
}
