//! Slim agent store: lookup and lifecycle for chat agents.
//!
//! Updates go through `AgentUpdate`, an explicit enumerated field set;
//! unknown fields are rejected at deserialization instead of being applied
//! reflectively.

use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use crate::errors::ApiError;
use crate::llm::types::Provider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Active,
    Inactive,
    Error,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Active => "active",
            AgentStatus::Inactive => "inactive",
            AgentStatus::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(AgentStatus::Active),
            "inactive" => Some(AgentStatus::Inactive),
            "error" => Some(AgentStatus::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub provider: Provider,
    pub model: String,
    pub system_prompt: Option<String>,
    pub status: AgentStatus,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAgent {
    pub name: String,
    pub provider: Provider,
    pub model: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

/// Typed partial update. `deny_unknown_fields` makes unrecognized keys a
/// deserialization error rather than a silently dropped (or reflectively
/// applied) attribute.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentUpdate {
    pub name: Option<String>,
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub status: Option<AgentStatus>,
}

#[derive(Clone)]
pub struct AgentStore {
    pool: SqlitePool,
}

impl AgentStore {
    pub async fn new(pool: SqlitePool) -> Result<Self, ApiError> {
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS agents (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                provider TEXT NOT NULL,
                model TEXT NOT NULL,
                system_prompt TEXT,
                status TEXT NOT NULL DEFAULT 'active',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::storage)?;

        Ok(())
    }

    pub async fn create(&self, new_agent: NewAgent) -> Result<Agent, ApiError> {
        if new_agent.name.trim().is_empty() {
            return Err(ApiError::validation("INVALID_NAME", "agent name is required"));
        }
        if new_agent.model.trim().is_empty() {
            return Err(ApiError::validation("INVALID_MODEL", "model is required"));
        }

        let agent = Agent {
            id: uuid::Uuid::new_v4().to_string(),
            name: new_agent.name,
            provider: new_agent.provider,
            model: new_agent.model,
            system_prompt: new_agent.system_prompt,
            status: AgentStatus::Active,
            created_at: chrono::Utc::now().to_rfc3339(),
            updated_at: chrono::Utc::now().to_rfc3339(),
        };

        sqlx::query(
            "INSERT INTO agents (id, name, provider, model, system_prompt, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&agent.id)
        .bind(&agent.name)
        .bind(agent.provider.as_str())
        .bind(&agent.model)
        .bind(&agent.system_prompt)
        .bind(agent.status.as_str())
        .bind(&agent.created_at)
        .bind(&agent.updated_at)
        .execute(&self.pool)
        .await
        .map_err(ApiError::storage)?;

        tracing::info!("Agent created: {} ({})", agent.id, agent.name);
        Ok(agent)
    }

    pub async fn get(&self, agent_id: &str) -> Result<Option<Agent>, ApiError> {
        let row = sqlx::query("SELECT * FROM agents WHERE id = ?1")
            .bind(agent_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(ApiError::storage)?;

        row.as_ref().map(row_to_agent).transpose()
    }

    pub async fn list(&self) -> Result<Vec<Agent>, ApiError> {
        let rows = sqlx::query("SELECT * FROM agents ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(ApiError::storage)?;

        rows.iter().map(row_to_agent).collect()
    }

    pub async fn update(&self, agent_id: &str, update: AgentUpdate) -> Result<Agent, ApiError> {
        let mut agent = self
            .get(agent_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("agent {} not found", agent_id)))?;

        if let Some(name) = update.name {
            agent.name = name;
        }
        if let Some(provider) = update.provider {
            agent.provider = provider;
        }
        if let Some(model) = update.model {
            agent.model = model;
        }
        if let Some(system_prompt) = update.system_prompt {
            agent.system_prompt = Some(system_prompt);
        }
        if let Some(status) = update.status {
            agent.status = status;
        }
        agent.updated_at = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            "UPDATE agents
             SET name = ?1, provider = ?2, model = ?3, system_prompt = ?4, status = ?5, updated_at = ?6
             WHERE id = ?7",
        )
        .bind(&agent.name)
        .bind(agent.provider.as_str())
        .bind(&agent.model)
        .bind(&agent.system_prompt)
        .bind(agent.status.as_str())
        .bind(&agent.updated_at)
        .bind(agent_id)
        .execute(&self.pool)
        .await
        .map_err(ApiError::storage)?;

        Ok(agent)
    }

    pub async fn delete(&self, agent_id: &str) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM agents WHERE id = ?1")
            .bind(agent_id)
            .execute(&self.pool)
            .await
            .map_err(ApiError::storage)?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_agent(row: &sqlx::sqlite::SqliteRow) -> Result<Agent, ApiError> {
    let provider_str: String = row.get("provider");
    let provider = Provider::parse(&provider_str)
        .ok_or_else(|| ApiError::Storage(format!("unknown provider '{}' in store", provider_str)))?;

    let status_str: String = row.get("status");
    let status = AgentStatus::parse(&status_str)
        .ok_or_else(|| ApiError::Storage(format!("unknown status '{}' in store", status_str)))?;

    Ok(Agent {
        id: row.get("id"),
        name: row.get("name"),
        provider,
        model: row.get("model"),
        system_prompt: row.get("system_prompt"),
        status,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::test_pool;

    fn sample_agent() -> NewAgent {
        NewAgent {
            name: "support-bot".to_string(),
            provider: Provider::OpenAi,
            model: "gpt-4".to_string(),
            system_prompt: Some("You answer support questions.".to_string()),
        }
    }

    #[tokio::test]
    async fn create_and_get_roundtrip() {
        let store = AgentStore::new(test_pool().await).await.unwrap();

        let created = store.create(sample_agent()).await.unwrap();
        assert_eq!(created.status, AgentStatus::Active);

        let fetched = store.get(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "support-bot");
        assert_eq!(fetched.provider, Provider::OpenAi);

        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_applies_only_provided_fields() {
        let store = AgentStore::new(test_pool().await).await.unwrap();
        let created = store.create(sample_agent()).await.unwrap();

        let updated = store
            .update(
                &created.id,
                AgentUpdate {
                    status: Some(AgentStatus::Inactive),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.status, AgentStatus::Inactive);
        assert_eq!(updated.name, "support-bot");
        assert_eq!(updated.model, "gpt-4");
    }

    #[tokio::test]
    async fn update_of_missing_agent_is_not_found() {
        let store = AgentStore::new(test_pool().await).await.unwrap();
        let err = store
            .update("missing", AgentUpdate::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "AGENT_NOT_FOUND");
    }

    #[test]
    fn unknown_update_fields_are_rejected() {
        let raw = serde_json::json!({ "name": "x", "api_key_encrypted": "sneaky" });
        assert!(serde_json::from_value::<AgentUpdate>(raw).is_err());
    }

    #[tokio::test]
    async fn delete_reports_whether_a_row_was_removed() {
        let store = AgentStore::new(test_pool().await).await.unwrap();
        let created = store.create(sample_agent()).await.unwrap();

        assert!(store.delete(&created.id).await.unwrap());
        assert!(!store.delete(&created.id).await.unwrap());
    }
}
