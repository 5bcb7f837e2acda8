use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::parse_agent_id;
use crate::agents::{AgentUpdate, NewAgent};
use crate::errors::ApiError;
use crate::state::AppState;

pub async fn create_agent(
    State(state): State<Arc<AppState>>,
    Json(new_agent): Json<NewAgent>,
) -> Result<impl IntoResponse, ApiError> {
    let agent = state.agents.create(new_agent).await?;
    Ok((StatusCode::CREATED, Json(agent)))
}

pub async fn list_agents(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let agents = state.agents.list().await?;
    Ok(Json(json!({ "agents": agents })))
}

pub async fn get_agent(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    parse_agent_id(&agent_id)?;
    let agent = state
        .agents
        .get(&agent_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("agent {} not found", agent_id)))?;
    Ok(Json(agent))
}

pub async fn update_agent(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<String>,
    Json(update): Json<AgentUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    parse_agent_id(&agent_id)?;
    let agent = state.agents.update(&agent_id, update).await?;
    Ok(Json(agent))
}

/// Removes the agent and its knowledge chunks. Conversation and usage rows
/// are retained; they reference the agent by lookup key only.
pub async fn delete_agent(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    parse_agent_id(&agent_id)?;

    if !state.agents.delete(&agent_id).await? {
        return Err(ApiError::NotFound(format!("agent {} not found", agent_id)));
    }
    let chunks_removed = state.vector_store.delete_all(&agent_id).await?;

    Ok(Json(json!({
        "agent_id": agent_id,
        "deleted": true,
        "chunks_removed": chunks_removed,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ConversationQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<String>,
    Query(query): Query<ConversationQuery>,
) -> Result<impl IntoResponse, ApiError> {
    parse_agent_id(&agent_id)?;

    let conversations = state.history.list_recent(&agent_id, query.limit).await?;
    let total = conversations.len();
    Ok(Json(json!({
        "conversations": conversations,
        "total": total,
    })))
}
