use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use super::parse_agent_id;
use crate::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

pub async fn chat_with_agent(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<String>,
    Json(request): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.check_rate_limit()?;

    let outcome = state.chat.chat(&agent_id, &request.message).await?;
    Ok(Json(outcome))
}

pub async fn agent_status(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    parse_agent_id(&agent_id)?;

    let agent = state
        .agents
        .get(&agent_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("agent {} not found", agent_id)))?;

    let conversation_count = state.history.conversation_count(&agent_id).await?;
    let usage_records = state.history.usage_count(&agent_id).await?;
    let total_tokens = state.history.total_tokens(&agent_id).await?;

    Ok(Json(serde_json::json!({
        "agent_id": agent.id,
        "name": agent.name,
        "status": agent.status,
        "conversation_count": conversation_count,
        "usage_records": usage_records,
        "total_tokens_used": total_tokens,
        "created_at": agent.created_at,
    })))
}
