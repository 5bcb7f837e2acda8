use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use super::parse_agent_id;
use crate::errors::ApiError;
use crate::extract;
use crate::state::AppState;

/// Multipart knowledge upload: `agent_id` text field plus one `file`.
pub async fn upload_knowledge(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    state.check_rate_limit()?;

    let mut agent_id: Option<String> = None;
    let mut filename: Option<String> = None;
    let mut data: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation("INVALID_MULTIPART", e.to_string()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("agent_id") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation("INVALID_MULTIPART", e.to_string()))?;
                agent_id = Some(value);
            }
            Some("file") => {
                filename = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::validation("INVALID_MULTIPART", e.to_string()))?;
                data = Some(bytes.to_vec());
            }
            _ => {}
        }
    }

    let agent_id = agent_id
        .ok_or_else(|| ApiError::validation("MISSING_FIELD", "agent_id field is required"))?;
    parse_agent_id(&agent_id)?;

    let filename = filename
        .ok_or_else(|| ApiError::validation("MISSING_FIELD", "file field is required"))?;
    let data = data
        .ok_or_else(|| ApiError::validation("MISSING_FIELD", "file field is required"))?;

    if data.len() > state.config.max_upload_bytes {
        return Err(ApiError::validation(
            "FILE_TOO_LARGE",
            format!(
                "file exceeds the {} byte upload limit",
                state.config.max_upload_bytes
            ),
        ));
    }

    let file_type = filename
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_lowercase();
    let text = extract::extract(&data, &file_type)?;

    let metadata = json!({
        "filename": filename,
        "file_type": file_type,
        "file_size": data.len(),
    });

    let chunks_created = state.ingestion.ingest(&agent_id, &text, metadata).await?;
    tracing::info!("Knowledge base uploaded: {} ({} chunks)", filename, chunks_created);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "filename": filename,
            "chunks_created": chunks_created,
            "status": "processed",
        })),
    ))
}

pub async fn knowledge_presence(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    parse_agent_id(&agent_id)?;

    let has_knowledge_base = state.retrieval.has_knowledge(&agent_id).await?;
    Ok(Json(json!({
        "agent_id": agent_id,
        "has_knowledge_base": has_knowledge_base,
    })))
}

pub async fn delete_knowledge(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    parse_agent_id(&agent_id)?;

    let deleted_count = state.vector_store.delete_all(&agent_id).await?;
    tracing::info!("Knowledge base deleted for agent {}", agent_id);

    Ok(Json(json!({
        "agent_id": agent_id,
        "deleted_count": deleted_count,
    })))
}
