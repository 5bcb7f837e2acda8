use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers::{agents, chat, health, rag};
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route(
            "/api/agents",
            get(agents::list_agents).post(agents::create_agent),
        )
        .route(
            "/api/agents/:agent_id",
            get(agents::get_agent)
                .patch(agents::update_agent)
                .delete(agents::delete_agent),
        )
        .route("/api/agents/:agent_id/status", get(chat::agent_status))
        .route(
            "/api/agents/:agent_id/conversations",
            get(agents::list_conversations),
        )
        .route("/api/agents/:agent_id/chat", post(chat::chat_with_agent))
        .route("/api/rag/upload", post(rag::upload_knowledge))
        .route(
            "/api/rag/documents/:agent_id",
            get(rag::knowledge_presence).delete(rag::delete_knowledge),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
