mod agents;
mod chat;
mod config;
mod errors;
mod extract;
mod history;
mod llm;
mod logging;
mod rag;
mod server;
mod state;
#[cfg(test)]
mod testutil;

use std::env;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use crate::config::{AppConfig, AppPaths};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = AppPaths::new();
    logging::init(&paths);

    let config = AppConfig::from_env();
    let state = AppState::initialize(config, &paths).await?;

    let port = env::var("PORT")
        .ok()
        .and_then(|val| val.parse::<u16>().ok())
        .unwrap_or(8710);
    let bind_addr = format!("127.0.0.1:{}", port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on {}", addr);

    let app: Router = server::router::router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
