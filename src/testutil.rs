//! Shared test helpers.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

/// Fresh SQLite pool backed by a unique temp file.
pub async fn test_pool() -> SqlitePool {
    let path = std::env::temp_dir().join(format!("agentbox-test-{}.db", uuid::Uuid::new_v4()));

    let options = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true);

    SqlitePoolOptions::new()
        .max_connections(2)
        .connect_with(options)
        .await
        .expect("test pool")
}
