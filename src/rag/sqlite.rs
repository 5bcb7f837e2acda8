//! SQLite-backed vector store.
//!
//! Embeddings are little-endian f32 blobs; similarity search is
//! brute-force cosine over the owner's chunks. The store metric is cosine
//! distance (`1 - cosine similarity`), ascending.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{Row, SqlitePool};

use super::store::{ChunkMatch, NewChunk, VectorStore};
use crate::errors::ApiError;

#[derive(Clone)]
pub struct SqliteVectorStore {
    pool: SqlitePool,
    dimension: usize,
}

impl SqliteVectorStore {
    pub async fn new(pool: SqlitePool, dimension: usize) -> Result<Self, ApiError> {
        let store = Self { pool, dimension };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS knowledge_chunks (
                id TEXT PRIMARY KEY,
                agent_id TEXT NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::storage)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_agent ON knowledge_chunks(agent_id)")
            .execute(&self.pool)
            .await
            .map_err(ApiError::storage)?;

        Ok(())
    }

    fn check_dimension(&self, embedding: &[f32]) -> Result<(), ApiError> {
        if embedding.len() != self.dimension {
            return Err(ApiError::Storage(format!(
                "embedding dimension mismatch: got {}, store is configured for {}",
                embedding.len(),
                self.dimension
            )));
        }
        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        let denom = norm_a * norm_b;

        if denom <= f32::EPSILON {
            0.0
        } else {
            dot / denom
        }
    }

    fn metadata_text(metadata: &Value) -> String {
        serde_json::to_string(metadata).unwrap_or_else(|_| "{}".to_string())
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn insert(&self, agent_id: &str, chunk: NewChunk) -> Result<String, ApiError> {
        self.check_dimension(&chunk.embedding)?;

        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO knowledge_chunks (id, agent_id, content, embedding, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&id)
        .bind(agent_id)
        .bind(&chunk.content)
        .bind(Self::serialize_embedding(&chunk.embedding))
        .bind(Self::metadata_text(&chunk.metadata))
        .execute(&self.pool)
        .await
        .map_err(ApiError::storage)?;

        Ok(id)
    }

    async fn insert_batch(&self, agent_id: &str, chunks: Vec<NewChunk>) -> Result<(), ApiError> {
        if chunks.is_empty() {
            return Ok(());
        }

        for chunk in &chunks {
            self.check_dimension(&chunk.embedding)?;
        }

        let mut tx = self.pool.begin().await.map_err(ApiError::storage)?;

        for chunk in &chunks {
            sqlx::query(
                "INSERT INTO knowledge_chunks (id, agent_id, content, embedding, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(agent_id)
            .bind(&chunk.content)
            .bind(Self::serialize_embedding(&chunk.embedding))
            .bind(Self::metadata_text(&chunk.metadata))
            .execute(&mut *tx)
            .await
            .map_err(ApiError::storage)?;
        }

        tx.commit().await.map_err(ApiError::storage)?;
        Ok(())
    }

    async fn nearest_neighbors(
        &self,
        agent_id: &str,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<ChunkMatch>, ApiError> {
        self.check_dimension(query)?;

        let rows = sqlx::query(
            "SELECT content, embedding, metadata
             FROM knowledge_chunks
             WHERE agent_id = ?1
             ORDER BY rowid",
        )
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::storage)?;

        let mut scored: Vec<ChunkMatch> = rows
            .iter()
            .map(|row| {
                let embedding_bytes: Vec<u8> = row.get("embedding");
                let stored = Self::deserialize_embedding(&embedding_bytes);
                let metadata_str: String = row.get("metadata");
                let metadata =
                    serde_json::from_str::<Value>(&metadata_str).unwrap_or(Value::Null);

                ChunkMatch {
                    content: row.get("content"),
                    distance: 1.0 - Self::cosine_similarity(query, &stored),
                    metadata,
                }
            })
            .collect();

        // Stable sort keeps rowid (insertion) order on equal distances.
        scored.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);

        Ok(scored)
    }

    async fn count(&self, agent_id: &str) -> Result<usize, ApiError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM knowledge_chunks WHERE agent_id = ?1")
                .bind(agent_id)
                .fetch_one(&self.pool)
                .await
                .map_err(ApiError::storage)?;

        Ok(count as usize)
    }

    async fn delete_all(&self, agent_id: &str) -> Result<usize, ApiError> {
        let result = sqlx::query("DELETE FROM knowledge_chunks WHERE agent_id = ?1")
            .bind(agent_id)
            .execute(&self.pool)
            .await
            .map_err(ApiError::storage)?;

        Ok(result.rows_affected() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::test_pool;
    use serde_json::json;

    async fn test_store(dimension: usize) -> SqliteVectorStore {
        SqliteVectorStore::new(test_pool().await, dimension)
            .await
            .unwrap()
    }

    fn make_chunk(content: &str, embedding: Vec<f32>) -> NewChunk {
        NewChunk {
            content: content.to_string(),
            embedding,
            metadata: json!({ "filename": "test.txt" }),
        }
    }

    #[tokio::test]
    async fn insert_and_count() {
        let store = test_store(3).await;

        store
            .insert("agent-1", make_chunk("hello", vec![1.0, 0.0, 0.0]))
            .await
            .unwrap();

        assert_eq!(store.count("agent-1").await.unwrap(), 1);
        assert_eq!(store.count("agent-2").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn insert_rejects_dimension_mismatch() {
        let store = test_store(3).await;

        let err = store
            .insert("agent-1", make_chunk("bad", vec![1.0, 0.0]))
            .await
            .unwrap_err();

        assert_eq!(err.code(), "STORAGE_ERROR");
        assert_eq!(store.count("agent-1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn batch_is_all_or_nothing() {
        let store = test_store(3).await;

        let chunks = vec![
            make_chunk("one", vec![1.0, 0.0, 0.0]),
            make_chunk("two", vec![0.0, 1.0, 0.0]),
            make_chunk("broken", vec![0.5]),
        ];

        assert!(store.insert_batch("agent-1", chunks).await.is_err());
        assert_eq!(store.count("agent-1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn neighbors_are_ordered_and_capped() {
        let store = test_store(2).await;

        store
            .insert("agent-1", make_chunk("east", vec![1.0, 0.0]))
            .await
            .unwrap();
        store
            .insert("agent-1", make_chunk("north", vec![0.0, 1.0]))
            .await
            .unwrap();
        store
            .insert("agent-1", make_chunk("northeast", vec![1.0, 1.0]))
            .await
            .unwrap();

        let results = store
            .nearest_neighbors("agent-1", &[1.0, 0.0], 2)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].content, "east");
        assert_eq!(results[1].content, "northeast");
        assert!(results[0].distance <= results[1].distance);
    }

    #[tokio::test]
    async fn ties_resolve_to_earlier_insertion() {
        let store = test_store(2).await;

        store
            .insert("agent-1", make_chunk("first", vec![1.0, 0.0]))
            .await
            .unwrap();
        store
            .insert("agent-1", make_chunk("second", vec![1.0, 0.0]))
            .await
            .unwrap();

        let results = store
            .nearest_neighbors("agent-1", &[1.0, 0.0], 2)
            .await
            .unwrap();

        assert_eq!(results[0].content, "first");
        assert_eq!(results[1].content, "second");
    }

    #[tokio::test]
    async fn unknown_owner_yields_empty() {
        let store = test_store(2).await;
        let results = store
            .nearest_neighbors("nobody", &[1.0, 0.0], 5)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn delete_all_reports_removed_rows() {
        let store = test_store(2).await;

        store
            .insert("agent-1", make_chunk("a", vec![1.0, 0.0]))
            .await
            .unwrap();
        store
            .insert("agent-1", make_chunk("b", vec![0.0, 1.0]))
            .await
            .unwrap();
        store
            .insert("agent-2", make_chunk("c", vec![0.0, 1.0]))
            .await
            .unwrap();

        assert_eq!(store.delete_all("agent-1").await.unwrap(), 2);
        assert_eq!(store.count("agent-1").await.unwrap(), 0);
        assert_eq!(store.count("agent-2").await.unwrap(), 1);
    }
}
