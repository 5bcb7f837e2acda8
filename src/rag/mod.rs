//! RAG (Retrieval-Augmented Generation) core.
//!
//! - `chunker`: bounded overlapping document chunks
//! - `store` / `sqlite`: per-agent vector storage and similarity search
//! - `ingest`: document -> chunks -> embeddings -> store, all-or-nothing
//! - `retriever`: query embedding + nearest-neighbor retrieval

pub mod chunker;
pub mod ingest;
pub mod retriever;
pub mod sqlite;
pub mod store;

pub use ingest::IngestionCoordinator;
pub use retriever::RetrievalCoordinator;
pub use sqlite::SqliteVectorStore;
pub use store::{ChunkMatch, NewChunk, VectorStore};
