//! Relational storage and the chunk vector index.
//!
//! - [`GraspDb`]: SQLite (via libsql) for videos, chunks, the chat log and notes
//! - [`VectorStore`]: per-video cosine search over chunk embeddings

pub mod grasp_db;
pub mod vectorstore;

pub use grasp_db::GraspDb;
pub use vectorstore::{
    ChunkVector, InMemoryVectorStore, VectorMatch, VectorStore, VectorStoreProvider,
};
