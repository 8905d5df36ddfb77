//! Vector Store Abstraction Layer
//!
//! Chunk embeddings are indexed per video and searched with cosine
//! similarity. Entries are keyed `{video_id}_{chunk_index}`, so re-indexing
//! a chunk replaces its previous vector.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               VectorStore Trait               │
//! ├──────────────────────────────────────────────┤
//! │  upsert  │  search  │  delete_video  │ count │
//! └──────────────────────────────────────────────┘
//!                ▲                  ▲
//!        ┌───────┴──────┐   ┌───────┴───────┐
//!        │   InMemory   │   │   JSON file   │
//!        │   (tests)    │   │  (default)    │
//!        └──────────────┘   └───────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use grasp::db::vectorstore::{VectorStore, VectorStoreProvider};
//!
//! let store = VectorStoreProvider::JsonFile {
//!     path: "./data/vectors.json".into(),
//! }.create_store().await?;
//!
//! store.upsert(&vectors).await?;
//! let hits = store.search("dQw4w9WgXcQ", &query_embedding, 5).await?;
//! ```

use crate::types::{AppError, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

// ============================================================================
// Vector Store Provider Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum VectorStoreProvider {
    /// Process-local index, lost on exit
    InMemory,

    /// In-memory index mirrored to a JSON file after every change
    JsonFile { path: PathBuf },
}

impl VectorStoreProvider {
    /// Pick the provider from the configured path; `None` means in-memory.
    pub fn from_path(path: Option<&str>) -> Self {
        match path {
            Some(path) if !path.trim().is_empty() => VectorStoreProvider::JsonFile {
                path: PathBuf::from(path),
            },
            _ => VectorStoreProvider::InMemory,
        }
    }

    /// Create a vector store instance for this provider
    pub async fn create_store(&self) -> Result<Arc<dyn VectorStore>> {
        match self {
            VectorStoreProvider::InMemory => Ok(Arc::new(InMemoryVectorStore::new())),
            VectorStoreProvider::JsonFile { path } => {
                Ok(Arc::new(InMemoryVectorStore::open(path.clone()).await?))
            }
        }
    }
}

// ============================================================================
// Core Types
// ============================================================================

/// The embedding of one transcript chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkVector {
    pub video_id: String,
    pub chunk_index: i64,
    pub embedding: Vec<f32>,
}

impl ChunkVector {
    pub fn key(&self) -> String {
        vector_key(&self.video_id, self.chunk_index)
    }
}

pub fn vector_key(video_id: &str, chunk_index: i64) -> String {
    format!("{}_{}", video_id, chunk_index)
}

/// A similarity hit
#[derive(Debug, Clone, PartialEq)]
pub struct VectorMatch {
    pub video_id: String,
    pub chunk_index: i64,
    /// Cosine similarity in `[-1, 1]`
    pub score: f32,
}

// ============================================================================
// VectorStore Trait
// ============================================================================

#[async_trait]
pub trait VectorStore: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Insert or replace vectors. Returns the number written.
    async fn upsert(&self, vectors: &[ChunkVector]) -> Result<usize>;

    /// Top `limit` chunks of one video, best first. Ties are broken by
    /// `chunk_index` so results are stable.
    async fn search(
        &self,
        video_id: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<VectorMatch>>;

    /// Remove every vector of a video. Returns the number removed.
    async fn delete_video(&self, video_id: &str) -> Result<usize>;

    /// Number of vectors stored for a video
    async fn count(&self, video_id: &str) -> Result<usize>;
}

// ============================================================================
// In-Memory Implementation
// ============================================================================

/// Brute-force cosine index.
///
/// With a `persist_path` the whole index is rewritten to that file after
/// each change and loaded back on start.
pub struct InMemoryVectorStore {
    vectors: Arc<RwLock<HashMap<String, ChunkVector>>>,
    persist_path: Option<PathBuf>,
    persist_lock: tokio::sync::Mutex<()>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            vectors: Arc::new(RwLock::new(HashMap::new())),
            persist_path: None,
            persist_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Load the index from `path` (missing file means empty) and keep it
    /// mirrored there.
    pub async fn open(path: PathBuf) -> Result<Self> {
        let vectors = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let list: Vec<ChunkVector> = serde_json::from_slice(&bytes).map_err(|e| {
                    AppError::Database(format!("Corrupt vector index {:?}: {}", path, e))
                })?;
                list.into_iter().map(|v| (v.key(), v)).collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(AppError::Database(format!(
                    "Failed to read vector index {:?}: {}",
                    path, e
                )));
            }
        };

        tracing::info!(path = ?path, vectors = vectors.len(), "Vector index loaded");

        Ok(Self {
            vectors: Arc::new(RwLock::new(vectors)),
            persist_path: Some(path),
            persist_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Calculate cosine similarity between two vectors.
    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot_product / (norm_a * norm_b)
    }

    async fn persist(&self) -> Result<()> {
        let Some(path) = &self.persist_path else {
            return Ok(());
        };

        // Snapshot under the persist lock so later writes never land first
        let _guard = self.persist_lock.lock().await;
        let bytes = {
            let vectors = self.vectors.read();
            let mut list: Vec<&ChunkVector> = vectors.values().collect();
            list.sort_by(|a, b| {
                a.video_id
                    .cmp(&b.video_id)
                    .then(a.chunk_index.cmp(&b.chunk_index))
            });
            serde_json::to_vec(&list)
                .map_err(|e| AppError::Internal(format!("Failed to encode vector index: {}", e)))?
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::Database(format!("Failed to create {:?}: {}", parent, e))
            })?;
        }

        // Write-then-rename so a crash never leaves a truncated index
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| AppError::Database(format!("Failed to write vector index: {}", e)))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| AppError::Database(format!("Failed to write vector index: {}", e)))?;

        Ok(())
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn provider_name(&self) -> &'static str {
        if self.persist_path.is_some() {
            "json-file"
        } else {
            "in-memory"
        }
    }

    async fn upsert(&self, vectors: &[ChunkVector]) -> Result<usize> {
        if let Some(vector) = vectors.iter().find(|v| v.embedding.is_empty()) {
            return Err(AppError::InvalidInput(format!(
                "Vector '{}' has an empty embedding",
                vector.key()
            )));
        }

        // Entries replaced by this upsert, `None` where the key was new
        let replaced: Vec<(String, Option<ChunkVector>)> = {
            let mut store = self.vectors.write();
            vectors
                .iter()
                .map(|vector| {
                    let key = vector.key();
                    let previous = store.insert(key.clone(), vector.clone());
                    (key, previous)
                })
                .collect()
        };

        if let Err(e) = self.persist().await {
            let mut store = self.vectors.write();
            // Reverse order so a key written twice ends at its first value
            for (key, previous) in replaced.into_iter().rev() {
                match previous {
                    Some(previous) => store.insert(key, previous),
                    None => store.remove(&key),
                };
            }
            return Err(e);
        }

        Ok(vectors.len())
    }

    async fn search(
        &self,
        video_id: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<VectorMatch>> {
        let mut results: Vec<VectorMatch> = {
            let vectors = self.vectors.read();
            vectors
                .values()
                .filter(|v| v.video_id == video_id)
                .map(|v| VectorMatch {
                    video_id: v.video_id.clone(),
                    chunk_index: v.chunk_index,
                    score: Self::cosine_similarity(embedding, &v.embedding),
                })
                .collect()
        };

        // Score descending, then chunk order
        results.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.chunk_index.cmp(&b.chunk_index))
        });
        results.truncate(limit);

        Ok(results)
    }

    async fn delete_video(&self, video_id: &str) -> Result<usize> {
        let removed: Vec<(String, ChunkVector)> = {
            let mut vectors = self.vectors.write();
            let keys: Vec<String> = vectors
                .iter()
                .filter(|(_, v)| v.video_id == video_id)
                .map(|(key, _)| key.clone())
                .collect();
            keys.into_iter()
                .filter_map(|key| vectors.remove(&key).map(|v| (key, v)))
                .collect()
        };

        if removed.is_empty() {
            return Ok(0);
        }

        if let Err(e) = self.persist().await {
            self.vectors.write().extend(removed);
            return Err(e);
        }
        Ok(removed.len())
    }

    async fn count(&self, video_id: &str) -> Result<usize> {
        let vectors = self.vectors.read();
        Ok(vectors.values().filter(|v| v.video_id == video_id).count())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(video_id: &str, chunk_index: i64, embedding: Vec<f32>) -> ChunkVector {
        ChunkVector {
            video_id: video_id.to_string(),
            chunk_index,
            embedding,
        }
    }

    #[tokio::test]
    async fn test_inmemory_upsert_and_search() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(&[
                vector("vid", 0, vec![1.0, 0.0, 0.0]),
                vector("vid", 1, vec![0.0, 1.0, 0.0]),
                vector("vid", 2, vec![0.9, 0.1, 0.0]),
            ])
            .await
            .unwrap();

        let results = store.search("vid", &[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk_index, 0);
        assert_eq!(results[1].chunk_index, 2);
    }

    #[tokio::test]
    async fn test_search_filters_by_video() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(&[
                vector("a", 0, vec![1.0, 0.0]),
                vector("b", 0, vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = store.search("b", &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].video_id, "b");
    }

    #[tokio::test]
    async fn test_ties_break_on_chunk_index() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(&[
                vector("vid", 3, vec![1.0, 0.0]),
                vector("vid", 1, vec![1.0, 0.0]),
                vector("vid", 2, vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = store.search("vid", &[1.0, 0.0], 3).await.unwrap();
        let order: Vec<i64> = results.iter().map(|r| r.chunk_index).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_key() {
        let store = InMemoryVectorStore::new();
        store.upsert(&[vector("vid", 0, vec![1.0, 0.0])]).await.unwrap();
        store.upsert(&[vector("vid", 0, vec![0.0, 1.0])]).await.unwrap();

        assert_eq!(store.count("vid").await.unwrap(), 1);
        let results = store.search("vid", &[0.0, 1.0], 1).await.unwrap();
        assert!((results[0].score - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_delete_video() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(&[
                vector("a", 0, vec![1.0]),
                vector("a", 1, vec![1.0]),
                vector("b", 0, vec![1.0]),
            ])
            .await
            .unwrap();

        assert_eq!(store.delete_video("a").await.unwrap(), 2);
        assert_eq!(store.count("a").await.unwrap(), 0);
        assert_eq!(store.count("b").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_embedding_rejected() {
        let store = InMemoryVectorStore::new();
        let result = store.upsert(&[vector("vid", 0, vec![])]).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_cosine_similarity() {
        assert!((InMemoryVectorStore::cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 0.001);
        assert!(InMemoryVectorStore::cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 0.001);
        assert!((InMemoryVectorStore::cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 0.001);
        assert_eq!(InMemoryVectorStore::cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    /// A store whose index file can never be written: its parent is a file
    fn unwritable_store(dir: &tempfile::TempDir) -> InMemoryVectorStore {
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        InMemoryVectorStore {
            vectors: Arc::new(RwLock::new(HashMap::new())),
            persist_path: Some(blocker.join("vectors.json")),
            persist_lock: tokio::sync::Mutex::new(()),
        }
    }

    #[tokio::test]
    async fn test_failed_persist_restores_previous_vectors() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = unwritable_store(&dir);
        store
            .vectors
            .write()
            .insert(vector_key("vid", 0), vector("vid", 0, vec![1.0, 0.0]));

        let result = store
            .upsert(&[
                vector("vid", 0, vec![0.0, 1.0]),
                vector("vid", 1, vec![0.0, 1.0]),
            ])
            .await;
        assert!(matches!(result, Err(AppError::Database(_))));

        // the new key is gone, the replaced one is back
        assert_eq!(store.count("vid").await.unwrap(), 1);
        let results = store.search("vid", &[1.0, 0.0], 1).await.unwrap();
        assert_eq!(results[0].chunk_index, 0);
        assert!((results[0].score - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_failed_persist_keeps_deleted_vectors() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = unwritable_store(&dir);
        store
            .vectors
            .write()
            .insert(vector_key("vid", 0), vector("vid", 0, vec![1.0]));

        assert!(store.delete_video("vid").await.is_err());
        assert_eq!(store.count("vid").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_json_file_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("data").join("vectors.json");

        let store = InMemoryVectorStore::open(path.clone()).await.unwrap();
        store
            .upsert(&[vector("vid", 0, vec![1.0, 0.0]), vector("vid", 1, vec![0.0, 1.0])])
            .await
            .unwrap();

        let reopened = InMemoryVectorStore::open(path).await.unwrap();
        assert_eq!(reopened.provider_name(), "json-file");
        assert_eq!(reopened.count("vid").await.unwrap(), 2);
    }

    #[test]
    fn test_provider_from_path() {
        assert!(matches!(
            VectorStoreProvider::from_path(None),
            VectorStoreProvider::InMemory
        ));
        assert!(matches!(
            VectorStoreProvider::from_path(Some("./data/v.json")),
            VectorStoreProvider::JsonFile { .. }
        ));
    }
}
