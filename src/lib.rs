//! # Grasp - learning companion server
//!
//! Backend for watching a YouTube lecture next to an AI tutor and a notes
//! panel. It loads a video's captions, chunks and embeds them, and answers
//! questions with context drawn both from similarity search and from the
//! part of the video around the current playback position.
//!
//! ## Overview
//!
//! Grasp can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `grasp-server` binary
//! 2. **As a library** - Assemble [`AppState`] yourself and mount
//!    [`api::routes::create_app`]
//!
//! ### Basic Example
//!
//! ```rust,ignore
//! use grasp::{AppState, GraspConfigManager};
//! use std::sync::Arc;
//!
//! let config_manager = Arc::new(GraspConfigManager::new("grasp.toml")?);
//! let state = AppState::from_config(config_manager).await?;
//! let app = grasp::api::routes::create_app(state);
//! ```
//!
//! ## Modules
//!
//! - [`api`] - REST API handlers and routes
//! - [`db`] - SQLite storage and the chunk vector index
//! - [`llm`] - OpenAI, Anthropic and Gemini chat clients
//! - [`rag`] - Chunking, embeddings, retrieval, ingestion and answering
//! - [`youtube`] - Video id parsing, yt-dlp metadata and captions
//! - [`types`] - Domain types, request/response bodies and errors
//! - [`utils`] - TOML configuration with hot reload
//!
//! `grasp.toml` is hot-reloaded: provider, retrieval and history settings
//! apply to the next request.

#![warn(rustdoc::missing_crate_level_docs)]

/// HTTP API handlers and routes.
pub mod api;
/// Command-line interface.
pub mod cli;
/// SQLite storage and vector store.
pub mod db;
/// LLM provider clients and abstractions.
pub mod llm;
/// Retrieval Augmented Generation (RAG) components.
pub mod rag;
/// Core types (requests, responses, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;
/// YouTube metadata and caption extraction.
pub mod youtube;

// Re-export commonly used types
pub use db::{GraspDb, VectorStore, VectorStoreProvider};
pub use llm::{ConfigBasedLLMFactory, LLMClient, LLMClientFactoryTrait, Provider, ProviderKind};
pub use rag::{ChatResponder, ContextRetriever, Embedder, OpenAIEmbedder, VideoIngestor};
pub use types::{AppError, Result};
pub use utils::toml_config::{GraspConfig, GraspConfigManager};
pub use youtube::{VideoSource, YtDlpSource};

use crate::rag::TranscriptChunker;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// TOML-based configuration with hot-reload support
    pub config_manager: Arc<GraspConfigManager>,
    /// Videos, chunks, chat log and notes
    pub db: Arc<GraspDb>,
    /// Chat client factory
    pub llm_factory: Arc<dyn LLMClientFactoryTrait>,
    /// Embeds chunks and questions
    pub embedder: Arc<dyn Embedder>,
    /// Chunk embedding index
    pub vector_store: Arc<dyn VectorStore>,
    /// Video metadata and captions
    pub video_source: Arc<dyn VideoSource>,
}

impl AppState {
    /// Build the production state: database file, vector index, hosted
    /// providers and yt-dlp, all from the current configuration.
    pub async fn from_config(config_manager: Arc<GraspConfigManager>) -> Result<Self> {
        let config = config_manager.config();

        let db = Arc::new(GraspDb::new_local(&config.database.url).await?);
        let vector_store = VectorStoreProvider::from_path(config.vector_store.path.as_deref())
            .create_store()
            .await?;
        let embedder: Arc<dyn Embedder> =
            Arc::new(OpenAIEmbedder::from_config(&config.embeddings)?);
        let video_source: Arc<dyn VideoSource> =
            Arc::new(YtDlpSource::from_config(&config.youtube));
        let llm_factory: Arc<dyn LLMClientFactoryTrait> =
            Arc::new(ConfigBasedLLMFactory::new(config_manager.clone()));

        Ok(Self {
            config_manager,
            db,
            llm_factory,
            embedder,
            vector_store,
            video_source,
        })
    }

    /// Video loader using the current chunking settings
    pub fn ingestor(&self) -> VideoIngestor {
        let config = self.config_manager.config();
        VideoIngestor::new(
            self.db.clone(),
            self.video_source.clone(),
            self.embedder.clone(),
            self.vector_store.clone(),
            TranscriptChunker::new(config.rag.min_chunk_tokens, config.rag.max_chunk_tokens),
        )
    }

    /// Chat responder using the current retrieval and history settings
    pub fn responder(&self) -> ChatResponder {
        let config = self.config_manager.config();
        let retriever = ContextRetriever::new(
            self.embedder.clone(),
            self.vector_store.clone(),
            config.rag.top_k,
            config.rag.window_secs,
        );
        ChatResponder::new(
            self.db.clone(),
            self.llm_factory.clone(),
            retriever,
            config.chat.history_messages,
        )
    }
}
