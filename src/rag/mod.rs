//! Retrieval Augmented Generation (RAG) Pipeline
//!
//! # Module Structure
//!
//! - [`chunker`] - Groups timed caption segments into token-bounded chunks
//! - [`embeddings`] - Embedding client (OpenAI-compatible `/embeddings`)
//! - [`ingest`] - Video load: captions → chunks → embeddings → storage
//! - [`retriever`] - Similarity top-K merged with the playback time window
//! - [`prompt`] - System prompt and transcript context rendering
//! - [`responder`] - Chat answer generation and message logging
//!
//! # RAG Pipeline
//!
//! 1. **Ingestion** - Captions are chunked and embedded
//! 2. **Storage** - Chunks go to SQLite, embeddings to the vector store
//! 3. **Retrieval** - Question embedded, similar chunks retrieved, window
//!    chunks around the playback position added
//! 4. **Generation** - The selected provider answers with that context

pub mod chunker;
pub mod embeddings;
pub mod ingest;
pub mod prompt;
pub mod responder;
pub mod retriever;

pub use chunker::{TranscriptChunk, TranscriptChunker};
pub use embeddings::{Embedder, OpenAIEmbedder};
pub use ingest::VideoIngestor;
pub use responder::ChatResponder;
pub use retriever::ContextRetriever;
