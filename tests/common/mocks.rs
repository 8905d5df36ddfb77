//! Mock implementations for testing.
//!
//! Chat, embedding, caption and vector-store doubles shared by the
//! integration tests. None of them touch the network.

use async_trait::async_trait;
use grasp::db::{ChunkVector, VectorMatch, VectorStore};
use grasp::llm::{LLMClient, LLMClientFactoryTrait, ProviderKind};
use grasp::rag::Embedder;
use grasp::types::{AppError, Result};
use grasp::youtube::{VideoData, VideoSource};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Mock chat client that returns a fixed answer and records every
/// message list it was sent.
#[derive(Clone)]
pub struct MockLLMClient {
    response: String,
    should_fail: bool,
    calls: Arc<Mutex<Vec<Vec<(String, String)>>>>,
}

impl MockLLMClient {
    /// Create a new mock client that returns the given response.
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            should_fail: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock client that always returns an error.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::new("")
        }
    }

    /// Message lists received so far, oldest call first
    pub fn calls(&self) -> Vec<Vec<(String, String)>> {
        self.calls.lock().clone()
    }

    pub fn last_call(&self) -> Option<Vec<(String, String)>> {
        self.calls.lock().last().cloned()
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate_with_history(&self, messages: &[(String, String)]) -> Result<String> {
        self.calls.lock().push(messages.to_vec());
        if self.should_fail {
            return Err(AppError::LLM(
                "Anthropic API error: rate limit exceeded, try again later".to_string(),
            ));
        }
        Ok(self.response.clone())
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Factory handing out clones of one [`MockLLMClient`].
pub struct MockLLMFactory {
    client: MockLLMClient,
    default: ProviderKind,
    configured: Vec<ProviderKind>,
    requested: Mutex<Vec<ProviderKind>>,
}

impl MockLLMFactory {
    /// All three providers configured, OpenAI as default
    pub fn new(client: MockLLMClient) -> Self {
        Self::with_providers(client, ProviderKind::OpenAI, ProviderKind::ALL.to_vec())
    }

    pub fn with_providers(
        client: MockLLMClient,
        default: ProviderKind,
        configured: Vec<ProviderKind>,
    ) -> Self {
        Self {
            client,
            default,
            configured,
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Providers asked for, in order
    pub fn requested(&self) -> Vec<ProviderKind> {
        self.requested.lock().clone()
    }
}

impl LLMClientFactoryTrait for MockLLMFactory {
    fn default_provider(&self) -> ProviderKind {
        self.default
    }

    fn create_for(&self, kind: ProviderKind) -> Result<Box<dyn LLMClient>> {
        self.requested.lock().push(kind);
        if !self.configured.contains(&kind) {
            return Err(AppError::InvalidInput(format!(
                "Provider '{}' is not configured on this server",
                kind
            )));
        }
        Ok(Box::new(self.client.clone()))
    }
}

/// Bag-of-words embedder over a fixed vocabulary. Each vocabulary word
/// owns one dimension; every other word is ignored.
pub struct MockEmbedder {
    vocabulary: Vec<String>,
    should_fail: bool,
    calls: AtomicUsize,
}

impl MockEmbedder {
    pub fn new(vocabulary: &[&str]) -> Self {
        Self {
            vocabulary: vocabulary.iter().map(|w| w.to_lowercase()).collect(),
            should_fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::new(&[])
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.vocabulary.len().max(1)];
        for word in text.split_whitespace() {
            let word: String = word
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase();
            if let Some(dim) = self.vocabulary.iter().position(|v| *v == word) {
                vector[dim] += 1.0;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(AppError::LLM(
                "Embeddings API error: authentication failed, check the configured API key"
                    .to_string(),
            ));
        }
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn model_name(&self) -> &str {
        "mock-embedding"
    }
}

/// Video source backed by a map of canned videos. Unknown ids behave like
/// a video without captions.
#[derive(Default)]
pub struct MockVideoSource {
    videos: HashMap<String, VideoData>,
    fetches: AtomicUsize,
}

impl MockVideoSource {
    pub fn new(videos: Vec<VideoData>) -> Self {
        Self {
            videos: videos
                .into_iter()
                .map(|v| (v.youtube_id.clone(), v))
                .collect(),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoSource for MockVideoSource {
    async fn fetch(&self, youtube_id: &str) -> Result<VideoData> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.videos.get(youtube_id).cloned().ok_or_else(|| {
            AppError::InvalidInput("No captions available for this video".to_string())
        })
    }
}

/// Vector store whose writes always fail
pub struct FailingVectorStore;

#[async_trait]
impl VectorStore for FailingVectorStore {
    fn provider_name(&self) -> &'static str {
        "failing"
    }

    async fn upsert(&self, _vectors: &[ChunkVector]) -> Result<usize> {
        Err(AppError::Database("vector index unavailable".to_string()))
    }

    async fn search(
        &self,
        _video_id: &str,
        _embedding: &[f32],
        _limit: usize,
    ) -> Result<Vec<VectorMatch>> {
        Ok(Vec::new())
    }

    async fn delete_video(&self, _video_id: &str) -> Result<usize> {
        Ok(0)
    }

    async fn count(&self, _video_id: &str) -> Result<usize> {
        Ok(0)
    }
}
