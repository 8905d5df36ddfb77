//! Shared fixtures for the integration tests.
#![allow(dead_code)]

pub mod mocks;

use grasp::db::{InMemoryVectorStore, VectorStore};
use grasp::types::TranscriptSegment;
use grasp::youtube::VideoData;
use grasp::{AppState, GraspConfig, GraspConfigManager, GraspDb};
use mocks::{MockEmbedder, MockLLMClient, MockLLMFactory, MockVideoSource};
use std::sync::Arc;

pub const VIDEO_ID: &str = "dQw4w9WgXcQ";
pub const VIDEO_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
pub const VIDEO_TITLE: &str = "Cell Biology 101";

/// One topic word per minute of the lecture
pub const TOPICS: [&str; 10] = [
    "introduction",
    "photosynthesis",
    "chlorophyll",
    "mitochondria",
    "respiration",
    "enzymes",
    "genetics",
    "evolution",
    "ecology",
    "summary",
];

/// Ten one-minute caption segments, one topic each
pub fn lecture_video() -> VideoData {
    let segments = TOPICS
        .iter()
        .enumerate()
        .map(|(i, topic)| TranscriptSegment {
            text: format!("{topic} explained in detail"),
            start: i as f64 * 60.0,
            duration: 60.0,
        })
        .collect();

    VideoData {
        youtube_id: VIDEO_ID.to_string(),
        title: VIDEO_TITLE.to_string(),
        duration: 600,
        segments,
    }
}

/// Every caption segment becomes its own chunk: each is 4 words, i.e.
/// 6 estimated tokens, which reaches `min_chunk_tokens` on its own.
pub fn test_config() -> GraspConfig {
    let mut config = GraspConfig::default();
    config.rag.min_chunk_tokens = 5;
    config.rag.max_chunk_tokens = 10;
    config.rag.top_k = 2;
    config.rag.window_secs = 120.0;
    config.chat.history_messages = 4;
    config.vector_store.path = None;
    config
}

pub struct TestHarness {
    pub state: AppState,
    pub llm: MockLLMClient,
    pub factory: Arc<MockLLMFactory>,
    pub embedder: Arc<MockEmbedder>,
    pub source: Arc<MockVideoSource>,
}

pub async fn harness() -> TestHarness {
    harness_with(
        MockLLMClient::new("Photosynthesis turns light into sugar."),
        Arc::new(InMemoryVectorStore::new()),
    )
    .await
}

pub async fn harness_with(llm: MockLLMClient, vector_store: Arc<dyn VectorStore>) -> TestHarness {
    let factory = Arc::new(MockLLMFactory::new(llm.clone()));
    let embedder = Arc::new(MockEmbedder::new(&TOPICS));
    let source = Arc::new(MockVideoSource::new(vec![lecture_video()]));
    let db = Arc::new(GraspDb::new_memory().await.expect("in-memory database"));

    let state = AppState {
        config_manager: Arc::new(GraspConfigManager::from_config(test_config())),
        db,
        llm_factory: factory.clone(),
        embedder: embedder.clone(),
        vector_store,
        video_source: source.clone(),
    };

    TestHarness {
        state,
        llm,
        factory,
        embedder,
        source,
    }
}
