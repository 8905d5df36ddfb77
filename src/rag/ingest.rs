use crate::db::vectorstore::{ChunkVector, VectorStore};
use crate::db::GraspDb;
use crate::rag::chunker::TranscriptChunker;
use crate::rag::embeddings::Embedder;
use crate::types::{AppError, Result, Video, VideoResponse};
use crate::youtube::{VideoSource, extract_youtube_id};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

/// Loads a YouTube video into the database and the vector index.
///
/// Steps: resolve the id, return early if the video is already stored,
/// fetch captions, chunk, embed, then store the video with its chunks and
/// index the vectors. Nothing is written until the embeddings are in hand;
/// if indexing fails the stored rows are removed again.
pub struct VideoIngestor {
    db: Arc<GraspDb>,
    source: Arc<dyn VideoSource>,
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
    chunker: TranscriptChunker,
}

impl VideoIngestor {
    pub fn new(
        db: Arc<GraspDb>,
        source: Arc<dyn VideoSource>,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
        chunker: TranscriptChunker,
    ) -> Self {
        Self {
            db,
            source,
            embedder,
            vector_store,
            chunker,
        }
    }

    pub async fn load(&self, url: &str) -> Result<VideoResponse> {
        let youtube_id = extract_youtube_id(url)
            .ok_or_else(|| AppError::InvalidInput("Invalid YouTube URL".to_string()))?;

        if let Some(existing) = self.db.get_video(&youtube_id).await? {
            let chunk_count = self.db.count_chunks(&existing.id).await?;
            info!(video_id = %existing.id, chunk_count, "Video already loaded");
            return Ok(response(&existing, chunk_count));
        }

        let data = self.source.fetch(&youtube_id).await?;
        let chunks = self.chunker.chunk(&data.segments);
        if chunks.is_empty() {
            return Err(AppError::InvalidInput(
                "Video transcript produced no chunks".to_string(),
            ));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(AppError::LLM(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let video = Video {
            id: youtube_id.clone(),
            youtube_id: youtube_id.clone(),
            title: data.title.clone(),
            duration: data.duration,
            transcript: data.transcript_text(),
            processed_at: Utc::now().to_rfc3339(),
            watched_duration: 0,
        };
        let stored = self.db.insert_video_with_chunks(&video, &chunks).await?;

        let vectors: Vec<ChunkVector> = stored
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| ChunkVector {
                video_id: video.id.clone(),
                chunk_index: chunk.chunk_index,
                embedding,
            })
            .collect();

        if let Err(e) = self.vector_store.upsert(&vectors).await {
            warn!(video_id = %video.id, "Indexing failed, removing stored video: {}", e);
            if let Err(cleanup) = self.db.delete_video(&video.id).await {
                warn!(video_id = %video.id, "Cleanup after failed indexing failed: {}", cleanup);
            }
            return Err(e);
        }

        info!(
            video_id = %video.id,
            title = %video.title,
            chunk_count = stored.len(),
            embedder = self.embedder.model_name(),
            "Video loaded"
        );

        Ok(response(&video, stored.len()))
    }
}

fn response(video: &Video, chunk_count: usize) -> VideoResponse {
    VideoResponse {
        id: video.id.clone(),
        youtube_id: video.youtube_id.clone(),
        title: video.title.clone(),
        duration: video.duration,
        chunk_count,
    }
}
