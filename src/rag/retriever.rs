//! Context assembly for chat.
//!
//! The context handed to the model is the union of
//! 1. the `top_k` chunks most similar to the question, and
//! 2. every chunk whose time range intersects `[t - window, t + window]`
//!    around the current playback position `t` (clamped at zero).
//!
//! Similarity hits come first in rank order; window-only chunks follow in
//! `chunk_index` order. A chunk never appears twice.

use crate::db::vectorstore::{VectorMatch, VectorStore};
use crate::rag::embeddings::Embedder;
use crate::types::{Chunk, ContextChunk, Result};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub struct ContextRetriever {
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
    top_k: usize,
    window_secs: f64,
}

impl ContextRetriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
        top_k: usize,
        window_secs: f64,
    ) -> Self {
        Self {
            embedder,
            vector_store,
            top_k,
            window_secs,
        }
    }

    /// Retrieve context for `question` from the given chunks of one video
    pub async fn retrieve(
        &self,
        video_id: &str,
        chunks: &[Chunk],
        question: &str,
        timestamp: f64,
    ) -> Result<Vec<ContextChunk>> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let query = self.embedder.embed_one(question).await?;
        let matches = self
            .vector_store
            .search(video_id, &query, self.top_k)
            .await?;

        let context = assemble_context(chunks, &matches, timestamp, self.window_secs);
        tracing::debug!(
            video_id,
            similar = matches.len(),
            total = context.len(),
            "Assembled chat context"
        );
        Ok(context)
    }
}

/// Whether a chunk's time range intersects the window around `timestamp`
pub fn in_window(chunk: &Chunk, timestamp: f64, window_secs: f64) -> bool {
    let lower = (timestamp - window_secs).max(0.0);
    let upper = timestamp + window_secs;
    chunk.start_time <= upper && chunk.end_time >= lower
}

/// Merge similarity hits with the playback window. Matches that don't
/// resolve to a known chunk are ignored.
pub fn assemble_context(
    chunks: &[Chunk],
    matches: &[VectorMatch],
    timestamp: f64,
    window_secs: f64,
) -> Vec<ContextChunk> {
    let by_index: HashMap<i64, &Chunk> = chunks.iter().map(|c| (c.chunk_index, c)).collect();

    let mut ranked: Vec<&VectorMatch> = matches.iter().collect();
    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.chunk_index.cmp(&b.chunk_index))
    });

    let mut seen = HashSet::new();
    let mut context = Vec::new();

    for hit in ranked {
        if let Some(chunk) = by_index.get(&hit.chunk_index)
            && seen.insert(chunk.id)
        {
            context.push(to_context(chunk, Some(hit.score)));
        }
    }

    let mut window: Vec<&Chunk> = chunks
        .iter()
        .filter(|c| in_window(c, timestamp, window_secs))
        .collect();
    window.sort_by_key(|c| c.chunk_index);

    for chunk in window {
        if seen.insert(chunk.id) {
            context.push(to_context(chunk, None));
        }
    }

    context
}

fn to_context(chunk: &Chunk, score: Option<f32>) -> ContextChunk {
    ContextChunk {
        id: chunk.id,
        chunk_index: chunk.chunk_index,
        start_time: chunk.start_time,
        end_time: chunk.end_time,
        text: chunk.text.clone(),
        score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Ten one-minute chunks: chunk i covers [60i, 60(i+1)]
    fn chunks() -> Vec<Chunk> {
        (0..10)
            .map(|i| Chunk {
                id: 100 + i,
                video_id: "vid".to_string(),
                chunk_index: i,
                start_time: i as f64 * 60.0,
                end_time: (i + 1) as f64 * 60.0,
                text: format!("chunk {}", i),
            })
            .collect()
    }

    fn hit(chunk_index: i64, score: f32) -> VectorMatch {
        VectorMatch {
            video_id: "vid".to_string(),
            chunk_index,
            score,
        }
    }

    fn indices(context: &[ContextChunk]) -> Vec<i64> {
        context.iter().map(|c| c.chunk_index).collect()
    }

    #[test]
    fn test_window_only() {
        // t = 300 -> [180, 420]; touching boundaries count, so 2 and 7 are in
        let context = assemble_context(&chunks(), &[], 300.0, 120.0);
        assert_eq!(indices(&context), vec![2, 3, 4, 5, 6, 7]);
        assert!(context.iter().all(|c| c.score.is_none()));
    }

    #[test]
    fn test_window_clamped_at_zero() {
        let context = assemble_context(&chunks(), &[], 30.0, 120.0);
        assert_eq!(indices(&context), vec![0, 1, 2]);
    }

    #[test]
    fn test_similarity_first_then_window() {
        let matches = vec![hit(9, 0.4), hit(0, 0.9), hit(5, 0.7)];
        let context = assemble_context(&chunks(), &matches, 300.0, 60.0);

        // hits by score, then the window [240, 360] minus chunk 5
        assert_eq!(indices(&context), vec![0, 5, 9, 3, 4, 6]);
        assert_eq!(context[0].score, Some(0.9));
        assert_eq!(context[3].score, None);
    }

    #[test]
    fn test_union_has_no_duplicates() {
        let matches = vec![hit(4, 0.8), hit(5, 0.8)];
        let context = assemble_context(&chunks(), &matches, 300.0, 60.0);

        let ids: Vec<i64> = context.iter().map(|c| c.id).collect();
        let unique: HashSet<i64> = ids.iter().copied().collect();
        assert_eq!(ids.len(), unique.len());
        // equal scores keep chunk order
        assert_eq!(indices(&context)[..2], [4, 5]);
    }

    #[test]
    fn test_unknown_match_ignored() {
        let context = assemble_context(&chunks(), &[hit(42, 1.0)], 10_000.0, 10.0);
        assert!(context.is_empty());
    }

    #[test]
    fn test_deterministic() {
        let matches = vec![hit(2, 0.5), hit(7, 0.5), hit(1, 0.6)];
        let first = assemble_context(&chunks(), &matches, 200.0, 120.0);
        for _ in 0..5 {
            assert_eq!(assemble_context(&chunks(), &matches, 200.0, 120.0), first);
        }
    }
}
