use crate::types::TranscriptSegment;

/// A run of consecutive caption segments, sized for embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptChunk {
    pub chunk_index: usize,
    /// Start of the first segment, in seconds
    pub start_time: f64,
    /// End of the last segment, in seconds
    pub end_time: f64,
    pub text: String,
}

/// Rough token count: words × 1.3, rounded up
pub fn estimate_tokens(text: &str) -> usize {
    let words = text.split_whitespace().count();
    (words as f64 * 1.3).ceil() as usize
}

/// Groups timed caption segments into chunks of roughly
/// `min_tokens..=max_tokens` estimated tokens.
///
/// Segments are never split and never reordered; every non-blank segment
/// ends up in exactly one chunk. A chunk ends no later than the next one
/// starts.
pub struct TranscriptChunker {
    min_tokens: usize,
    max_tokens: usize,
}

impl Default for TranscriptChunker {
    fn default() -> Self {
        Self::new(500, 1000)
    }
}

impl TranscriptChunker {
    pub fn new(min_tokens: usize, max_tokens: usize) -> Self {
        Self {
            min_tokens: min_tokens.max(1),
            max_tokens: max_tokens.max(min_tokens.max(1)),
        }
    }

    pub fn chunk(&self, segments: &[TranscriptSegment]) -> Vec<TranscriptChunk> {
        let mut chunks = Vec::new();
        let mut open: Option<OpenChunk> = None;

        for segment in segments {
            let text = segment.text.trim();
            if text.is_empty() {
                continue;
            }
            let tokens = estimate_tokens(text);
            let end = segment.start + segment.duration.max(0.0);

            // Close first rather than overflow
            if open
                .as_ref()
                .is_some_and(|current| current.tokens + tokens > self.max_tokens)
                && let Some(current) = open.take()
            {
                chunks.push(current.finish(chunks.len()));
            }

            let current = open.get_or_insert_with(|| OpenChunk {
                start_time: segment.start,
                end_time: end,
                parts: Vec::new(),
                tokens: 0,
            });
            current.parts.push(text.to_string());
            current.tokens += tokens;
            current.end_time = current.end_time.max(end);

            if current.tokens >= self.min_tokens
                && let Some(current) = open.take()
            {
                chunks.push(current.finish(chunks.len()));
            }
        }

        if let Some(current) = open {
            chunks.push(current.finish(chunks.len()));
        }

        // Caption events often run past the start of the next one
        for i in 1..chunks.len() {
            let next_start = chunks[i].start_time;
            let previous = &mut chunks[i - 1];
            previous.end_time = previous.end_time.min(next_start);
        }

        chunks
    }
}

struct OpenChunk {
    start_time: f64,
    end_time: f64,
    parts: Vec<String>,
    tokens: usize,
}

impl OpenChunk {
    fn finish(self, chunk_index: usize) -> TranscriptChunk {
        TranscriptChunk {
            chunk_index,
            start_time: self.start_time,
            end_time: self.end_time,
            text: self.parts.join(" "),
        }
    }
}
