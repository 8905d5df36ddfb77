//! YouTube video metadata and captions.
//!
//! [`VideoSource`] is the seam the ingestor talks to; [`YtDlpSource`]
//! implements it with the `yt-dlp` binary plus a caption download.

pub mod captions;
pub mod ytdlp;

use crate::types::{Result, TranscriptSegment};
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

pub use ytdlp::YtDlpSource;

static YOUTUBE_ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"youtube\.com/watch\?(?:[^#]*&)?v=([A-Za-z0-9_-]+)",
        r"youtu\.be/([A-Za-z0-9_-]+)",
        r"youtube\.com/embed/([A-Za-z0-9_-]+)",
        r"youtube\.com/shorts/([A-Za-z0-9_-]+)",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Pull the video id out of a YouTube URL.
///
/// Accepts `watch?v=`, `youtu.be/`, `embed/` and `shorts/` links, with or
/// without scheme and subdomain. Trailing query parameters are ignored.
pub fn extract_youtube_id(url: &str) -> Option<String> {
    let url = url.trim();
    YOUTUBE_ID_PATTERNS
        .iter()
        .find_map(|re| re.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Everything needed to index a video
#[derive(Debug, Clone, PartialEq)]
pub struct VideoData {
    pub youtube_id: String,
    pub title: String,
    /// Seconds
    pub duration: i64,
    pub segments: Vec<TranscriptSegment>,
}

impl VideoData {
    /// Caption text joined into one transcript
    pub fn transcript_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Fetch metadata and timed captions. A video without usable captions
    /// is an `InvalidInput` error.
    async fn fetch(&self, youtube_id: &str) -> Result<VideoData>;
}
