use super::captions::{VideoInfo, fetch_caption_segments, select_caption_url};
use super::{VideoData, VideoSource};
use crate::types::{AppError, Result};
use crate::utils::toml_config::YoutubeConfig;
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

/// Fetches metadata through the `yt-dlp` binary and captions over HTTP
pub struct YtDlpSource {
    ytdlp_path: String,
    caption_language: String,
    http: reqwest::Client,
}

impl YtDlpSource {
    pub fn new(ytdlp_path: impl Into<String>, caption_language: impl Into<String>) -> Self {
        Self {
            ytdlp_path: ytdlp_path.into(),
            caption_language: caption_language.into(),
            http: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &YoutubeConfig) -> Self {
        Self::new(config.ytdlp_path.clone(), config.caption_language.clone())
    }

    /// Run `yt-dlp --dump-single-json` for the video
    pub async fn fetch_info(&self, youtube_id: &str) -> Result<VideoInfo> {
        let url = format!("https://www.youtube.com/watch?v={}", youtube_id);
        debug!(ytdlp = %self.ytdlp_path, %url, "Running yt-dlp");

        let output = Command::new(&self.ytdlp_path)
            .args([
                "--dump-single-json",
                "--skip-download",
                "--no-warnings",
                "--no-playlist",
            ])
            .arg(&url)
            .output()
            .await
            .map_err(|e| {
                AppError::Internal(format!("Failed to run {}: {}", self.ytdlp_path, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::InvalidInput(format!(
                "Could not extract video data: {}",
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| AppError::Internal(format!("Unexpected yt-dlp output: {}", e)))
    }

    /// Resolve metadata and download the caption track
    pub async fn video_data(&self, youtube_id: &str, info: VideoInfo) -> Result<VideoData> {
        let caption_url = select_caption_url(&info, &self.caption_language).ok_or_else(|| {
            AppError::InvalidInput(format!(
                "No '{}' captions available for video {}",
                self.caption_language, youtube_id
            ))
        })?;

        let segments = fetch_caption_segments(&self.http, &caption_url).await?;
        if segments.is_empty() {
            return Err(AppError::InvalidInput(format!(
                "Caption track for video {} is empty",
                youtube_id
            )));
        }

        let duration = info
            .duration
            .map(|d| d.round() as i64)
            .unwrap_or_else(|| {
                segments
                    .last()
                    .map(|s| (s.start + s.duration).round() as i64)
                    .unwrap_or(0)
            });

        info!(
            youtube_id,
            segments = segments.len(),
            duration,
            "Captions fetched"
        );

        Ok(VideoData {
            youtube_id: youtube_id.to_string(),
            title: info.title.unwrap_or_else(|| "Unknown Title".to_string()),
            duration,
            segments,
        })
    }
}

#[async_trait]
impl VideoSource for YtDlpSource {
    async fn fetch(&self, youtube_id: &str) -> Result<VideoData> {
        let info = self.fetch_info(youtube_id).await?;
        self.video_data(youtube_id, info).await
    }
}
