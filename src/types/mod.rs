use crate::llm::ProviderKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

// ============= Domain Types =============

/// A loaded YouTube video. Only `watched_duration` changes after creation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Video {
    pub id: String,
    pub youtube_id: String,
    pub title: String,
    /// Length in seconds
    pub duration: i64,
    pub transcript: String,
    pub processed_at: String,
    /// Furthest playback position reported by the player, in seconds
    pub watched_duration: i64,
}

/// A stored transcript chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Chunk {
    pub id: i64,
    pub video_id: String,
    pub chunk_index: i64,
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
}

/// One timed caption line, as delivered by the caption track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub text: String,
    /// Offset from the start of the video, in seconds
    pub start: f64,
    /// Seconds
    pub duration: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(AppError::Database(format!("Unknown message role: {}", other))),
        }
    }
}

/// An entry of the append-only chat log.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StoredMessage {
    pub id: i64,
    pub video_id: String,
    pub role: MessageRole,
    pub content: String,
    /// Playback position (seconds) when the question was sent
    pub timestamp: f64,
    /// Ids of the chunks that were given to the model
    pub context_chunks: Vec<i64>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Note {
    pub id: i64,
    pub video_id: String,
    pub timestamp: f64,
    pub content: String,
    pub tags: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

// ============= API Request/Response Types =============

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VideoLoadRequest {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VideoResponse {
    pub id: String,
    pub youtube_id: String,
    pub title: String,
    pub duration: i64,
    pub chunk_count: usize,
}

/// Full video record returned by `GET /api/video/{id}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VideoDetails {
    #[serde(flatten)]
    pub video: Video,
    pub chunk_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VideoSummary {
    pub id: String,
    pub youtube_id: String,
    pub title: String,
    pub duration: i64,
    pub processed_at: String,
    pub watched_duration: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProgressUpdateRequest {
    pub watched_duration: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChatMessageRequest {
    pub video_id: String,
    pub message: String,
    /// Playback position in seconds; defaults to 0
    #[serde(default)]
    pub current_timestamp: Option<f64>,
    /// Overrides the configured default provider for this message
    #[serde(default)]
    pub provider: Option<ProviderKind>,
}

/// A transcript chunk handed to the model, with its similarity score when it
/// came from the vector search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ContextChunk {
    pub id: i64,
    pub chunk_index: i64,
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChatMessageResponse {
    pub role: MessageRole,
    pub content: String,
    pub context_chunks: Vec<ContextChunk>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NoteCreateRequest {
    pub video_id: String,
    pub timestamp: f64,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct NoteUpdateRequest {
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn new(status: &str) -> Self {
        Self {
            status: status.to_string(),
        }
    }
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::Database(msg) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::LLM(msg) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (axum::http::StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (axum::http::StatusCode::BAD_REQUEST, msg),
            AppError::Configuration(msg) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Internal(msg) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        if status.is_server_error() {
            tracing::error!(status = %status, "{}", message);
        }

        let body = serde_json::json!({
            "detail": message
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<axum::extract::rejection::PathRejection> for AppError {
    fn from(rejection: axum::extract::rejection::PathRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
