use crate::api::handlers::{chat, notes, videos};
use crate::llm::ProviderKind;
use crate::types::{
    ChatMessageRequest, ChatMessageResponse, Chunk, ContextChunk, MessageRole, Note,
    NoteCreateRequest, NoteUpdateRequest, ProgressUpdateRequest, StatusResponse, StoredMessage,
    Video, VideoDetails, VideoLoadRequest, VideoResponse, VideoSummary,
};
use axum::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Grasp API",
        description = "YouTube transcripts, timestamp-aware RAG chat and notes"
    ),
    paths(
        health,
        videos::load_video,
        videos::get_video,
        videos::list_videos,
        videos::update_progress,
        videos::delete_video,
        chat::send_message,
        chat::get_history,
        notes::create_note,
        notes::list_notes,
        notes::update_note,
        notes::delete_note,
    ),
    components(schemas(
        Video,
        VideoDetails,
        VideoLoadRequest,
        VideoResponse,
        VideoSummary,
        ProgressUpdateRequest,
        Chunk,
        ChatMessageRequest,
        ChatMessageResponse,
        ContextChunk,
        MessageRole,
        StoredMessage,
        ProviderKind,
        Note,
        NoteCreateRequest,
        NoteUpdateRequest,
        StatusResponse,
    )),
    tags(
        (name = "videos", description = "Loading and managing videos"),
        (name = "chat", description = "Questions about the current video"),
        (name = "notes", description = "Timestamped notes"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

/// Liveness probe used by the UI's connection indicator
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Server is up", body = StatusResponse)
    ),
    tag = "health"
)]
pub async fn health() -> Json<StatusResponse> {
    Json(StatusResponse::new("healthy"))
}

/// Generated OpenAPI document
pub async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
