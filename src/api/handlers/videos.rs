//! Video loading and library handlers.

use crate::{
    AppState,
    api::extract::{JsonBody, PathParam},
    types::{
        AppError, ProgressUpdateRequest, Result, StatusResponse, Video, VideoDetails,
        VideoLoadRequest, VideoResponse, VideoSummary,
    },
};
use axum::{Json, extract::State};

/// Load a YouTube video: fetch captions, chunk, embed and index them.
///
/// Loading an already stored video returns it without fetching again.
#[utoipa::path(
    post,
    path = "/api/video/load",
    request_body = VideoLoadRequest,
    responses(
        (status = 200, description = "Video loaded", body = VideoResponse),
        (status = 400, description = "Invalid URL or no captions"),
        (status = 500, description = "Extraction, embedding or storage failure")
    ),
    tag = "videos"
)]
pub async fn load_video(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<VideoLoadRequest>,
) -> Result<Json<VideoResponse>> {
    let video = state.ingestor().load(&payload.url).await?;
    Ok(Json(video))
}

/// Get a stored video with its transcript and chunk count.
#[utoipa::path(
    get,
    path = "/api/video/{id}",
    params(
        ("id" = String, Path, description = "Video ID")
    ),
    responses(
        (status = 200, description = "Video details", body = VideoDetails),
        (status = 404, description = "Video not found")
    ),
    tag = "videos"
)]
pub async fn get_video(
    State(state): State<AppState>,
    PathParam(id): PathParam<String>,
) -> Result<Json<VideoDetails>> {
    let video = find_video(&state, &id).await?;
    let chunk_count = state.db.count_chunks(&video.id).await?;
    Ok(Json(VideoDetails { video, chunk_count }))
}

/// List all loaded videos, most recent first.
#[utoipa::path(
    get,
    path = "/api/videos",
    responses(
        (status = 200, description = "Loaded videos", body = Vec<VideoSummary>)
    ),
    tag = "videos"
)]
pub async fn list_videos(State(state): State<AppState>) -> Result<Json<Vec<VideoSummary>>> {
    Ok(Json(state.db.list_videos().await?))
}

/// Record how far the video has been watched.
#[utoipa::path(
    put,
    path = "/api/video/{id}/progress",
    params(
        ("id" = String, Path, description = "Video ID")
    ),
    request_body = ProgressUpdateRequest,
    responses(
        (status = 200, description = "Updated video", body = Video),
        (status = 400, description = "Negative duration"),
        (status = 404, description = "Video not found")
    ),
    tag = "videos"
)]
pub async fn update_progress(
    State(state): State<AppState>,
    PathParam(id): PathParam<String>,
    JsonBody(payload): JsonBody<ProgressUpdateRequest>,
) -> Result<Json<Video>> {
    if payload.watched_duration < 0 {
        return Err(AppError::InvalidInput(
            "watched_duration must not be negative".to_string(),
        ));
    }

    state
        .db
        .update_watched_duration(&id, payload.watched_duration)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Video not found".to_string()))
}

/// Delete a video together with its chunks, vectors, chat log and notes.
#[utoipa::path(
    delete,
    path = "/api/video/{id}",
    params(
        ("id" = String, Path, description = "Video ID")
    ),
    responses(
        (status = 200, description = "Video deleted", body = StatusResponse),
        (status = 404, description = "Video not found")
    ),
    tag = "videos"
)]
pub async fn delete_video(
    State(state): State<AppState>,
    PathParam(id): PathParam<String>,
) -> Result<Json<StatusResponse>> {
    if !state.db.delete_video(&id).await? {
        return Err(AppError::NotFound("Video not found".to_string()));
    }
    let removed = state.vector_store.delete_video(&id).await?;
    tracing::info!(video_id = %id, vectors = removed, "Video deleted");

    Ok(Json(StatusResponse::new("deleted")))
}

pub(crate) async fn find_video(state: &AppState, id: &str) -> Result<Video> {
    state
        .db
        .get_video(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Video not found".to_string()))
}
