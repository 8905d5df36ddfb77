//! Note CRUD handlers.
//!
//! Notes are keyed by video id but don't require the video to be loaded.

use crate::{
    AppState,
    api::extract::{JsonBody, PathParam},
    types::{AppError, Note, NoteCreateRequest, NoteUpdateRequest, Result, StatusResponse},
};
use axum::{Json, extract::State};

fn validate_timestamp(timestamp: f64) -> Result<()> {
    if !timestamp.is_finite() || timestamp < 0.0 {
        return Err(AppError::InvalidInput(
            "timestamp must be a non-negative number of seconds".to_string(),
        ));
    }
    Ok(())
}

/// Create a note at a playback position.
#[utoipa::path(
    post,
    path = "/api/notes",
    request_body = NoteCreateRequest,
    responses(
        (status = 200, description = "Note created", body = Note),
        (status = 400, description = "Invalid input")
    ),
    tag = "notes"
)]
pub async fn create_note(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<NoteCreateRequest>,
) -> Result<Json<Note>> {
    if payload.video_id.trim().is_empty() {
        return Err(AppError::InvalidInput("video_id is required".to_string()));
    }
    validate_timestamp(payload.timestamp)?;

    let note = state
        .db
        .create_note(
            &payload.video_id,
            payload.timestamp,
            &payload.content,
            &payload.tags,
        )
        .await?;
    Ok(Json(note))
}

/// Notes of a video ordered by timestamp.
#[utoipa::path(
    get,
    path = "/api/notes/{video_id}",
    params(
        ("video_id" = String, Path, description = "Video ID")
    ),
    responses(
        (status = 200, description = "Notes, earliest timestamp first", body = Vec<Note>)
    ),
    tag = "notes"
)]
pub async fn list_notes(
    State(state): State<AppState>,
    PathParam(video_id): PathParam<String>,
) -> Result<Json<Vec<Note>>> {
    Ok(Json(state.db.list_notes(&video_id).await?))
}

/// Update a note's content and/or tags.
#[utoipa::path(
    put,
    path = "/api/notes/{id}",
    params(
        ("id" = i64, Path, description = "Note ID")
    ),
    request_body = NoteUpdateRequest,
    responses(
        (status = 200, description = "Updated note", body = Note),
        (status = 404, description = "Note not found")
    ),
    tag = "notes"
)]
pub async fn update_note(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
    JsonBody(payload): JsonBody<NoteUpdateRequest>,
) -> Result<Json<Note>> {
    state
        .db
        .update_note(id, &payload)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Note not found".to_string()))
}

/// Delete a note.
#[utoipa::path(
    delete,
    path = "/api/notes/{id}",
    params(
        ("id" = i64, Path, description = "Note ID")
    ),
    responses(
        (status = 200, description = "Note deleted", body = StatusResponse),
        (status = 404, description = "Note not found")
    ),
    tag = "notes"
)]
pub async fn delete_note(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<StatusResponse>> {
    if !state.db.delete_note(id).await? {
        return Err(AppError::NotFound("Note not found".to_string()));
    }
    Ok(Json(StatusResponse::new("deleted")))
}
