use crate::{
    AppState,
    api::extract::{JsonBody, PathParam},
    types::{ChatMessageRequest, ChatMessageResponse, Result, StoredMessage},
};
use axum::{Json, extract::State};

/// Ask a question about a video
///
/// Context is the top-K most similar chunks plus the chunks around
/// `current_timestamp`. Both messages are logged only if the provider
/// answers.
#[utoipa::path(
    post,
    path = "/api/chat/message",
    request_body = ChatMessageRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ChatMessageResponse),
        (status = 400, description = "Invalid input or unconfigured provider"),
        (status = 404, description = "Video not found"),
        (status = 500, description = "Provider failure (rate limit, auth, network)")
    ),
    tag = "chat"
)]
pub async fn send_message(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<ChatMessageRequest>,
) -> Result<Json<ChatMessageResponse>> {
    let response = state.responder().answer(&payload).await?;
    Ok(Json(response))
}

/// Chat log of a video in creation order
#[utoipa::path(
    get,
    path = "/api/chat/history/{video_id}",
    params(
        ("video_id" = String, Path, description = "Video ID")
    ),
    responses(
        (status = 200, description = "Messages, oldest first", body = Vec<StoredMessage>)
    ),
    tag = "chat"
)]
pub async fn get_history(
    State(state): State<AppState>,
    PathParam(video_id): PathParam<String>,
) -> Result<Json<Vec<StoredMessage>>> {
    Ok(Json(state.db.get_messages(&video_id).await?))
}
