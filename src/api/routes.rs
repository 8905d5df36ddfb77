use crate::AppState;
use crate::api::handlers::{chat, health, notes, videos};
use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Routes mounted under `/api`
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/video/load", post(videos::load_video))
        .route(
            "/video/{id}",
            get(videos::get_video).delete(videos::delete_video),
        )
        .route("/video/{id}/progress", put(videos::update_progress))
        .route("/videos", get(videos::list_videos))
        .route("/chat/message", post(chat::send_message))
        .route("/chat/history/{video_id}", get(chat::get_history))
        .route("/notes", post(notes::create_note))
        // GET takes a video id, PUT/DELETE a note id
        .route(
            "/notes/{id}",
            get(notes::list_notes)
                .put(notes::update_note)
                .delete(notes::delete_note),
        )
}

/// The full application: health, OpenAPI document, `/api`, CORS and
/// request tracing
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/api-docs/openapi.json", get(health::openapi))
        .nest("/api", create_router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
