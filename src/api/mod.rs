//! HTTP API Handlers and Routes
//!
//! This module provides the REST API layer for Grasp, built on the Axum web framework.
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each endpoint
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//!
//! # API Endpoints
//!
//! ## Videos (`/api/video`, `/api/videos`)
//! - `POST /api/video/load` - Extract captions, chunk, embed and index a YouTube video
//! - `GET /api/video/{id}` - Get a video with transcript and chunk count
//! - `GET /api/videos` - List loaded videos, most recent first
//! - `PUT /api/video/{id}/progress` - Record watched duration
//! - `DELETE /api/video/{id}` - Delete a video and everything attached to it
//!
//! ## Chat (`/api/chat`)
//! - `POST /api/chat/message` - Ask a question with timestamp-aware context
//! - `GET /api/chat/history/{video_id}` - Chat log in creation order
//!
//! ## Notes (`/api/notes`)
//! - `POST /api/notes` - Create a note at a timestamp
//! - `GET /api/notes/{video_id}` - List notes of a video by timestamp
//! - `PUT /api/notes/{id}` - Update content and/or tags
//! - `DELETE /api/notes/{id}` - Delete a note
//!
//! ## Health
//! - `GET /health` - Health check endpoint
//!
//! # Errors
//!
//! Every failure is a JSON body with a single `detail` field:
//! ```text
//! {"detail": "Video not found"}
//! ```
//!
//! # OpenAPI Documentation
//!
//! The generated document is served at `/api-docs/openapi.json`.

/// Extractors that reject with `{"detail"}` bodies.
pub mod extract;
/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;
