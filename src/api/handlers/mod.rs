//! API request handlers.
//!
//! This module contains all HTTP request handlers organized by functionality.

/// Chat message and history handlers.
pub mod chat;
/// Health check and OpenAPI document.
pub mod health;
/// Note CRUD handlers.
pub mod notes;
/// Video load, lookup, progress and deletion handlers.
pub mod videos;
