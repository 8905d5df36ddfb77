//! Request extractors whose rejections are [`AppError`]s, so malformed
//! bodies and path segments get the usual `{"detail"}` response.

use crate::types::AppError;
use axum::extract::{FromRequest, FromRequestParts};

/// `axum::Json` that rejects with a 400 `InvalidInput`
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// `axum::extract::Path` that rejects with a 400 `InvalidInput`
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct PathParam<T>(pub T);
