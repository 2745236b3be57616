// src/handlers/mod.rs
pub mod auth;
pub mod chat;
pub mod conversations;
pub mod documents;
pub mod proxy;
pub mod suppliers;

use crate::models::auth::ApiError;
use axum::{http::StatusCode, response::Json};

pub(crate) fn internal_error() -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError::new("Internal server error")),
    )
}
