// src/handlers/chat.rs
use crate::chat::{ChatError, SessionSnapshot, SessionsOverview};
use crate::middleware::auth::auth_middleware;
use crate::middleware::rate_limit::rate_limit_middleware;
use crate::models::auth::{ApiError, Claims};
use crate::AppState;
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post, Router},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn chat_routes() -> Router {
    Router::new()
        .route("/api/chat/send", post(send_message))
        .route("/api/chat/sessions", get(list_sessions))
        .route("/api/chat/sessions/:session_id/activate", post(activate_session))
        .route("/api/chat/sessions/:session_id", delete(delete_session))
        .route("/api/chat/clear-error", post(clear_error))
        .layer(axum::middleware::from_fn(auth_middleware))
        .layer(axum::middleware::from_fn(rate_limit_middleware))
}

#[derive(Debug, Deserialize)]
struct SendMessageRequest {
    #[serde(default)]
    session_id: Option<String>,
    content: String,
}

#[derive(Debug, Serialize)]
struct SessionEnvelope {
    session: Option<SessionSnapshot>,
}

/// One full assistant turn: the user message and placeholder land in the
/// session before the workflow call, and the response carries the reconciled
/// transcript (or the session error after a failed turn).
async fn send_message(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<Json<SessionEnvelope>, (StatusCode, Json<ApiError>)> {
    let result = state
        .chat_engine
        .send_message(claims.user_id(), payload.session_id.as_deref(), &payload.content)
        .await;

    match result {
        Ok(session) => Ok(Json(SessionEnvelope { session })),
        Err(e @ ChatError::TurnInFlight) => {
            Err((StatusCode::CONFLICT, Json(ApiError::new(e.to_string()))))
        }
    }
}

async fn list_sessions(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Json<SessionsOverview> {
    Json(state.chat_engine.overview(claims.user_id()).await)
}

/// Switching to an unknown session is a no-op, not an error: the response just
/// carries no session.
async fn activate_session(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<String>,
) -> Json<SessionEnvelope> {
    let session = state.chat_engine.activate(claims.user_id(), &session_id).await;
    Json(SessionEnvelope { session })
}

async fn delete_session(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<String>,
) -> Json<serde_json::Value> {
    let deleted = state.chat_engine.delete(claims.user_id(), &session_id).await;
    Json(serde_json::json!({ "deleted": deleted }))
}

async fn clear_error(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Json<SessionEnvelope> {
    let session = state.chat_engine.clear_error(claims.user_id()).await;
    Json(SessionEnvelope { session })
}
