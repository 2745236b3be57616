// src/handlers/conversations.rs
use crate::handlers::internal_error;
use crate::middleware::auth::auth_middleware;
use crate::models::auth::{ApiError, Claims};
use crate::models::chat::{AppendMessageRequest, Conversation, CreateConversationRequest, MessageRecord};
use crate::AppState;
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Json,
    routing::{get, Router},
};
use std::sync::Arc;
use uuid::Uuid;

pub fn conversation_routes() -> Router {
    Router::new()
        .route(
            "/api/conversations",
            get(list_conversations).post(create_conversation),
        )
        .route(
            "/api/conversations/:conversation_id/messages",
            get(list_messages).post(append_message),
        )
        .route(
            "/api/projects/:project_id/conversations",
            get(list_project_conversations).post(create_project_conversation),
        )
        .layer(axum::middleware::from_fn(auth_middleware))
}

async fn list_conversations(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Conversation>>, (StatusCode, Json<ApiError>)> {
    let conversations = sqlx::query_as::<_, Conversation>(
        "SELECT id, user_id, project_id, title, created_at, updated_at
         FROM chat_conversations WHERE user_id = $1
         ORDER BY updated_at DESC",
    )
    .bind(claims.user_id())
    .fetch_all(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Database error listing conversations: {}", e);
        internal_error()
    })?;

    Ok(Json(conversations))
}

async fn create_conversation(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateConversationRequest>,
) -> Result<(StatusCode, Json<Conversation>), (StatusCode, Json<ApiError>)> {
    insert_conversation(&state, &claims, None, payload.title).await
}

async fn list_project_conversations(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(project_id): Path<String>,
) -> Result<Json<Vec<Conversation>>, (StatusCode, Json<ApiError>)> {
    let conversations = sqlx::query_as::<_, Conversation>(
        "SELECT id, user_id, project_id, title, created_at, updated_at
         FROM chat_conversations WHERE user_id = $1 AND project_id = $2
         ORDER BY updated_at DESC",
    )
    .bind(claims.user_id())
    .bind(&project_id)
    .fetch_all(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Database error listing project conversations: {}", e);
        internal_error()
    })?;

    Ok(Json(conversations))
}

async fn create_project_conversation(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(project_id): Path<String>,
    Json(payload): Json<CreateConversationRequest>,
) -> Result<(StatusCode, Json<Conversation>), (StatusCode, Json<ApiError>)> {
    insert_conversation(&state, &claims, Some(project_id), payload.title).await
}

async fn insert_conversation(
    state: &Arc<AppState>,
    claims: &Claims,
    project_id: Option<String>,
    title: Option<String>,
) -> Result<(StatusCode, Json<Conversation>), (StatusCode, Json<ApiError>)> {
    let title = title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| "New conversation".to_string());

    let conversation = sqlx::query_as::<_, Conversation>(
        "INSERT INTO chat_conversations (id, user_id, project_id, title, created_at, updated_at)
         VALUES ($1, $2, $3, $4, NOW(), NOW())
         RETURNING id, user_id, project_id, title, created_at, updated_at",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(claims.user_id())
    .bind(&project_id)
    .bind(title.trim())
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Database error creating conversation: {}", e);
        internal_error()
    })?;

    Ok((StatusCode::CREATED, Json(conversation)))
}

/// Loads the conversation only if it belongs to the caller; 404 otherwise, so
/// foreign ids are indistinguishable from missing ones.
async fn owned_conversation(
    state: &Arc<AppState>,
    claims: &Claims,
    conversation_id: &str,
) -> Result<Conversation, (StatusCode, Json<ApiError>)> {
    sqlx::query_as::<_, Conversation>(
        "SELECT id, user_id, project_id, title, created_at, updated_at
         FROM chat_conversations WHERE id = $1 AND user_id = $2",
    )
    .bind(conversation_id)
    .bind(claims.user_id())
    .fetch_optional(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Database error loading conversation: {}", e);
        internal_error()
    })?
    .ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(ApiError::new("Conversation not found")),
        )
    })
}

async fn list_messages(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(conversation_id): Path<String>,
) -> Result<Json<Vec<MessageRecord>>, (StatusCode, Json<ApiError>)> {
    let conversation = owned_conversation(&state, &claims, &conversation_id).await?;

    let messages = sqlx::query_as::<_, MessageRecord>(
        "SELECT id, conversation_id, role, content, created_at
         FROM messages WHERE conversation_id = $1
         ORDER BY created_at ASC",
    )
    .bind(&conversation.id)
    .fetch_all(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Database error listing messages: {}", e);
        internal_error()
    })?;

    Ok(Json(messages))
}

async fn append_message(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(conversation_id): Path<String>,
    Json(payload): Json<AppendMessageRequest>,
) -> Result<(StatusCode, Json<MessageRecord>), (StatusCode, Json<ApiError>)> {
    if !matches!(payload.role.as_str(), "user" | "assistant" | "system") {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::new("role must be one of: user, assistant, system")),
        ));
    }
    if payload.content.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::new("content must not be empty")),
        ));
    }

    let conversation = owned_conversation(&state, &claims, &conversation_id).await?;

    let message = sqlx::query_as::<_, MessageRecord>(
        "INSERT INTO messages (id, conversation_id, role, content, created_at)
         VALUES ($1, $2, $3, $4, NOW())
         RETURNING id, conversation_id, role, content, created_at",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&conversation.id)
    .bind(&payload.role)
    .bind(&payload.content)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Database error appending message: {}", e);
        internal_error()
    })?;

    if let Err(e) = sqlx::query("UPDATE chat_conversations SET updated_at = NOW() WHERE id = $1")
        .bind(&conversation.id)
        .execute(&state.db_pool)
        .await
    {
        tracing::warn!("Failed to bump conversation {}: {}", conversation.id, e);
    }

    Ok((StatusCode::CREATED, Json(message)))
}
