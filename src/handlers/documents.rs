// src/handlers/documents.rs
use crate::handlers::internal_error;
use crate::listview::{self, Pagination, SelectionState};
use crate::middleware::auth::auth_middleware;
use crate::models::auth::{ApiError, Claims};
use crate::models::document::*;
use crate::AppState;
use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post, Router},
};
use std::sync::Arc;
use uuid::Uuid;

pub fn document_routes() -> Router {
    Router::new()
        .route("/api/documents", get(list_documents).post(create_document))
        .route("/api/documents/:document_id", delete(delete_document))
        .route("/api/documents/bulk-delete", post(bulk_delete_documents))
        .layer(axum::middleware::from_fn(auth_middleware))
}

async fn fetch_all(
    state: &Arc<AppState>,
    user_id: i32,
) -> Result<Vec<Document>, (StatusCode, Json<ApiError>)> {
    sqlx::query_as::<_, Document>(
        "SELECT id, user_id, name, doc_type, description, size_bytes, created_at, updated_at
         FROM documents WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_all(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Database error listing documents: {}", e);
        internal_error()
    })
}

/// Single fetch, then the whole filter -> sort -> paginate pipeline in
/// process, exactly as the grid consumes it.
async fn list_documents(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<DocumentListParams>,
) -> Result<Json<DocumentListResponse>, (StatusCode, Json<ApiError>)> {
    let rows = fetch_all(&state, claims.user_id()).await?;

    let search = params.search.as_deref().unwrap_or("");
    let doc_type = params.doc_type.as_deref().unwrap_or(listview::ALL);
    let mut filtered = filter_documents(rows, search, doc_type);
    sort_documents(
        &mut filtered,
        params.sort_by.as_deref().unwrap_or("name"),
        params.sort_order.unwrap_or_default(),
    );

    let pagination = Pagination::clamped(
        params.page.unwrap_or(1),
        params.per_page.unwrap_or(20),
        filtered.len(),
    );
    let documents = pagination.page_slice(&filtered).to_vec();

    Ok(Json(DocumentListResponse {
        documents,
        page: pagination.current_page,
        per_page: pagination.items_per_page,
        total_pages: pagination.total_pages,
        total_items: pagination.total_items,
    }))
}

async fn create_document(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<Document>), (StatusCode, Json<ApiError>)> {
    if payload.name.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::new("name must not be empty")),
        ));
    }

    let document = sqlx::query_as::<_, Document>(
        "INSERT INTO documents (id, user_id, name, doc_type, description, size_bytes, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
         RETURNING id, user_id, name, doc_type, description, size_bytes, created_at, updated_at",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(claims.user_id())
    .bind(payload.name.trim())
    .bind(payload.doc_type.as_deref().unwrap_or("other"))
    .bind(payload.description.as_deref().unwrap_or(""))
    .bind(payload.size_bytes.unwrap_or(0))
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Database error creating document: {}", e);
        internal_error()
    })?;

    Ok((StatusCode::CREATED, Json(document)))
}

async fn delete_document(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(document_id): Path<String>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ApiError>)> {
    let deleted = sqlx::query_scalar::<_, String>(
        "DELETE FROM documents WHERE id = $1 AND user_id = $2 RETURNING id",
    )
    .bind(&document_id)
    .bind(claims.user_id())
    .fetch_optional(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Database error deleting document: {}", e);
        internal_error()
    })?;

    match deleted {
        Some(id) => Ok(Json(serde_json::json!({ "deleted": id }))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ApiError::new("Document not found")),
        )),
    }
}

/// The selection is resolved against the live collection first, so ids that
/// vanished since the client's fetch are counted as missing rather than
/// failing the batch. Each delete runs individually; failures collapse into
/// one batch-level error message.
async fn bulk_delete_documents(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<BulkIdsRequest>,
) -> Result<Json<BulkDeleteResponse>, (StatusCode, Json<ApiError>)> {
    let user_id = claims.user_id();
    let current = fetch_all(&state, user_id).await?;
    let current_ids: Vec<String> = current.iter().map(|d| d.id.clone()).collect();

    let mut selection = SelectionState {
        selected_ids: payload.ids.clone(),
        is_all_selected: false,
    };
    selection.retain_present(&current_ids);
    let resolved = selection.selected_ids;
    let missing = payload.ids.len().saturating_sub(resolved.len());

    let deletes = resolved.iter().map(|id| {
        let pool = state.db_pool.clone();
        let id = id.clone();
        async move {
            sqlx::query("DELETE FROM documents WHERE id = $1 AND user_id = $2")
                .bind(&id)
                .bind(user_id)
                .execute(&pool)
                .await
        }
    });
    let results = futures::future::join_all(deletes).await;

    let mut deleted = 0usize;
    let mut failures = 0usize;
    for result in results {
        match result {
            Ok(done) if done.rows_affected() > 0 => deleted += 1,
            Ok(_) => failures += 1,
            Err(e) => {
                tracing::error!("Bulk delete failed for a document: {}", e);
                failures += 1;
            }
        }
    }

    let error = (failures > 0).then(|| format!("{} document(s) could not be deleted", failures));

    Ok(Json(BulkDeleteResponse {
        deleted,
        missing,
        error,
    }))
}
