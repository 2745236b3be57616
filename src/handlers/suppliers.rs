// src/handlers/suppliers.rs
use crate::handlers::internal_error;
use crate::listview::{self, Pagination, SelectionState};
use crate::middleware::auth::auth_middleware;
use crate::models::auth::{ApiError, Claims};
use crate::models::document::{BulkDeleteResponse, BulkIdsRequest};
use crate::models::supplier::*;
use crate::AppState;
use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post, Router},
};
use std::sync::Arc;
use uuid::Uuid;

pub fn supplier_routes() -> Router {
    Router::new()
        .route("/api/suppliers", get(list_suppliers).post(create_supplier))
        .route("/api/suppliers/:supplier_id", delete(delete_supplier))
        .route("/api/suppliers/bulk-delete", post(bulk_delete_suppliers))
        .layer(axum::middleware::from_fn(auth_middleware))
}

async fn fetch_all(
    state: &Arc<AppState>,
    user_id: i32,
) -> Result<Vec<Supplier>, (StatusCode, Json<ApiError>)> {
    sqlx::query_as::<_, Supplier>(
        "SELECT id, user_id, name, sector, contact_email, city, rating, created_at, updated_at
         FROM suppliers WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_all(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Database error listing suppliers: {}", e);
        internal_error()
    })
}

async fn list_suppliers(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<SupplierListParams>,
) -> Result<Json<SupplierListResponse>, (StatusCode, Json<ApiError>)> {
    let rows = fetch_all(&state, claims.user_id()).await?;

    let search = params.search.as_deref().unwrap_or("");
    let sector = params.sector.as_deref().unwrap_or(listview::ALL);
    let mut filtered = filter_suppliers(rows, search, sector, params.min_rating, params.max_rating);
    sort_suppliers(
        &mut filtered,
        params.sort_by.as_deref().unwrap_or("name"),
        params.sort_order.unwrap_or_default(),
    );

    let pagination = Pagination::clamped(
        params.page.unwrap_or(1),
        params.per_page.unwrap_or(20),
        filtered.len(),
    );
    let suppliers = pagination.page_slice(&filtered).to_vec();

    Ok(Json(SupplierListResponse {
        suppliers,
        page: pagination.current_page,
        per_page: pagination.items_per_page,
        total_pages: pagination.total_pages,
        total_items: pagination.total_items,
    }))
}

async fn create_supplier(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateSupplierRequest>,
) -> Result<(StatusCode, Json<Supplier>), (StatusCode, Json<ApiError>)> {
    if payload.name.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::new("name must not be empty")),
        ));
    }
    let rating = payload.rating.unwrap_or(0.0);
    if !(0.0..=5.0).contains(&rating) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::new("rating must be between 0 and 5")),
        ));
    }

    let supplier = sqlx::query_as::<_, Supplier>(
        "INSERT INTO suppliers (id, user_id, name, sector, contact_email, city, rating, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
         RETURNING id, user_id, name, sector, contact_email, city, rating, created_at, updated_at",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(claims.user_id())
    .bind(payload.name.trim())
    .bind(payload.sector.as_deref().unwrap_or("other"))
    .bind(payload.contact_email.as_deref().unwrap_or(""))
    .bind(payload.city.as_deref().unwrap_or(""))
    .bind(rating)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Database error creating supplier: {}", e);
        internal_error()
    })?;

    Ok((StatusCode::CREATED, Json(supplier)))
}

async fn delete_supplier(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(supplier_id): Path<String>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ApiError>)> {
    let deleted = sqlx::query_scalar::<_, String>(
        "DELETE FROM suppliers WHERE id = $1 AND user_id = $2 RETURNING id",
    )
    .bind(&supplier_id)
    .bind(claims.user_id())
    .fetch_optional(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Database error deleting supplier: {}", e);
        internal_error()
    })?;

    match deleted {
        Some(id) => Ok(Json(serde_json::json!({ "deleted": id }))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ApiError::new("Supplier not found")),
        )),
    }
}

async fn bulk_delete_suppliers(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<BulkIdsRequest>,
) -> Result<Json<BulkDeleteResponse>, (StatusCode, Json<ApiError>)> {
    let user_id = claims.user_id();
    let current = fetch_all(&state, user_id).await?;
    let current_ids: Vec<String> = current.iter().map(|s| s.id.clone()).collect();

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
            sqlx::query("DELETE FROM suppliers WHERE id = $1 AND user_id = $2")
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
                tracing::error!("Bulk delete failed for a supplier: {}", e);
                failures += 1;
            }
        }
    }

    let error = (failures > 0).then(|| format!("{} supplier(s) could not be deleted", failures));

    Ok(Json(BulkDeleteResponse {
        deleted,
        missing,
        error,
    }))
}
