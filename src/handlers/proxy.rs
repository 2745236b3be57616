// src/handlers/proxy.rs
use crate::middleware::rate_limit::rate_limit_middleware;
use crate::models::auth::ApiError;
use crate::workflow_client::WorkflowError;
use crate::AppState;
use axum::{
    extract::Extension,
    http::StatusCode,
    response::Json,
    routing::{get, Router},
};
use serde_json::Value;
use std::sync::Arc;

pub fn proxy_routes() -> Router {
    Router::new()
        .route("/api/proxy/n8n", get(health_echo).post(forward))
        .layer(axum::middleware::from_fn(rate_limit_middleware))
}

/// Passes an arbitrary JSON body through to the workflow webhook. Upstream
/// failures map to gateway-style statuses with user-facing messages; the raw
/// upstream error only reaches the logs.
async fn forward(
    Extension(state): Extension<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, Json<ApiError>)> {
    match state.workflow.forward(body).await {
        Ok(value) => Ok(Json(value)),
        Err(e) => {
            tracing::error!("Workflow proxy call failed: {}", e);
            let (status, message) = match e {
                WorkflowError::Upstream { .. } => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "The assistant service is currently unavailable. Please try again later.",
                ),
                WorkflowError::Timeout => (
                    StatusCode::GATEWAY_TIMEOUT,
                    "The assistant took too long to respond. Please try again.",
                ),
                WorkflowError::Connection(_) | WorkflowError::InvalidResponse(_) => (
                    StatusCode::BAD_GATEWAY,
                    "Could not reach the assistant service.",
                ),
            };
            Err((status, Json(ApiError::new(message))))
        }
    }
}

async fn health_echo(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "route": "/api/proxy/n8n",
        "webhook_configured": !state.workflow.webhook_url().is_empty(),
    }))
}
