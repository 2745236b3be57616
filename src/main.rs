use axum::{Extension, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

mod chat;
mod db;
mod handlers;
mod listview;
mod middleware;
mod models;
mod workflow_client;

/// Shared application state: the connection pool, the workflow webhook client,
/// and the in-memory chat engine.
pub struct AppState {
    pub db_pool: sqlx::PgPool,
    pub workflow: workflow_client::WorkflowClient,
    pub chat_engine: chat::SharedChatEngine,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    init_logging().expect("Failed to initialize logging");

    let db_pool = db::create_pool()
        .await
        .expect("Failed to create database pool.");

    let workflow = workflow_client::WorkflowClient::from_env();
    tracing::info!("Workflow webhook endpoint: {}", workflow.webhook_url());

    let chat_engine: chat::SharedChatEngine =
        Arc::new(chat::ChatEngine::new(Arc::new(workflow.clone())));

    let shared_state = Arc::new(AppState {
        db_pool,
        workflow,
        chat_engine,
    });

    let app = Router::new()
        .merge(handlers::auth::auth_routes())
        .merge(handlers::chat::chat_routes())
        .merge(handlers::conversations::conversation_routes())
        .merge(handlers::documents::document_routes())
        .merge(handlers::suppliers::supplier_routes())
        .merge(handlers::proxy::proxy_routes())
        .route("/api/status", axum::routing::get(api_status))
        .layer(axum::middleware::from_fn(
            middleware::logging::request_logging_middleware,
        ))
        .layer(CorsLayer::permissive())
        .layer(Extension(shared_state.clone()));

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await.unwrap();
    tracing::info!("listening on {}", listener.local_addr().unwrap());
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .unwrap();
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,supplydesk=trace,sqlx=info,reqwest=info,hyper=info,tower=info".to_string()
        } else {
            "info,supplydesk=info,sqlx=warn,reqwest=warn,hyper=warn,tower=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        // JSON logging for production (easier for log aggregation)
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .boxed()
    } else {
        // Human-readable logging for development
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("🗂️ SupplyDesk starting up...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Build mode: {}",
        if cfg!(debug_assertions) { "development" } else { "production" }
    );

    let db_configured = std::env::var("DATABASE_URL").is_ok();
    let webhook_configured = std::env::var("N8N_WEBHOOK_URL").is_ok();
    tracing::info!(
        "Configuration - Database: {}, Workflow webhook: {}",
        if db_configured { "✅" } else { "❌" },
        if webhook_configured { "✅" } else { "fallback" }
    );

    Ok(())
}

async fn api_status(
    Extension(state): Extension<Arc<AppState>>,
) -> axum::response::Json<serde_json::Value> {
    use serde_json::json;

    let db_status = match sqlx::query("SELECT 1").fetch_one(&state.db_pool).await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    axum::response::Json(json!({
        "status": "operational",
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "database": db_status,
            "workflow_webhook": "configured",
        },
        "endpoints": {
            "status": "/api/status",
            "auth": "/api/auth/*",
            "chat": "/api/chat/*",
            "conversations": "/api/conversations",
            "documents": "/api/documents",
            "suppliers": "/api/suppliers",
            "proxy": "/api/proxy/n8n",
        }
    }))
}
