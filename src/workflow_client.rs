// src/workflow_client.rs
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

/// Fallback used when N8N_WEBHOOK_URL is not configured.
pub const DEFAULT_WEBHOOK_URL: &str = "https://supplydesk.app.n8n.cloud/webhook/assistant";

/// Client-side budget for one workflow call. There is no retry: a failed call
/// surfaces to the caller and must be re-issued manually.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("workflow endpoint returned {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("workflow request timed out after {}s", REQUEST_TIMEOUT.as_secs())]
    Timeout,
    #[error("could not reach workflow endpoint: {0}")]
    Connection(String),
    #[error("unreadable workflow response: {0}")]
    InvalidResponse(String),
}

/// Produces an assistant reply for a user prompt. The live implementation
/// forwards to the n8n workflow; tests substitute in-memory fakes.
#[async_trait]
pub trait AssistantBackend: Send + Sync {
    async fn complete(&self, session_id: &str, prompt: &str) -> Result<String, WorkflowError>;
}

#[derive(Debug, Clone)]
pub struct WorkflowClient {
    client: Client,
    webhook_url: String,
}

impl WorkflowClient {
    pub fn new(webhook_url: String) -> Self {
        Self {
            client: Client::new(),
            webhook_url,
        }
    }

    pub fn from_env() -> Self {
        let url = std::env::var("N8N_WEBHOOK_URL").unwrap_or_else(|_| {
            tracing::warn!("N8N_WEBHOOK_URL not set, using default webhook endpoint");
            DEFAULT_WEBHOOK_URL.to_string()
        });
        Self::new(url)
    }

    pub fn webhook_url(&self) -> &str {
        &self.webhook_url
    }

    /// Forwards an arbitrary JSON body to the webhook and returns the upstream
    /// JSON. A non-JSON success body is wrapped as `{"output": <text>}` so
    /// callers always receive a JSON value.
    pub async fn forward(&self, body: Value) -> Result<Value, WorkflowError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| WorkflowError::InvalidResponse(e.to_string()))?;

        if !status.is_success() {
            tracing::warn!("workflow webhook returned {}: {}", status, text);
            return Err(WorkflowError::Upstream {
                status: status.as_u16(),
                message: truncate(&text, 500),
            });
        }

        if text.trim().is_empty() {
            return Ok(json!({}));
        }

        match serde_json::from_str(&text) {
            Ok(value) => Ok(value),
            Err(_) => Ok(json!({ "output": text })),
        }
    }
}

fn classify_send_error(e: reqwest::Error) -> WorkflowError {
    if e.is_timeout() {
        tracing::warn!("workflow request timed out: {}", e);
        WorkflowError::Timeout
    } else {
        tracing::warn!("workflow request failed: {}", e);
        WorkflowError::Connection(e.to_string())
    }
}

#[async_trait]
impl AssistantBackend for WorkflowClient {
    async fn complete(&self, session_id: &str, prompt: &str) -> Result<String, WorkflowError> {
        let payload = json!({
            "sessionId": session_id,
            "chatInput": prompt,
        });
        let value = self.forward(payload).await?;
        extract_reply(&value).ok_or_else(|| {
            WorkflowError::InvalidResponse("no reply text in workflow response".to_string())
        })
    }
}

/// n8n responses vary with the workflow shape: a bare object, an array of
/// items, or a wrapper keyed `output` / `text` / `message` / `reply`.
fn extract_reply(value: &Value) -> Option<String> {
    let item = match value {
        Value::Array(items) => items.first()?,
        other => other,
    };
    if let Some(s) = item.as_str() {
        if !s.trim().is_empty() {
            return Some(s.to_string());
        }
        return None;
    }
    for key in ["output", "text", "message", "reply"] {
        if let Some(s) = item.get(key).and_then(Value::as_str) {
            if !s.trim().is_empty() {
                return Some(s.to_string());
            }
        }
    }
    None
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}
