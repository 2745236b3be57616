// src/chat/engine.rs
//! Async orchestration over the session store: one write-locked mutation to
//! open a turn, the backend call with no lock held, one write-locked mutation
//! to reconcile.

use crate::chat::store::{ChatError, ChatMessage, ChatSession, SessionState};
use crate::workflow_client::AssistantBackend;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub type SharedChatEngine = Arc<ChatEngine>;

/// Wire snapshot of one session: the visible transcript only.
#[derive(Debug, Serialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl SessionSnapshot {
    fn of(session: &ChatSession) -> Self {
        Self {
            id: session.id.clone(),
            title: session.title.clone(),
            messages: session.visible_messages().cloned().collect(),
            created_at: session.created_at,
            updated_at: session.updated_at,
            is_loading: session.is_loading,
            error: session.error.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub title: String,
    pub message_count: usize,
    pub updated_at: DateTime<Utc>,
    pub is_loading: bool,
}

#[derive(Debug, Serialize)]
pub struct SessionsOverview {
    pub sessions: Vec<SessionSummary>,
    pub current: Option<String>,
}

pub struct ChatEngine {
    backend: Arc<dyn AssistantBackend>,
    states: RwLock<HashMap<i32, SessionState>>,
}

impl ChatEngine {
    pub fn new(backend: Arc<dyn AssistantBackend>) -> Self {
        Self {
            backend,
            states: RwLock::new(HashMap::new()),
        }
    }

    /// Runs one full turn for a user. Returns the session snapshot after
    /// reconciliation, or `Ok(None)` when the input was empty and no session
    /// exists to show.
    pub async fn send_message(
        &self,
        user_id: i32,
        session_id: Option<&str>,
        content: &str,
    ) -> Result<Option<SessionSnapshot>, ChatError> {
        let handle = {
            let mut states = self.states.write().await;
            let state = states.entry(user_id).or_default();
            match state.begin_turn(session_id, content)? {
                Some(handle) => handle,
                // Empty input: nothing changed, report current state as-is.
                None => return Ok(state.current_session().map(SessionSnapshot::of)),
            }
        };

        // Lock released: the backend call is the only suspension point.
        let result = self.backend.complete(&handle.session_id, &handle.prompt).await;

        let mut states = self.states.write().await;
        let state = states.entry(user_id).or_default();
        match result {
            Ok(reply) => state.resolve_turn(&handle, reply),
            Err(e) => {
                tracing::warn!(
                    "assistant turn failed for session {}: {}",
                    handle.session_id,
                    e
                );
                state.fail_turn(&handle, e.to_string());
            }
        }
        Ok(state.session(&handle.session_id).map(SessionSnapshot::of))
    }

    pub async fn overview(&self, user_id: i32) -> SessionsOverview {
        let states = self.states.read().await;
        match states.get(&user_id) {
            Some(state) => SessionsOverview {
                sessions: state
                    .sessions()
                    .iter()
                    .map(|s| SessionSummary {
                        id: s.id.clone(),
                        title: s.title.clone(),
                        message_count: s.visible_messages().count(),
                        updated_at: s.updated_at,
                        is_loading: s.is_loading,
                    })
                    .collect(),
                current: state.current_id().map(str::to_string),
            },
            None => SessionsOverview {
                sessions: Vec::new(),
                current: None,
            },
        }
    }

    /// Makes the session current and returns it. A missing id leaves the
    /// current pointer untouched and returns `None`.
    pub async fn activate(&self, user_id: i32, session_id: &str) -> Option<SessionSnapshot> {
        let mut states = self.states.write().await;
        let state = states.entry(user_id).or_default();
        if state.load_session(session_id) {
            state.session(session_id).map(SessionSnapshot::of)
        } else {
            None
        }
    }

    pub async fn delete(&self, user_id: i32, session_id: &str) -> bool {
        let mut states = self.states.write().await;
        match states.get_mut(&user_id) {
            Some(state) => state.delete_session(session_id),
            None => false,
        }
    }

    /// Clears the current session's error; returns the refreshed snapshot.
    pub async fn clear_error(&self, user_id: i32) -> Option<SessionSnapshot> {
        let mut states = self.states.write().await;
        let state = states.entry(user_id).or_default();
        state.clear_error();
        state.current_session().map(SessionSnapshot::of)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::store::MessageRole;
    use crate::workflow_client::{AssistantBackend, WorkflowError};
    use async_trait::async_trait;
    use tokio::sync::Notify;

    struct CannedBackend(&'static str);

    #[async_trait]
    impl AssistantBackend for CannedBackend {
        async fn complete(&self, _session_id: &str, _prompt: &str) -> Result<String, WorkflowError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl AssistantBackend for FailingBackend {
        async fn complete(&self, _session_id: &str, _prompt: &str) -> Result<String, WorkflowError> {
            Err(WorkflowError::Upstream {
                status: 500,
                message: "internal error".to_string(),
            })
        }
    }

    /// Blocks inside `complete` until released, so tests can observe the
    /// optimistic state mid-flight.
    struct GatedBackend {
        entered: Notify,
        release: Notify,
    }

    impl GatedBackend {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                entered: Notify::new(),
                release: Notify::new(),
            })
        }
    }

    #[async_trait]
    impl AssistantBackend for GatedBackend {
        async fn complete(&self, _session_id: &str, _prompt: &str) -> Result<String, WorkflowError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok("gated reply".to_string())
        }
    }

    #[tokio::test]
    async fn successful_turn_resolves_the_placeholder() {
        let engine = ChatEngine::new(Arc::new(CannedBackend("the answer")));
        let snapshot = engine.send_message(7, None, "a question").await.unwrap().unwrap();

        assert_eq!(snapshot.messages.len(), 2);
        assert_eq!(snapshot.messages[0].role, MessageRole::User);
        assert_eq!(snapshot.messages[0].content, "a question");
        assert_eq!(snapshot.messages[1].role, MessageRole::Assistant);
        assert_eq!(snapshot.messages[1].content, "the answer");
        assert!(!snapshot.is_loading);
        assert!(snapshot.error.is_none());
    }

    #[tokio::test]
    async fn failed_turn_keeps_user_message_and_sets_error() {
        let engine = ChatEngine::new(Arc::new(FailingBackend));
        let snapshot = engine.send_message(7, None, "a question").await.unwrap().unwrap();

        assert_eq!(snapshot.messages.len(), 1);
        assert_eq!(snapshot.messages[0].role, MessageRole::User);
        assert!(!snapshot.is_loading);
        assert!(snapshot.error.is_some());
    }

    #[tokio::test]
    async fn empty_input_changes_nothing() {
        let engine = ChatEngine::new(Arc::new(CannedBackend("unused")));
        assert!(engine.send_message(7, None, "   ").await.unwrap().is_none());
        assert!(engine.overview(7).await.sessions.is_empty());
    }

    #[tokio::test]
    async fn both_bubbles_are_visible_before_the_backend_answers() {
        let backend = GatedBackend::new();
        let engine = Arc::new(ChatEngine::new(backend.clone()));

        let task = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.send_message(7, None, "slow question").await })
        };
        backend.entered.notified().await;

        let overview = engine.overview(7).await;
        assert_eq!(overview.sessions.len(), 1);
        assert!(overview.sessions[0].is_loading);
        // User message plus the empty placeholder, appended before any I/O.
        assert_eq!(overview.sessions[0].message_count, 2);

        backend.release.notify_one();
        let snapshot = task.await.unwrap().unwrap().unwrap();
        assert_eq!(snapshot.messages[1].content, "gated reply");
    }

    #[tokio::test]
    async fn overlapping_sends_on_one_session_are_rejected() {
        let backend = GatedBackend::new();
        let engine = Arc::new(ChatEngine::new(backend.clone()));

        let task = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.send_message(7, None, "first").await })
        };
        backend.entered.notified().await;

        let session_id = engine.overview(7).await.sessions[0].id.clone();
        let err = engine
            .send_message(7, Some(&session_id), "second")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::TurnInFlight));

        backend.release.notify_one();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn sessions_are_scoped_per_user() {
        let engine = ChatEngine::new(Arc::new(CannedBackend("ok")));
        engine.send_message(1, None, "hello").await.unwrap();
        assert_eq!(engine.overview(1).await.sessions.len(), 1);
        assert!(engine.overview(2).await.sessions.is_empty());
    }

    #[tokio::test]
    async fn activate_and_delete_manage_the_current_pointer() {
        let engine = ChatEngine::new(Arc::new(CannedBackend("ok")));
        let first = engine.send_message(7, None, "one").await.unwrap().unwrap();
        // A send without a session id reuses the current session.
        engine.send_message(7, None, "two").await.unwrap();
        assert_eq!(engine.overview(7).await.sessions.len(), 1);

        assert!(engine.activate(7, "missing").await.is_none());
        assert_eq!(engine.overview(7).await.current, Some(first.id.clone()));

        assert!(engine.delete(7, &first.id).await);
        assert_eq!(engine.overview(7).await.current, None);
    }

    #[tokio::test]
    async fn clear_error_resets_only_the_error() {
        let engine = ChatEngine::new(Arc::new(FailingBackend));
        engine.send_message(7, None, "boom").await.unwrap();
        let snapshot = engine.clear_error(7).await.unwrap();
        assert!(snapshot.error.is_none());
        assert_eq!(snapshot.messages.len(), 1);
    }
}
