// src/chat/store.rs
//! In-memory chat session state and the per-turn reconciliation flow.
//!
//! A turn moves through: user message appended -> assistant placeholder
//! appended -> awaiting the backend -> resolved or failed. Both appends happen
//! before any network activity so the transcript shows the exchange
//! immediately; a failed turn keeps the user message and drops the assistant
//! placeholder from the visible transcript.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Upper bound on retained sessions per user. The least recently updated
/// session is evicted first; the current session is never evicted.
pub const MAX_SESSIONS: usize = 50;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("a reply is already being generated for this session")]
    TurnInFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// Delivery state carried on the assistant message itself. A failed turn stays
/// in the raw transcript tagged `Failed` instead of being erased, so the
/// history remains auditable; the visible transcript filters it out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum Delivery {
    Pending,
    Resolved,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub delivery: Delivery,
}

impl ChatMessage {
    fn user(content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: MessageRole::User,
            content,
            timestamp: Utc::now(),
            delivery: Delivery::Resolved,
        }
    }

    fn assistant_placeholder() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: MessageRole::Assistant,
            content: String::new(),
            timestamp: Utc::now(),
            delivery: Delivery::Pending,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.delivery, Delivery::Failed(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_loading: bool,
    pub error: Option<String>,
    #[serde(skip)]
    latest_turn: u64,
}

impl ChatSession {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: format!("Chat {}", now.format("%Y-%m-%d %H:%M")),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            is_loading: false,
            error: None,
            latest_turn: 0,
        }
    }

    /// Display transcript: insertion order, failed turns excluded. An
    /// in-flight placeholder (empty content, pending) is included so both
    /// bubbles of a turn render before the backend answers.
    pub fn visible_messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter().filter(|m| !m.is_failed())
    }

    /// Full transcript including failed turns.
    pub fn transcript(&self) -> &[ChatMessage] {
        &self.messages
    }

    fn pending_placeholder_mut(&mut self) -> Option<&mut ChatMessage> {
        self.messages
            .iter_mut()
            .rev()
            .find(|m| m.delivery == Delivery::Pending)
    }
}

/// Handle for reconciling one in-flight turn against the store.
#[derive(Debug, Clone)]
pub struct TurnHandle {
    pub session_id: String,
    pub turn: u64,
    pub prompt: String,
}

/// One user's chat state: the session list and the current pointer.
#[derive(Debug, Default)]
pub struct SessionState {
    sessions: Vec<ChatSession>,
    current: Option<String>,
    next_turn: u64,
}

impl SessionState {
    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn session(&self, id: &str) -> Option<&ChatSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn current_session(&self) -> Option<&ChatSession> {
        self.current.as_deref().and_then(|id| self.session(id))
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.sessions.iter().position(|s| s.id == id)
    }

    fn session_mut(&mut self, id: &str) -> Option<&mut ChatSession> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    /// Creates a session, makes it current, and returns its index.
    fn create_session(&mut self) -> usize {
        self.evict_to_capacity();
        let session = ChatSession::new();
        self.current = Some(session.id.clone());
        self.sessions.push(session);
        self.sessions.len() - 1
    }

    fn evict_to_capacity(&mut self) {
        while self.sessions.len() >= MAX_SESSIONS {
            let evict_pos = self
                .sessions
                .iter()
                .enumerate()
                .filter(|(_, s)| Some(s.id.as_str()) != self.current.as_deref())
                .min_by_key(|(_, s)| s.updated_at)
                .map(|(i, _)| i);
            match evict_pos {
                Some(i) => {
                    let evicted = self.sessions.remove(i);
                    tracing::debug!("evicted chat session {} ({})", evicted.id, evicted.title);
                }
                None => break,
            }
        }
    }

    /// Optimistic first half of a turn: appends the trimmed user message and an
    /// empty pending assistant placeholder, marks the session loading, and
    /// hands back the turn to reconcile. Empty or whitespace-only input is a
    /// silent no-op (`Ok(None)`). Targets the given session id, else the
    /// current session, else a freshly created one. A second send while a turn
    /// is in flight is rejected instead of raced.
    pub fn begin_turn(
        &mut self,
        session_id: Option<&str>,
        content: &str,
    ) -> Result<Option<TurnHandle>, ChatError> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let idx = match session_id {
            Some(id) => match self.index_of(id) {
                Some(i) => {
                    self.current = Some(id.to_string());
                    i
                }
                None => {
                    tracing::warn!("chat session {} not found, starting a new one", id);
                    self.create_session()
                }
            },
            None => match self.current.clone().and_then(|id| self.index_of(&id)) {
                Some(i) => i,
                None => self.create_session(),
            },
        };

        if self.sessions[idx].is_loading {
            return Err(ChatError::TurnInFlight);
        }

        self.next_turn += 1;
        let turn = self.next_turn;

        let session = &mut self.sessions[idx];
        session.messages.push(ChatMessage::user(trimmed.to_string()));
        session.messages.push(ChatMessage::assistant_placeholder());
        session.is_loading = true;
        session.error = None;
        session.updated_at = Utc::now();
        session.latest_turn = turn;

        Ok(Some(TurnHandle {
            session_id: session.id.clone(),
            turn,
            prompt: trimmed.to_string(),
        }))
    }

    /// Replaces the pending placeholder's content in place. A reply for a
    /// session that disappeared, or for a turn that is no longer the session's
    /// latest, is discarded.
    pub fn resolve_turn(&mut self, handle: &TurnHandle, reply: String) {
        let Some(session) = self.session_mut(&handle.session_id) else {
            tracing::warn!("discarding reply for deleted session {}", handle.session_id);
            return;
        };
        if session.latest_turn != handle.turn {
            tracing::warn!(
                "discarding stale reply for session {} (turn {})",
                handle.session_id,
                handle.turn
            );
            return;
        }
        if let Some(placeholder) = session.pending_placeholder_mut() {
            placeholder.content = reply;
            placeholder.delivery = Delivery::Resolved;
        }
        session.is_loading = false;
        session.updated_at = Utc::now();
    }

    /// The user message stays; the placeholder is tagged failed and leaves the
    /// visible transcript. The session error carries the failure message. No
    /// retry is attempted.
    pub fn fail_turn(&mut self, handle: &TurnHandle, reason: String) {
        let Some(session) = self.session_mut(&handle.session_id) else {
            tracing::warn!("discarding failure for deleted session {}", handle.session_id);
            return;
        };
        if session.latest_turn != handle.turn {
            tracing::warn!(
                "discarding stale failure for session {} (turn {})",
                handle.session_id,
                handle.turn
            );
            return;
        }
        if let Some(placeholder) = session.pending_placeholder_mut() {
            placeholder.delivery = Delivery::Failed(reason.clone());
        }
        session.error = Some(reason);
        session.is_loading = false;
        session.updated_at = Utc::now();
    }

    /// Switches the current pointer. Missing ids are a warning-level no-op.
    pub fn load_session(&mut self, id: &str) -> bool {
        if self.index_of(id).is_some() {
            self.current = Some(id.to_string());
            true
        } else {
            tracing::warn!("chat session {} not found", id);
            false
        }
    }

    /// Removes a session; the current pointer clears if it pointed there.
    pub fn delete_session(&mut self, id: &str) -> bool {
        let before = self.sessions.len();
        self.sessions.retain(|s| s.id != id);
        if self.current.as_deref() == Some(id) {
            self.current = None;
        }
        self.sessions.len() != before
    }

    /// Clears the current session's error only; never retries.
    pub fn clear_error(&mut self) {
        if let Some(id) = self.current.clone() {
            if let Some(session) = self.session_mut(&id) {
                session.error = None;
            }
        }
    }
}
