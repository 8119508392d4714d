//! In-memory conversation list and stream reconciliation.
//!
//! Streams write through an [`ExchangeHandle`] that names the session and
//! the assistant message they were started for. The currently selected
//! session plays no part in routing chunks, so switching, creating or
//! deleting conversations mid-stream never misplaces text.

use std::fmt;

use tracing::debug;

use crate::core::message::Message;
use crate::core::session::{ChatSession, InterfaceType};

/// Addresses the assistant placeholder a stream fills in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeHandle {
    pub session_id: String,
    pub message_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSession(pub String);

impl fmt::Display for UnknownSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "No conversation with id '{}'", self.0)
    }
}

impl std::error::Error for UnknownSession {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    NotFound(String),
    Ambiguous { reference: String, matches: usize },
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::NotFound(reference) => {
                write!(f, "No conversation matches '{reference}'")
            }
            LookupError::Ambiguous { reference, matches } => write!(
                f,
                "'{reference}' matches {matches} conversations; use more of the id"
            ),
        }
    }
}

impl std::error::Error for LookupError {}

#[derive(Debug, Default, Clone)]
pub struct SessionStore {
    sessions: Vec<ChatSession>,
    current: Option<String>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a stored list; the first (newest) session becomes current.
    pub fn from_sessions(sessions: Vec<ChatSession>) -> Self {
        let current = sessions.first().map(|s| s.id.clone());
        Self { sessions, current }
    }

    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ChatSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut ChatSession> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current(&self) -> Option<&ChatSession> {
        self.current.as_deref().and_then(|id| self.get(id))
    }

    pub fn create(&mut self, interface_type: InterfaceType, backend_url: String, name: &str) -> String {
        let session = ChatSession::new(interface_type, backend_url, name);
        let id = session.id.clone();
        debug!(session_id = %id, interface = %interface_type, "created conversation");
        self.sessions.insert(0, session);
        self.current = Some(id.clone());
        id
    }

    pub fn select(&mut self, id: &str) -> Result<(), UnknownSession> {
        if self.get(id).is_none() {
            return Err(UnknownSession(id.to_string()));
        }
        self.current = Some(id.to_string());
        Ok(())
    }

    /// Rename a session. Blank titles are ignored and leave the old title.
    pub fn rename(&mut self, id: &str, title: &str) -> bool {
        let title = title.trim();
        if title.is_empty() {
            return false;
        }
        match self.get_mut(id) {
            Some(session) => {
                session.title = title.to_string();
                true
            }
            None => false,
        }
    }

    /// Remove a session. Deleting the current one moves the selection to
    /// the first remaining session.
    pub fn delete(&mut self, id: &str) -> Option<ChatSession> {
        let index = self.sessions.iter().position(|s| s.id == id)?;
        let removed = self.sessions.remove(index);
        if self.current.as_deref() == Some(id) {
            self.current = self.sessions.first().map(|s| s.id.clone());
        }
        debug!(session_id = %id, "deleted conversation");
        Some(removed)
    }

    /// Append the user's turn plus an empty assistant placeholder.
    pub fn begin_exchange(&mut self, session_id: &str, text: &str) -> Result<ExchangeHandle, UnknownSession> {
        let session = self
            .get_mut(session_id)
            .ok_or_else(|| UnknownSession(session_id.to_string()))?;

        session.messages.push(Message::user(text));
        let placeholder = Message::assistant_placeholder();
        let message_id = placeholder.id.clone();
        session.messages.push(placeholder);
        session.touch();

        Ok(ExchangeHandle {
            session_id: session_id.to_string(),
            message_id,
        })
    }

    /// Returns false when the target session or message is gone; the chunk
    /// is dropped in that case.
    pub fn append_chunk(&mut self, handle: &ExchangeHandle, chunk: &str) -> bool {
        match self.placeholder_mut(handle) {
            Some(message) => {
                message.content.push_str(chunk);
                true
            }
            None => false,
        }
    }

    pub fn fail_exchange(&mut self, handle: &ExchangeHandle, error: &str) -> bool {
        match self.placeholder_mut(handle) {
            Some(message) => {
                message.content = error.to_string();
                message.is_error = true;
                true
            }
            None => false,
        }
    }

    pub fn finish_exchange(&mut self, handle: &ExchangeHandle) -> bool {
        match self.get_mut(&handle.session_id) {
            Some(session) => {
                session.touch();
                true
            }
            None => false,
        }
    }

    pub fn exchange_content(&self, handle: &ExchangeHandle) -> Option<&Message> {
        self.get(&handle.session_id)?
            .messages
            .iter()
            .find(|m| m.id == handle.message_id)
    }

    /// Find a session by 1-based list position, full id or unique id prefix.
    pub fn resolve(&self, reference: &str) -> Result<&ChatSession, LookupError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(LookupError::NotFound(String::new()));
        }

        if let Ok(index) = reference.parse::<usize>() {
            if let Some(session) = index.checked_sub(1).and_then(|i| self.sessions.get(i)) {
                return Ok(session);
            }
        }
        if let Some(session) = self.get(reference) {
            return Ok(session);
        }

        let mut matches = self.sessions.iter().filter(|s| s.id.starts_with(reference));
        match (matches.next(), matches.count()) {
            (Some(session), 0) => Ok(session),
            (Some(_), rest) => Err(LookupError::Ambiguous {
                reference: reference.to_string(),
                matches: rest + 1,
            }),
            (None, _) => Err(LookupError::NotFound(reference.to_string())),
        }
    }

    fn placeholder_mut(&mut self, handle: &ExchangeHandle) -> Option<&mut Message> {
        let session = self.get_mut(&handle.session_id);
        if session.is_none() {
            debug!(session_id = %handle.session_id, "dropping stream update for deleted conversation");
        }
        session?.message_mut(&handle.message_id)
    }
}
