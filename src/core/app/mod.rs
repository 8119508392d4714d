//! Conversation controller.
//!
//! [`App`] owns the session list, the active configuration and the
//! registry of running streams. Front ends call [`App::send_message`] to
//! start a turn, spawn the returned [`StreamParams`], and feed every
//! message from the stream channel back through
//! [`App::handle_stream_message`].

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::BackendRequest;
use crate::core::chat_stream::{StreamBackend, StreamMessage, StreamParams};
use crate::core::config::data::Config;
use crate::core::config::io::ConfigError;
use crate::core::config::orchestrator::ConfigOrchestrator;
use crate::core::session::{ChatSession, InterfaceType};
use crate::core::storage::LocalStorage;
use crate::core::store::{ExchangeHandle, SessionStore, UnknownSession};
use crate::utils::logging::LoggingState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    EmptyMessage,
    NoSession,
    /// The conversation already has a response streaming in.
    Busy { title: String },
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::EmptyMessage => write!(f, "Nothing to send."),
            SendError::NoSession => write!(
                f,
                "No conversation selected. Start one with /new <semantic|bss30|api>."
            ),
            SendError::Busy { title } => {
                write!(f, "'{title}' is still receiving a response.")
            }
        }
    }
}

impl std::error::Error for SendError {}

/// What a stream message did to the transcript.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamUpdate {
    Chunk {
        session_id: String,
        text: String,
        is_current: bool,
    },
    Failed {
        session_id: String,
        error: String,
        is_current: bool,
    },
    Finished {
        session_id: String,
        is_current: bool,
    },
    /// The stream is unknown or its conversation was deleted.
    Ignored,
}

struct ActiveStream {
    handle: ExchangeHandle,
    cancel_token: CancellationToken,
}

pub struct App {
    store: SessionStore,
    config: Config,
    /// Where backend switches are written back, if anywhere.
    config_file: Option<ConfigOrchestrator>,
    storage: LocalStorage,
    client: reqwest::Client,
    active_streams: HashMap<u64, ActiveStream>,
    next_stream_id: u64,
    notices: Vec<String>,
    /// Ask semantic interfaces for expert answers.
    pub semantic_thinking: bool,
    pub logging: LoggingState,
}

impl App {
    /// Build an app over `storage`, restoring any stored conversations.
    pub fn new(
        config: Config,
        storage: LocalStorage,
        log_file: Option<String>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let sessions = storage.load_sessions();
        debug!(
            count = sessions.len(),
            dir = %storage.dir().display(),
            "loaded conversations"
        );

        Ok(Self {
            store: SessionStore::from_sessions(sessions),
            config,
            config_file: None,
            storage,
            client: reqwest::Client::new(),
            active_streams: HashMap::new(),
            next_stream_id: 0,
            notices: Vec::new(),
            semantic_thinking: false,
            logging: LoggingState::new(log_file)?,
        })
    }

    /// Persist config changes made through the app to `path`.
    pub fn with_config_path(mut self, path: PathBuf) -> Self {
        self.config_file = Some(ConfigOrchestrator::new(path));
        self
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn current_session(&self) -> Option<&ChatSession> {
        self.store.current()
    }

    /// Queue a line of feedback for the front end.
    pub fn notify(&mut self, notice: impl Into<String>) {
        self.notices.push(notice.into());
    }

    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    fn save_sessions(&self) {
        if let Err(err) = self.storage.save_sessions(self.store.sessions()) {
            warn!(error = %err, "failed to save conversations");
        }
    }

    /// Start a conversation on a built-in interface. `url` overrides the
    /// catalog endpoint.
    pub fn create_session(&mut self, interface_type: InterfaceType, url: Option<String>) -> String {
        let endpoint = url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .or_else(|| {
                interface_type
                    .profile()
                    .map(|profile| profile.endpoint(self.config.backend_url()))
            })
            .unwrap_or_default();
        let name = interface_type.display_name();

        let id = self.store.create(interface_type, endpoint, &name);
        self.save_sessions();
        id
    }

    pub fn select_session(&mut self, id: &str) -> Result<(), UnknownSession> {
        self.store.select(id)
    }

    pub fn rename_session(&mut self, id: &str, title: &str) -> bool {
        let renamed = self.store.rename(id, title);
        if renamed {
            self.save_sessions();
        }
        renamed
    }

    /// Delete a conversation, cancelling any stream still writing into it.
    pub fn delete_session(&mut self, id: &str) -> Option<ChatSession> {
        let removed = self.store.delete(id)?;
        self.active_streams.retain(|stream_id, stream| {
            if stream.handle.session_id == id {
                debug!(stream_id, session_id = %id, "cancelling stream of deleted conversation");
                stream.cancel_token.cancel();
                false
            } else {
                true
            }
        });
        self.save_sessions();
        Some(removed)
    }

    /// Switch backends. With a config path set, the flag is written into
    /// the file as it is on disk now and the app adopts that config.
    pub fn set_use_custom_backend(&mut self, use_custom: bool) -> Result<(), ConfigError> {
        match &self.config_file {
            Some(file) => {
                self.config = file.mutate(|config| {
                    config.use_custom_backend = use_custom;
                    Ok::<_, ConfigError>(config.clone())
                })?;
            }
            None => self.config.use_custom_backend = use_custom,
        }
        Ok(())
    }

    pub fn is_streaming(&self, session_id: &str) -> bool {
        self.active_streams
            .values()
            .any(|stream| stream.handle.session_id == session_id)
    }

    /// True while the selected conversation is receiving a response.
    pub fn is_loading(&self) -> bool {
        self.store
            .current_id()
            .is_some_and(|id| self.is_streaming(id))
    }

    pub fn active_stream_count(&self) -> usize {
        self.active_streams.len()
    }

    fn backend_for(&self, session: &ChatSession) -> StreamBackend {
        if self.config.use_custom_backend {
            StreamBackend::Custom {
                url: session.backend_url.clone(),
            }
        } else {
            StreamBackend::Gemini {
                base_url: self.config.gemini_base_url().to_string(),
                api_key: self.config.resolve_api_key(),
                model: self.config.gemini_model().to_string(),
            }
        }
    }

    /// Record the user's turn in the current conversation and prepare the
    /// stream that will fill in the answer.
    pub fn send_message(
        &mut self,
        text: &str,
        semantic_thinking: bool,
    ) -> Result<StreamParams, SendError> {
        if text.trim().is_empty() {
            return Err(SendError::EmptyMessage);
        }
        let session = self.store.current().ok_or(SendError::NoSession)?;
        if self.is_streaming(&session.id) {
            return Err(SendError::Busy {
                title: session.title.clone(),
            });
        }

        let session_id = session.id.clone();
        let backend = self.backend_for(session);
        let request = BackendRequest {
            text: text.to_string(),
            enable_semantic_thinking: session.effective_semantic_thinking(semantic_thinking),
            stream: true,
        };

        let handle = self
            .store
            .begin_exchange(&session_id, text)
            .map_err(|_| SendError::NoSession)?;

        self.next_stream_id += 1;
        let stream_id = self.next_stream_id;
        let cancel_token = CancellationToken::new();
        self.active_streams.insert(
            stream_id,
            ActiveStream {
                handle,
                cancel_token: cancel_token.clone(),
            },
        );
        debug!(stream_id, session_id = %session_id, backend = backend.label(), "turn started");

        if let Some(user_message) = self
            .store
            .get(&session_id)
            .and_then(|s| s.messages.iter().rev().find(|m| m.is_user()))
        {
            if let Err(err) = self.logging.log_transcript_message(user_message) {
                warn!(error = %err, "failed to write transcript log");
            }
        }
        self.save_sessions();

        Ok(StreamParams {
            client: self.client.clone(),
            backend,
            request,
            cancel_token,
            stream_id,
        })
    }

    /// Apply one stream message to the conversation it belongs to.
    pub fn handle_stream_message(&mut self, message: StreamMessage, stream_id: u64) -> StreamUpdate {
        let Some(stream) = self.active_streams.get(&stream_id) else {
            return StreamUpdate::Ignored;
        };
        let handle = stream.handle.clone();
        let is_current = self.store.current_id() == Some(handle.session_id.as_str());

        match message {
            StreamMessage::Chunk(text) => {
                if !self.store.append_chunk(&handle, &text) {
                    self.active_streams.remove(&stream_id);
                    return StreamUpdate::Ignored;
                }
                StreamUpdate::Chunk {
                    session_id: handle.session_id,
                    text,
                    is_current,
                }
            }
            StreamMessage::Error(error) => {
                if !self.store.fail_exchange(&handle, &error) {
                    self.active_streams.remove(&stream_id);
                    return StreamUpdate::Ignored;
                }
                warn!(stream_id, session_id = %handle.session_id, "stream failed");
                StreamUpdate::Failed {
                    session_id: handle.session_id,
                    error,
                    is_current,
                }
            }
            StreamMessage::End => {
                self.active_streams.remove(&stream_id);
                if !self.store.finish_exchange(&handle) {
                    return StreamUpdate::Ignored;
                }
                if let Some(answer) = self.store.exchange_content(&handle) {
                    if let Err(err) = self.logging.log_transcript_message(answer) {
                        warn!(error = %err, "failed to write transcript log");
                    }
                }
                self.save_sessions();
                debug!(stream_id, session_id = %handle.session_id, "turn finished");
                StreamUpdate::Finished {
                    session_id: handle.session_id,
                    is_current,
                }
            }
        }
    }

    /// Cancel every running stream, e.g. on shutdown. Partial answers are
    /// kept as they are.
    pub fn cancel_all_streams(&mut self) {
        for (_, stream) in self.active_streams.drain() {
            stream.cancel_token.cancel();
        }
        self.save_sessions();
    }
}
