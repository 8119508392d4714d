//! Directory-backed key-value storage for JSON documents.
//!
//! Each key maps to `<dir>/<key>.json`. Writes replace the whole document
//! atomically through a temp file in the same directory.

use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tempfile::NamedTempFile;
use tracing::warn;

use crate::core::config::data::path_display;
use crate::core::session::ChatSession;

pub const SESSIONS_KEY: &str = "chat_sessions_v2";

#[derive(Debug)]
pub enum StorageError {
    /// The key contains characters that cannot form a file name.
    InvalidKey(String),

    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    Serialize(serde_json::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::InvalidKey(key) => write!(f, "Invalid storage key '{key}'"),
            StorageError::Io { path, source } => {
                write!(f, "Storage error at {}: {}", path_display(path), source)
            }
            StorageError::Serialize(err) => write!(f, "Failed to encode stored data: {err}"),
        }
    }
}

impl StdError for StorageError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            StorageError::InvalidKey(_) => None,
            StorageError::Io { source, .. } => Some(source),
            StorageError::Serialize(err) => Some(err),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocalStorage {
    dir: PathBuf,
}

impl LocalStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Storage under the platform data directory, or `override_dir` if set.
    pub fn open_default(override_dir: Option<&Path>) -> Result<Self, Box<dyn StdError>> {
        if let Some(dir) = override_dir {
            return Ok(Self::new(dir));
        }
        let proj_dirs = ProjectDirs::from("org", "jiuding", "jiuding")
            .ok_or("Failed to determine data directory")?;
        Ok(Self::new(proj_dirs.data_dir()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }

    pub fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    pub fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let io_err = |source| StorageError::Io {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(io_err)?;
        let mut temp_file = NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        temp_file.write_all(value.as_bytes()).map_err(io_err)?;
        temp_file.as_file_mut().sync_all().map_err(io_err)?;
        temp_file
            .persist(&path)
            .map_err(|err| io_err(err.error))?;
        Ok(())
    }

    pub fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    /// Stored conversations, newest first. Unreadable or corrupt data
    /// yields an empty list.
    pub fn load_sessions(&self) -> Vec<ChatSession> {
        let raw = match self.get_item(SESSIONS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!(error = %err, "failed to read stored conversations");
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(sessions) => sessions,
            Err(err) => {
                warn!(error = %err, "stored conversations are corrupt; starting empty");
                Vec::new()
            }
        }
    }

    pub fn save_sessions(&self, sessions: &[ChatSession]) -> Result<(), StorageError> {
        let json = serde_json::to_string(sessions).map_err(StorageError::Serialize)?;
        self.set_item(SESSIONS_KEY, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::Message;
    use crate::core::session::InterfaceType;
    use tempfile::TempDir;

    #[test]
    fn missing_key_reads_as_none() {
        let temp_dir = TempDir::new().expect("temp dir");
        let storage = LocalStorage::new(temp_dir.path());
        assert_eq!(storage.get_item("absent").unwrap(), None);
        assert!(storage.load_sessions().is_empty());
    }

    #[test]
    fn set_item_overwrites_whole_document() {
        let temp_dir = TempDir::new().expect("temp dir");
        let storage = LocalStorage::new(temp_dir.path().join("nested"));
        storage.set_item("doc", "{\"a\":1,\"b\":2}").unwrap();
        storage.set_item("doc", "[]").unwrap();
        assert_eq!(storage.get_item("doc").unwrap().as_deref(), Some("[]"));

        storage.remove_item("doc").unwrap();
        assert_eq!(storage.get_item("doc").unwrap(), None);
        storage.remove_item("doc").unwrap();
    }

    #[test]
    fn keys_cannot_escape_the_directory() {
        let temp_dir = TempDir::new().expect("temp dir");
        let storage = LocalStorage::new(temp_dir.path());
        for key in ["../evil", "a/b", "", ".hidden"] {
            assert!(matches!(
                storage.set_item(key, "x"),
                Err(StorageError::InvalidKey(_))
            ));
        }
    }

    #[test]
    fn sessions_survive_a_save_load_cycle() {
        let temp_dir = TempDir::new().expect("temp dir");
        let storage = LocalStorage::new(temp_dir.path());

        let mut session = ChatSession::new(InterfaceType::Semantic, "http://a".into(), "Semantic conversion");
        session.messages.push(Message::user("hi"));
        let mut failed = Message::assistant_placeholder();
        failed.content = "Backend request failed (502): bad gateway".into();
        failed.is_error = true;
        session.messages.push(failed);

        storage.save_sessions(std::slice::from_ref(&session)).unwrap();
        let loaded = storage.load_sessions();
        assert_eq!(loaded, vec![session]);
    }

    #[test]
    fn corrupt_session_document_loads_empty() {
        let temp_dir = TempDir::new().expect("temp dir");
        let storage = LocalStorage::new(temp_dir.path());
        storage.set_item(SESSIONS_KEY, "{not json").unwrap();
        assert!(storage.load_sessions().is_empty());
    }
}
