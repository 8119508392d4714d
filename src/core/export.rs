//! Plain-text conversation export.

use std::fmt;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::core::message::Role;
use crate::core::session::ChatSession;

#[derive(Debug)]
pub enum ExportError {
    Empty,
    AlreadyExists(PathBuf),
    Io(std::io::Error),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Empty => write!(f, "Nothing to export; the conversation is empty."),
            ExportError::AlreadyExists(path) => write!(
                f,
                "File '{}' already exists. Choose a different filename.",
                path.display()
            ),
            ExportError::Io(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        ExportError::Io(err)
    }
}

/// Lowercase the title and collapse everything that is not alphanumeric
/// into single dashes.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for ch in title.chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "chat".to_string()
    } else {
        slug.to_string()
    }
}

pub fn default_export_filename(session: &ChatSession, date: NaiveDate) -> String {
    format!(
        "jiuding-{}-{}.txt",
        slugify(&session.title),
        date.format("%Y-%m-%d")
    )
}

pub fn render_transcript(session: &ChatSession) -> String {
    let mut out = format!(
        "# {}\nInterface: {} ({})\n\n",
        session.title,
        session.interface_type.display_name(),
        session.backend_url
    );
    for message in &session.messages {
        let prefix = match message.role {
            Role::User => "You",
            Role::Assistant if message.is_error => "Error",
            Role::Assistant => "Assistant",
            Role::System => "System",
        };
        out.push_str(prefix);
        out.push_str(": ");
        out.push_str(message.content.trim_end());
        out.push_str("\n\n");
    }
    out
}

/// Write `session` to `path`. An existing file is never replaced.
pub fn export_session(session: &ChatSession, path: &Path) -> Result<(), ExportError> {
    if session.messages.is_empty() {
        return Err(ExportError::Empty);
    }

    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|err| match err.kind() {
            std::io::ErrorKind::AlreadyExists => ExportError::AlreadyExists(path.to_path_buf()),
            _ => ExportError::Io(err),
        })?;

    let mut writer = BufWriter::new(file);
    writer.write_all(render_transcript(session).as_bytes())?;
    writer.flush()?;
    Ok(())
}
