use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Send messages to the conversation's own endpoint instead of Gemini
    #[serde(default = "default_true")]
    pub use_custom_backend: bool,
    /// Base URL that replaces the host of built-in interface endpoints
    /// for newly created conversations
    pub backend_url: Option<String>,
    /// Gemini API key; GEMINI_API_KEY or API_KEY are used when unset
    pub api_key: Option<String>,
    pub gemini_model: Option<String>,
    pub gemini_base_url: Option<String>,
    /// Directory holding stored conversations
    pub data_dir: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            use_custom_backend: true,
            backend_url: None,
            api_key: None,
            gemini_model: None,
            gemini_base_url: None,
            data_dir: None,
        }
    }
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}

/// Map a backend name to `use_custom_backend`. `None` for unknown names.
pub fn parse_backend(input: &str) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "custom" | "private" | "on" | "true" => Some(true),
        "gemini" | "demo" | "off" | "false" => Some(false),
        _ => None,
    }
}

impl Config {
    pub fn gemini_model(&self) -> &str {
        non_empty(self.gemini_model.as_deref()).unwrap_or(DEFAULT_GEMINI_MODEL)
    }

    pub fn gemini_base_url(&self) -> &str {
        non_empty(self.gemini_base_url.as_deref()).unwrap_or(DEFAULT_GEMINI_BASE_URL)
    }

    pub fn backend_url(&self) -> Option<&str> {
        non_empty(self.backend_url.as_deref())
    }

    /// The configured key, then `GEMINI_API_KEY`, then `API_KEY`.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    pub(crate) fn resolve_api_key_with<F>(&self, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = non_empty(self.api_key.as_deref()) {
            return Some(key.to_string());
        }
        ["GEMINI_API_KEY", "API_KEY"]
            .into_iter()
            .filter_map(|name| lookup(name))
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
    }

    pub fn backend_label(&self) -> &'static str {
        if self.use_custom_backend {
            "custom"
        } else {
            "gemini"
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
