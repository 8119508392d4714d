//! Error types for settings operations.

use crate::core::config::io::ConfigError;
use std::fmt;

#[derive(Debug)]
pub enum SettingError {
    UnknownKey(String),
    InvalidChoice {
        key: &'static str,
        input: String,
        choices: &'static [&'static str],
    },
    MissingArgs {
        hint: &'static str,
        example: &'static str,
    },
    /// Reading or saving the config file failed.
    ConfigError(String),
}

impl SettingError {
    /// Follow-up line telling the user how to recover, if there is one.
    pub fn hint(&self) -> Option<String> {
        match self {
            SettingError::UnknownKey(_) => {
                Some("Run 'jiuding config' to list available keys.".to_string())
            }
            SettingError::InvalidChoice { choices, .. } => {
                Some(format!("Use one of: {}", choices.join(", ")))
            }
            SettingError::MissingArgs { example, .. } => Some(format!("Example: {example}")),
            SettingError::ConfigError(_) => None,
        }
    }

    /// Print the error and its hint to stderr.
    pub fn print(&self) {
        let icon = match self {
            SettingError::MissingArgs { .. } => "⚠️ ",
            _ => "❌",
        };
        eprintln!("{icon} {self}");
        if let Some(hint) = self.hint() {
            eprintln!("   {hint}");
        }
    }

    /// Usage mistakes exit with 2, everything else with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            SettingError::InvalidChoice { .. } | SettingError::MissingArgs { .. } => 2,
            SettingError::UnknownKey(_) | SettingError::ConfigError(_) => 1,
        }
    }
}

impl fmt::Display for SettingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingError::UnknownKey(key) => write!(f, "Unknown config key: {key}"),
            SettingError::InvalidChoice { key, input, .. } => {
                write!(f, "Invalid value for {key}: {input}")
            }
            SettingError::MissingArgs { hint, .. } => write!(f, "{hint}"),
            SettingError::ConfigError(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for SettingError {}

impl From<ConfigError> for SettingError {
    fn from(err: ConfigError) -> Self {
        SettingError::ConfigError(err.to_string())
    }
}
