//! Handler for choosing where messages are sent.

use crate::cli::settings::error::SettingError;
use crate::cli::settings::SettingHandler;
use crate::core::config::data::{parse_backend, Config};

const CHOICES: &[&str] = &["custom", "gemini"];

/// Handler for the `backend` setting.
pub struct BackendHandler;

impl SettingHandler for BackendHandler {
    fn key(&self) -> &'static str {
        "backend"
    }

    fn set(&self, args: &[String], config: &mut Config) -> Result<String, SettingError> {
        if args.is_empty() {
            return Err(SettingError::MissingArgs {
                hint: "To choose a backend, pass 'custom' or 'gemini':",
                example: "jiuding set backend gemini",
            });
        }

        let input = args.join(" ");
        let use_custom = parse_backend(&input).ok_or(SettingError::InvalidChoice {
            key: "backend",
            input,
            choices: CHOICES,
        })?;
        config.use_custom_backend = use_custom;
        Ok(format!("✅ Set backend to: {}", config.backend_label()))
    }

    fn unset(&self, config: &mut Config) -> Result<String, SettingError> {
        config.use_custom_backend = true;
        Ok("✅ Unset backend (will use default: custom)".to_string())
    }

    fn format(&self, config: &Config) -> String {
        format!("  backend: {}", config.backend_label())
    }
}
