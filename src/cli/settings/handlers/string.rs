//! Optional text settings.

use std::path::PathBuf;

use crate::cli::settings::error::SettingError;
use crate::cli::settings::helpers::mask_secret;
use crate::cli::settings::SettingHandler;
use crate::core::config::data::{path_display, Config, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};

/// Data-driven handler for settings stored as an optional string.
pub struct OptionalStringHandler {
    key: &'static str,
    hint: &'static str,
    example: &'static str,
    default_display: &'static str,
    secret: bool,
    get: fn(&Config) -> Option<String>,
    set_field: fn(&mut Config, Option<String>),
}

impl SettingHandler for OptionalStringHandler {
    fn key(&self) -> &'static str {
        self.key
    }

    fn set(&self, args: &[String], config: &mut Config) -> Result<String, SettingError> {
        let value = args.join(" ").trim().to_string();
        if value.is_empty() {
            return Err(SettingError::MissingArgs {
                hint: self.hint,
                example: self.example,
            });
        }

        let display = self.display_value(&value);
        (self.set_field)(config, Some(value));
        Ok(format!("✅ Set {} to: {}", self.key, display))
    }

    fn unset(&self, config: &mut Config) -> Result<String, SettingError> {
        (self.set_field)(config, None);
        Ok(format!(
            "✅ Unset {} (will use default: {})",
            self.key, self.default_display
        ))
    }

    fn format(&self, config: &Config) -> String {
        match (self.get)(config) {
            Some(value) => format!("  {}: {}", self.key, self.display_value(&value)),
            None => format!("  {}: (unset, default: {})", self.key, self.default_display),
        }
    }
}

impl OptionalStringHandler {
    fn display_value(&self, value: &str) -> String {
        if self.secret {
            mask_secret(value)
        } else {
            value.to_string()
        }
    }
}

pub fn backend_url_handler() -> OptionalStringHandler {
    OptionalStringHandler {
        key: "backend-url",
        hint: "To move built-in interfaces onto another host, provide its base URL:",
        example: "jiuding set backend-url http://127.0.0.1:28001",
        default_display: "built-in interface URLs",
        secret: false,
        get: |config| config.backend_url.clone(),
        set_field: |config, value| config.backend_url = value,
    }
}

pub fn api_key_handler() -> OptionalStringHandler {
    OptionalStringHandler {
        key: "api-key",
        hint: "To store a Gemini API key, provide it after the key name:",
        example: "jiuding set api-key AIza...",
        default_display: "GEMINI_API_KEY / API_KEY environment",
        secret: true,
        get: |config| config.api_key.clone(),
        set_field: |config, value| config.api_key = value,
    }
}

pub fn gemini_model_handler() -> OptionalStringHandler {
    OptionalStringHandler {
        key: "gemini-model",
        hint: "To pick the Gemini model, provide its name:",
        example: "jiuding set gemini-model gemini-2.5-flash",
        default_display: DEFAULT_GEMINI_MODEL,
        secret: false,
        get: |config| config.gemini_model.clone(),
        set_field: |config, value| config.gemini_model = value,
    }
}

pub fn gemini_base_url_handler() -> OptionalStringHandler {
    OptionalStringHandler {
        key: "gemini-base-url",
        hint: "To route Gemini requests elsewhere, provide the API base URL:",
        example: "jiuding set gemini-base-url https://generativelanguage.googleapis.com/v1beta",
        default_display: DEFAULT_GEMINI_BASE_URL,
        secret: false,
        get: |config| config.gemini_base_url.clone(),
        set_field: |config, value| config.gemini_base_url = value,
    }
}

pub fn data_dir_handler() -> OptionalStringHandler {
    OptionalStringHandler {
        key: "data-dir",
        hint: "To store conversations elsewhere, provide a directory:",
        example: "jiuding set data-dir ~/chats",
        default_display: "platform data directory",
        secret: false,
        get: |config| config.data_dir.as_ref().map(path_display),
        set_field: |config, value| config.data_dir = value.map(PathBuf::from),
    }
}
