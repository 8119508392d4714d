//! Settings management for CLI set/unset commands.
//!
//! Each configuration key has a handler that parses user input, applies it
//! to a [`Config`] and formats the current value for display:
//!
//! - Backend choice (`backend`: custom or gemini)
//! - Optional string settings (`backend-url`, `api-key`, `gemini-model`,
//!   `gemini-base-url`, `data-dir`)

pub mod error;
pub mod handlers;
pub mod helpers;
pub mod registry;

pub use error::SettingError;
pub use registry::SettingRegistry;

use crate::core::config::data::Config;

/// Trait for handling a configuration setting.
///
/// Handlers only touch the `Config` they are given; persisting the result
/// is up to the caller.
pub trait SettingHandler: Send + Sync {
    /// Returns the configuration key this handler manages.
    fn key(&self) -> &'static str;

    /// Set the configuration value from the arguments after the key.
    fn set(&self, args: &[String], config: &mut Config) -> Result<String, SettingError>;

    /// Unset (clear) the configuration value.
    fn unset(&self, config: &mut Config) -> Result<String, SettingError>;

    /// Format the current value for display in `jiuding config` output.
    fn format(&self, config: &Config) -> String;
}
