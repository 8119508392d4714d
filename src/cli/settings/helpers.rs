//! Helper functions for settings operations.

use crate::core::config::data::Config;

use super::error::SettingError;
use super::SettingRegistry;

/// Apply `set` for `key` to the stored config and persist it.
pub fn set_and_persist(
    registry: &SettingRegistry,
    key: &str,
    args: &[String],
) -> Result<String, SettingError> {
    let handler = registry
        .get(key)
        .ok_or_else(|| SettingError::UnknownKey(key.to_string()))?;
    mutate_config(|config| handler.set(args, config))
}

/// Apply `unset` for `key` to the stored config and persist it.
pub fn unset_and_persist(registry: &SettingRegistry, key: &str) -> Result<String, SettingError> {
    let handler = registry
        .get(key)
        .ok_or_else(|| SettingError::UnknownKey(key.to_string()))?;
    mutate_config(|config| handler.unset(config))
}

fn mutate_config<F>(f: F) -> Result<String, SettingError>
where
    F: FnOnce(&mut Config) -> Result<String, SettingError>,
{
    Config::mutate(f)
}

/// Show a secret with everything but the last four characters hidden.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_secret_keeps_last_four() {
        assert_eq!(mask_secret("abcdefgh"), "****efgh");
        assert_eq!(mask_secret("abc"), "***");
        assert_eq!(mask_secret(""), "");
    }
}
