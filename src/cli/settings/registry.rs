//! Registry of setting handlers.

use std::collections::HashMap;

use super::handlers::{
    api_key_handler, backend_url_handler, data_dir_handler, gemini_base_url_handler,
    gemini_model_handler, BackendHandler,
};
use super::SettingHandler;
use crate::core::config::data::Config;

/// Registry of all available setting handlers.
pub struct SettingRegistry {
    handlers: HashMap<&'static str, Box<dyn SettingHandler>>,
    /// Keys in display order for `jiuding config` output.
    display_order: Vec<&'static str>,
}

impl SettingRegistry {
    /// Create a new registry with all handlers registered.
    pub fn new() -> Self {
        let mut registry = Self {
            handlers: HashMap::new(),
            display_order: Vec::new(),
        };

        registry.register(Box::new(BackendHandler));
        registry.register(Box::new(backend_url_handler()));
        registry.register(Box::new(api_key_handler()));
        registry.register(Box::new(gemini_model_handler()));
        registry.register(Box::new(gemini_base_url_handler()));
        registry.register(Box::new(data_dir_handler()));

        registry
    }

    fn register(&mut self, handler: Box<dyn SettingHandler>) {
        let key = handler.key();
        self.display_order.push(key);
        self.handlers.insert(key, handler);
    }

    /// Get a handler by key.
    pub fn get(&self, key: &str) -> Option<&dyn SettingHandler> {
        self.handlers.get(key).map(|h| h.as_ref())
    }

    /// Get all keys in display order.
    pub fn keys_display_order(&self) -> &[&'static str] {
        &self.display_order
    }

    /// One line per key, in display order.
    pub fn format_all(&self, config: &Config) -> Vec<String> {
        self.display_order
            .iter()
            .filter_map(|key| self.get(key))
            .map(|handler| handler.format(config))
            .collect()
    }
}

impl Default for SettingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_key_resolves_to_its_handler() {
        let registry = SettingRegistry::new();
        for key in registry.keys_display_order() {
            assert_eq!(registry.get(key).map(|h| h.key()), Some(*key));
        }
        assert!(registry.get("theme").is_none());
    }

    #[test]
    fn format_all_lists_backend_first() {
        let registry = SettingRegistry::new();
        let lines = registry.format_all(&Config::default());
        assert_eq!(lines.len(), registry.keys_display_order().len());
        assert_eq!(lines[0], "  backend: custom");
    }
}
