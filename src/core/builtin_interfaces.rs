//! Built-in query interface catalog
//!
//! The catalog is embedded from `builtin_interfaces.toml` at build time and
//! lists the endpoints a new conversation can be bound to.

use serde::{Deserialize, Serialize};

use crate::core::session::InterfaceType;
use crate::utils::url::rebase_url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinInterface {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct BuiltinInterfacesConfig {
    interfaces: Vec<BuiltinInterface>,
}

impl BuiltinInterface {
    pub fn interface_type(&self) -> Option<InterfaceType> {
        self.id.parse().ok()
    }

    /// Endpoint for this interface, optionally moved onto another base URL.
    ///
    /// The path of the catalog URL is kept; only scheme, host and port come
    /// from `base_override`.
    pub fn endpoint(&self, base_override: Option<&str>) -> String {
        match base_override.map(str::trim).filter(|base| !base.is_empty()) {
            Some(base) => rebase_url(&self.url, base),
            None => self.url.clone(),
        }
    }
}

/// Load built-in interfaces from the embedded configuration
pub fn load_builtin_interfaces() -> Vec<BuiltinInterface> {
    const CONFIG_CONTENT: &str = include_str!("../builtin_interfaces.toml");

    match toml::from_str::<BuiltinInterfacesConfig>(CONFIG_CONTENT) {
        Ok(config) => config.interfaces,
        Err(err) => {
            tracing::error!(error = %err, "embedded interface catalog is invalid");
            Vec::new()
        }
    }
}

/// Find a built-in interface by ID (case-insensitive)
pub fn find_builtin_interface(id: &str) -> Option<BuiltinInterface> {
    load_builtin_interfaces()
        .into_iter()
        .find(|i| i.id.eq_ignore_ascii_case(id))
}

impl InterfaceType {
    pub fn profile(self) -> Option<BuiltinInterface> {
        find_builtin_interface(self.as_str())
    }

    pub fn display_name(self) -> String {
        self.profile()
            .map(|profile| profile.display_name)
            .unwrap_or_else(|| self.as_str().to_string())
    }
}
