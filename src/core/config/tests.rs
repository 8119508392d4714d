use super::data::{
    parse_backend, path_display, Config, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL,
};
use super::io::ConfigError;
use super::orchestrator::ConfigOrchestrator;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn config_orchestrator_detects_external_updates() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    let orchestrator = ConfigOrchestrator::new(config_path.clone());

    orchestrator
        .mutate(|config| {
            config.gemini_model = Some("first".to_string());
            Ok::<_, ConfigError>(())
        })
        .expect("mutate failed");

    let persisted = Config::load_from_path(&config_path).expect("load failed");
    assert_eq!(persisted.gemini_model.as_deref(), Some("first"));

    let cached = orchestrator.load_with_cache().expect("cached load failed");
    assert_eq!(cached.gemini_model.as_deref(), Some("first"));

    std::thread::sleep(Duration::from_millis(1100));

    let external = Config {
        gemini_model: Some("second".to_string()),
        ..Default::default()
    };
    external
        .save_to_path(&config_path)
        .expect("external save failed");

    let reloaded = orchestrator.load_with_cache().expect("reload failed");
    assert_eq!(reloaded.gemini_model.as_deref(), Some("second"));
}

#[test]
fn mutate_does_not_persist_when_mutator_fails() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    let orchestrator = ConfigOrchestrator::new(config_path.clone());

    #[derive(Debug)]
    enum Rejected {
        ByEditor,
        Config(ConfigError),
    }
    impl From<ConfigError> for Rejected {
        fn from(err: ConfigError) -> Self {
            Rejected::Config(err)
        }
    }

    let result: Result<(), Rejected> = orchestrator.mutate(|config| {
        config.use_custom_backend = false;
        Err(Rejected::ByEditor)
    });

    assert!(matches!(result, Err(Rejected::ByEditor)));
    assert!(!config_path.exists());
    assert!(orchestrator.load_with_cache().unwrap().use_custom_backend);
}

#[test]
fn test_load_nonexistent_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nonexistent_config.toml");

    let config = Config::load_from_path(&config_path).expect("Failed to load config");

    assert_eq!(config, Config::default());
    assert!(config.use_custom_backend);
}

#[test]
fn test_config_persistence_lifecycle() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nested").join("config.toml");

    let config = Config {
        use_custom_backend: false,
        api_key: Some("key".to_string()),
        data_dir: Some(PathBuf::from("/tmp/chats")),
        ..Default::default()
    };
    config
        .save_to_path(&config_path)
        .expect("Failed to save config");

    let mut loaded = Config::load_from_path(&config_path).expect("Failed to load config");
    assert_eq!(loaded, config);

    loaded.api_key = None;
    loaded.use_custom_backend = true;
    loaded.save_to_path(&config_path).expect("Failed to resave");

    let reloaded = Config::load_from_path(&config_path).expect("Failed to reload");
    assert_eq!(reloaded.api_key, None);
    assert!(reloaded.use_custom_backend);
    assert_eq!(reloaded.data_dir, Some(PathBuf::from("/tmp/chats")));
}

#[test]
fn missing_backend_flag_defaults_to_custom() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "gemini_model = \"gemini-pro\"\n").unwrap();

    let config = Config::load_from_path(&config_path).expect("Failed to load config");
    assert!(config.use_custom_backend);
    assert_eq!(config.gemini_model(), "gemini-pro");
}

#[test]
fn invalid_toml_reports_path() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "use_custom_backend = maybe").unwrap();

    let err = Config::load_from_path(&config_path).unwrap_err();
    assert!(err.to_string().starts_with("Failed to parse config at"));
}

#[test]
fn gemini_defaults_apply_to_blank_values() {
    let config = Config {
        gemini_model: Some("  ".to_string()),
        gemini_base_url: None,
        ..Default::default()
    };
    assert_eq!(config.gemini_model(), DEFAULT_GEMINI_MODEL);
    assert_eq!(config.gemini_base_url(), DEFAULT_GEMINI_BASE_URL);
    assert_eq!(config.backend_url(), None);
}

#[test]
fn api_key_resolution_order() {
    let env: HashMap<&str, &str> = [("GEMINI_API_KEY", "from-gemini"), ("API_KEY", "from-api")]
        .into_iter()
        .collect();
    let lookup = |name: &str| env.get(name).map(|v| v.to_string());

    let configured = Config {
        api_key: Some("from-config".to_string()),
        ..Default::default()
    };
    assert_eq!(
        configured.resolve_api_key_with(lookup).as_deref(),
        Some("from-config")
    );

    let unconfigured = Config::default();
    assert_eq!(
        unconfigured.resolve_api_key_with(lookup).as_deref(),
        Some("from-gemini")
    );

    let only_api_key = |name: &str| (name == "API_KEY").then(|| "from-api".to_string());
    assert_eq!(
        unconfigured.resolve_api_key_with(only_api_key).as_deref(),
        Some("from-api")
    );

    assert_eq!(unconfigured.resolve_api_key_with(|_| None), None);
}

#[cfg(unix)]
#[test]
fn path_display_abbreviates_home() {
    if let Some(home) = std::env::var_os("HOME") {
        let path = PathBuf::from(home).join("chats");
        assert_eq!(path_display(&path), "~/chats");
    }
    assert_eq!(path_display("/definitely/elsewhere"), "/definitely/elsewhere");
}

#[test]
fn parse_backend_accepts_names_and_aliases() {
    assert_eq!(parse_backend("custom"), Some(true));
    assert_eq!(parse_backend(" Private "), Some(true));
    assert_eq!(parse_backend("GEMINI"), Some(false));
    assert_eq!(parse_backend("demo"), Some(false));
    assert_eq!(parse_backend("openai"), None);
}
