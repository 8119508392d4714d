use crate::core::config::data::Config;
use crate::core::config::io::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, MutexGuard};
use std::time::SystemTime;

/// Last parsed config and the mtime it was read at.
struct Snapshot {
    config: Config,
    stamp: Option<SystemTime>,
}

/// Process-wide view of `config.toml`. Reads are served from memory until
/// the file's mtime moves, so edits from another process are picked up.
pub(crate) struct ConfigOrchestrator {
    path: PathBuf,
    cached: Mutex<Option<Snapshot>>,
}

static SHARED: LazyLock<ConfigOrchestrator> =
    LazyLock::new(|| ConfigOrchestrator::new(Config::get_config_path()));

fn stamp_of(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

impl ConfigOrchestrator {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self {
            path,
            cached: Mutex::new(None),
        }
    }

    fn guard(&self) -> MutexGuard<'_, Option<Snapshot>> {
        self.cached
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn current(&self, cached: &mut Option<Snapshot>) -> Result<Config, ConfigError> {
        let stamp = stamp_of(&self.path);
        match cached {
            Some(snapshot) if snapshot.stamp == stamp => Ok(snapshot.config.clone()),
            _ => {
                let config = Config::load_from_path(&self.path)?;
                *cached = Some(Snapshot {
                    config: config.clone(),
                    stamp,
                });
                Ok(config)
            }
        }
    }

    pub(crate) fn load_with_cache(&self) -> Result<Config, ConfigError> {
        let mut cached = self.guard();
        self.current(&mut cached)
    }

    fn store(&self, config: Config) -> Result<(), ConfigError> {
        config.save_to_path(&self.path)?;
        *self.guard() = Some(Snapshot {
            stamp: stamp_of(&self.path),
            config,
        });
        Ok(())
    }

    /// Run `edit` on a fresh copy and write it back only if `edit` succeeds.
    pub(crate) fn mutate<T, E, F>(&self, edit: F) -> Result<T, E>
    where
        E: From<ConfigError>,
        F: FnOnce(&mut Config) -> Result<T, E>,
    {
        let mut working = {
            let mut cached = self.guard();
            self.current(&mut cached)?
        };
        let value = edit(&mut working)?;
        self.store(working)?;
        Ok(value)
    }
}

impl Config {
    pub fn load() -> Result<Config, ConfigError> {
        SHARED.load_with_cache()
    }

    pub fn mutate<T, E, F>(edit: F) -> Result<T, E>
    where
        E: From<ConfigError>,
        F: FnOnce(&mut Config) -> Result<T, E>,
    {
        SHARED.mutate(edit)
    }

    pub fn config_path() -> PathBuf {
        SHARED.path.clone()
    }
}
