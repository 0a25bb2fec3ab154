//! Catalog settings (database location, import threads, search limit).
//!
//! The settings file lives at `~/.config/chart-catalog/settings.toml`. Every
//! field is optional; a missing file yields the defaults.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::worker_pool::WorkerPool;

/// Default number of results returned by a search.
pub const DEFAULT_SEARCH_LIMIT: u32 = 100;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid settings file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Could not serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Catalog database file. `None` uses [`default_database_path`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
    /// Import worker count. `None` sizes the pool from available parallelism.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_threads: Option<usize>,
    pub search_limit: u32,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            database_path: None,
            import_threads: None,
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

/// Canonical path to the settings file: `~/.config/chart-catalog/settings.toml`.
pub fn settings_path() -> PathBuf {
    let config = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    config.join("chart-catalog").join("settings.toml")
}

/// Default database file: `~/.local/share/chart-catalog/catalog.db` on Linux.
pub fn default_database_path() -> PathBuf {
    let data = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    data.join("chart-catalog").join("catalog.db")
}

impl CatalogSettings {
    /// Load from [`settings_path`].
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_from(&settings_path())
    }

    /// Load from `path`, falling back to defaults if the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("No settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&contents).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save to [`settings_path`].
    pub fn save(&self) -> Result<(), SettingsError> {
        self.save_to(&settings_path())
    }

    /// Write the settings to `path` atomically.
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let serialized = toml::to_string_pretty(self)?;
        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, &serialized)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(default_database_path)
    }

    pub fn import_threads(&self) -> usize {
        self.import_threads
            .unwrap_or_else(WorkerPool::default_size)
            .max(1)
    }
}
