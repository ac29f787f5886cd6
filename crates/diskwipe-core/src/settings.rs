//! Persistent user settings for diskwipe
//!
//! Settings live in a TOML file. A file named `diskwipe_settings.toml` next
//! to the executable takes precedence (portable installs); otherwise the file
//! is kept in the user configuration directory:
//! - Linux/macOS: `~/.config/diskwipe/diskwipe_settings.toml`
//! - Windows: `%APPDATA%\diskwipe\diskwipe_settings.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! allow_fixed_disk = false
//! mode = "secure-random"
//!
//! [progress]
//! "4C530001230516110342" = 734003200
//! ```

use crate::config::Policy;
use crate::pattern::EraseMode;
use crate::resume::ProgressStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "diskwipe_settings.toml";

/// Application name for config directory
const APP_NAME: &str = "diskwipe";

/// User settings loaded from the configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Allow erasing non-removable disks
    pub allow_fixed_disk: bool,

    /// Pattern used for new runs
    pub mode: EraseMode,

    /// Unfinished runs: device identifier → last saved offset
    pub progress: BTreeMap<String, u64>,
}

impl Settings {
    /// Load settings from the configuration file
    ///
    /// Returns default settings if the file doesn't exist or can't be parsed
    pub fn load() -> Self {
        Self::load_from_path(Self::config_path())
    }

    /// Load settings from a specific path
    pub fn load_from_path(path: Option<PathBuf>) -> Self {
        let Some(path) = path else {
            tracing::debug!("No config path available, using defaults");
            return Self::default();
        };

        if !path.exists() {
            tracing::debug!("Settings file not found at {:?}, using defaults", path);
            return Self::default();
        }

        match Self::read(&path) {
            Ok(settings) => {
                tracing::debug!("Loaded settings from {:?}", path);
                settings
            }
            Err(e) => {
                tracing::warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Read and parse a settings file, reporting failures
    pub fn read(path: &Path) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path).map_err(|e| SettingsError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&contents).map_err(SettingsError::Deserialize)
    }

    /// Save settings to the configuration file
    pub fn save(&self) -> Result<PathBuf, SettingsError> {
        self.save_to_path(Self::config_path())
    }

    /// Save settings to a specific path
    ///
    /// The file is written to a temporary sibling first and renamed into
    /// place, so an interrupted save never leaves a truncated file.
    pub fn save_to_path(&self, path: Option<PathBuf>) -> Result<PathBuf, SettingsError> {
        let path = path.ok_or(SettingsError::NoConfigDir)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SettingsError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let contents = toml::to_string_pretty(self).map_err(SettingsError::Serialize)?;

        let temp_path = path.with_extension("toml.tmp");
        std::fs::write(&temp_path, contents).map_err(|e| SettingsError::Io {
            path: temp_path.clone(),
            source: e,
        })?;
        std::fs::rename(&temp_path, &path).map_err(|e| SettingsError::Io {
            path: path.clone(),
            source: e,
        })?;

        tracing::debug!("Saved settings to {:?}", path);
        Ok(path)
    }

    /// Get the path to the configuration file
    ///
    /// A settings file beside the executable wins when it exists.
    pub fn config_path() -> Option<PathBuf> {
        Self::portable_path()
            .filter(|p| p.exists())
            .or_else(|| Self::config_dir().map(|p| p.join(CONFIG_FILE_NAME)))
    }

    /// Path of the settings file beside the running executable
    pub fn portable_path() -> Option<PathBuf> {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(CONFIG_FILE_NAME)))
    }

    /// Get the path to the configuration directory
    pub fn config_dir() -> Option<PathBuf> {
        dirs_next::config_dir().map(|p| p.join(APP_NAME))
    }

    /// Generate a default configuration file content as a string
    pub fn default_config_string() -> String {
        let default = Self::default();
        toml::to_string_pretty(&default)
            .unwrap_or_else(|_| String::from("# Failed to generate default config"))
    }

    /// The caller-facing policy part of these settings
    pub fn policy(&self) -> Policy {
        Policy::new()
            .allow_fixed_disk(self.allow_fixed_disk)
            .mode(self.mode)
    }

    /// Forget every saved run; returns how many entries were dropped
    pub fn clear_progress(&mut self) -> usize {
        let count = self.progress.len();
        self.progress.clear();
        count
    }
}

/// Progress store that writes through to a settings file
///
/// Every `set` and `remove` updates the in-memory settings first and then
/// saves the whole file. A failed save leaves the in-memory state updated.
#[derive(Debug)]
pub struct SettingsProgressStore<'a> {
    settings: &'a mut Settings,
    path: Option<PathBuf>,
}

impl<'a> SettingsProgressStore<'a> {
    /// Store backed by `settings`, saved to `path` on every change
    ///
    /// With no path, changes stay in memory.
    pub fn new(settings: &'a mut Settings, path: Option<PathBuf>) -> Self {
        Self { settings, path }
    }

    fn persist(&self) -> crate::Result<()> {
        match &self.path {
            Some(path) => self
                .settings
                .save_to_path(Some(path.clone()))
                .map(|_| ())
                .map_err(|e| crate::Error::Io(std::io::Error::other(e))),
            None => Ok(()),
        }
    }
}

impl ProgressStore for SettingsProgressStore<'_> {
    fn get(&self, identifier: &str) -> Option<u64> {
        self.settings.progress.get(identifier).copied()
    }

    fn set(&mut self, identifier: &str, offset: u64) -> crate::Result<()> {
        self.settings
            .progress
            .insert(identifier.to_string(), offset);
        self.persist()
    }

    fn remove(&mut self, identifier: &str) -> crate::Result<()> {
        if self.settings.progress.remove(identifier).is_some() {
            self.persist()
        } else {
            Ok(())
        }
    }
}

/// Errors that can occur when working with settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// No configuration directory available
    #[error("Could not determine configuration directory")]
    NoConfigDir,

    /// Failed to read or write config file
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path that caused the error
        path: PathBuf,
        /// The underlying error
        source: std::io::Error,
    },

    /// Failed to serialize settings
    #[error("Failed to serialize settings: {0}")]
    Serialize(toml::ser::Error),

    /// Failed to deserialize settings
    #[error("Failed to parse settings: {0}")]
    Deserialize(toml::de::Error),
}
