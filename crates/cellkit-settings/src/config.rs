//! Configuration for CellKit
//!
//! Provides configuration file handling and validation. Supports JSON and
//! TOML files, stored by default in the platform configuration directory.
//!
//! Configuration is organized into sections:
//! - Undo settings (history length, debug checks, incremental design-rule checks)
//! - Display settings (redisplay area heuristics)

use crate::error::{ConfigError, SettingsError, SettingsResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default number of undo records kept.
pub const DEFAULT_HISTORY_LENGTH: usize = 25;

/// Undo/redo engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UndoSettings {
    /// Maximum number of committed records on each stack (0 = unbounded)
    pub history_length: usize,
    /// Warn when a transaction starts while the working record still holds changes
    pub debug_queue_check: bool,
    /// Log every individual repair made by the consistency pass
    pub verbose_repair: bool,
    /// Run an incremental design-rule check on newly committed objects
    pub incremental_drc: bool,
}

impl Default for UndoSettings {
    fn default() -> Self {
        Self {
            history_length: DEFAULT_HISTORY_LENGTH,
            debug_queue_check: cfg!(debug_assertions),
            verbose_repair: false,
            incremental_drc: true,
        }
    }
}

/// Display settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// A single union box is redrawn instead of two disjoint boxes when its
    /// area is at most this multiple of the two boxes' combined area
    pub redisplay_area_ratio: f64,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            redisplay_area_ratio: 1.0,
        }
    }
}

/// Complete configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Undo engine settings
    pub undo: UndoSettings,
    /// Display settings
    pub display: DisplaySettings,
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SettingsError::LoadError(format!("{}: {}", path.display(), e))
        })?;

        let config: Self = match Format::of(path)? {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match Format::of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)
            .map_err(|e| SettingsError::SaveError(format!("{}: {}", path.display(), e)))?;

        Ok(())
    }

    /// Load the config at `path`, or the defaults if the file does not exist
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::info!("No configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ratio = self.display.redisplay_area_ratio;
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(ConfigError::ValueOutOfRange {
                key: "display.redisplay_area_ratio".to_string(),
                value: ratio.to_string(),
            });
        }
        Ok(())
    }
}

enum Format {
    Json,
    Toml,
}

impl Format {
    fn of(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Format::Json),
            Some("toml") => Ok(Format::Toml),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}

/// Platform default location of the configuration file
pub fn default_config_path() -> SettingsResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("cellkit").join("config.toml"))
        .ok_or_else(|| {
            SettingsError::ConfigDirectory("no platform configuration directory".to_string())
        })
}
