//! CellKit Settings Crate
//!
//! Handles engine and editor configuration and its persistence.

pub mod config;
pub mod error;

pub use config::{default_config_path, Config, DisplaySettings, UndoSettings};
pub use error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
