//! gcodeprep Settings Crate
//!
//! Handles the configuration file: preprocessing defaults and logging.

pub mod config;
pub mod error;

pub use config::{Config, LoggingSettings, PreprocessingSettings};
pub use error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
