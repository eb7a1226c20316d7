//! pcmflow Configuration System
//!
//! Persistent defaults for the command line tools: which rate, format and
//! layout to convert to, how to re-block output, and how loud the logs are.
//!
//! # Architecture
//!
//! - **Sections**: each part of the file is a type implementing `ConfigSection`
//! - **Graceful degradation**: invalid values are reported as warnings on load
//! - **Atomic writes**: config files are never left half written
//!
//! # Example
//!
//! ```rust,no_run
//! use pcmflow_config::{Config, ConfigManager};
//!
//! let manager = ConfigManager::new().expect("Failed to initialize config");
//! let config = manager.load().unwrap_or_else(|e| {
//!     eprintln!("Config error: {}, using defaults", e);
//!     Config::default()
//! });
//!
//! println!("Target rate: {}", config.resample.sample_rate);
//! ```

mod error;
mod manager;
mod persistence;
mod validation;

pub mod app_config;
pub mod resample_config;

pub use error::{ConfigError, ConfigResult, ValidationError};
pub use manager::ConfigManager;
pub use persistence::ConfigPersistence;
pub use validation::{ConfigSection, Validator};

pub use app_config::{AppConfig, LogLevel};
pub use resample_config::ResampleConfig;

use serde::{Deserialize, Serialize};

/// Current config file format version
pub const CONFIG_VERSION: u32 = 1;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Config file format version
    pub version: u32,

    /// Application-level settings
    pub app: AppConfig,

    /// Conversion defaults
    pub resample: ResampleConfig,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the entire configuration
    ///
    /// Returns all validation errors found across all sections.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(mut e) = self.app.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.resample.validate() {
            errors.append(&mut e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Merges this config with another, preferring values from `other`
    pub fn merge(&mut self, other: Config) {
        self.app.merge(other.app);
        self.resample.merge(other.resample);
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            app: AppConfig::default(),
            resample: ResampleConfig::default(),
        }
    }
}
