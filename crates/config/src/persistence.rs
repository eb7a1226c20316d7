//! File system persistence for configuration
//!
//! Saves go through a temporary file in the same directory and an atomic
//! rename; the previous file is kept as `config.toml.backup`.

use crate::{Config, ConfigError, ConfigResult, ValidationError, CONFIG_VERSION};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Reads and writes one config file
#[derive(Debug, Clone)]
pub struct ConfigPersistence {
    config_path: PathBuf,
}

impl ConfigPersistence {
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Location of the copy kept from the previous save
    pub fn backup_path(&self) -> PathBuf {
        self.config_path.with_extension("toml.backup")
    }

    /// Loads configuration from file.
    ///
    /// A missing file yields the defaults. An empty or unparsable file is an
    /// error. Out-of-range values are logged and loaded anyway so the user
    /// can fix them by hand.
    pub fn load(&self) -> ConfigResult<Config> {
        if !self.config_path.exists() {
            log::info!(
                "No config file at {}, using defaults",
                self.config_path.display()
            );
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(&self.config_path).map_err(|source| {
            ConfigError::ReadError {
                path: self.config_path.clone(),
                source,
            }
        })?;

        if contents.trim().is_empty() {
            return Err(ConfigError::ReadError {
                path: self.config_path.clone(),
                source: io::Error::new(io::ErrorKind::InvalidData, "config file is empty"),
            });
        }

        let config: Config = toml::from_str(&contents).map_err(|source| ConfigError::ParseError {
            path: self.config_path.clone(),
            source,
        })?;

        if config.version > CONFIG_VERSION {
            log::warn!(
                "Config version {} is newer than supported version {}, reading it as-is",
                config.version,
                CONFIG_VERSION
            );
        }

        if let Err(errors) = config.validate() {
            log::warn!("Config validation warnings: {}", describe(&errors));
        }

        Ok(config)
    }

    /// Validates and writes `config` atomically
    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        config
            .validate()
            .map_err(|errors| ConfigError::ValidationError(describe(&errors)))?;

        let dir = self
            .config_path
            .parent()
            .ok_or_else(|| ConfigError::PathResolutionError {
                reason: format!("{} has no parent directory", self.config_path.display()),
            })?;

        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|source| ConfigError::DirectoryCreationError {
                path: dir.to_path_buf(),
                source,
            })?;
            log::info!("Created config directory: {}", dir.display());
        }

        if self.config_path.exists() {
            let backup = self.backup_path();
            fs::copy(&self.config_path, &backup).map_err(|source| ConfigError::BackupError { source })?;
            log::debug!("Backed up config to {}", backup.display());
        }

        let text = toml::to_string_pretty(config)?;

        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(text.as_bytes())?;
        temp.flush()?;
        temp.persist(&self.config_path)
            .map_err(|e| ConfigError::WriteError {
                path: self.config_path.clone(),
                source: e.error,
            })?;

        log::info!("Config saved to {}", self.config_path.display());
        Ok(())
    }

    /// Writes the default configuration
    pub fn generate_default(&self) -> ConfigResult<()> {
        self.save(&Config::default())?;

        log::info!("Generated default config at {}", self.config_path.display());
        Ok(())
    }
}

fn describe(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
