//! Configuration manager - main API for config operations

use crate::persistence::ConfigPersistence;
use crate::{Config, ConfigError, ConfigResult, LogLevel};
use directories::ProjectDirs;
use pcmflow_core::{ChannelLayout, SampleFormat};
use std::path::{Path, PathBuf};
use std::str::FromStr;

const CONFIG_FILE: &str = "config.toml";

/// Prefix of environment variables that override file values
pub const ENV_PREFIX: &str = "PCMFLOW";

/// Loads, saves and locates the configuration file
pub struct ConfigManager {
    persistence: ConfigPersistence,
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Creates a manager for the platform config directory:
    /// - Linux: `~/.config/pcmflow/`
    /// - macOS: `~/Library/Application Support/pcmflow/`
    /// - Windows: `%APPDATA%\pcmflow\`
    pub fn new() -> ConfigResult<Self> {
        let config_dir = Self::default_config_dir()?;
        Self::with_directory(config_dir)
    }

    /// Creates a config manager with a custom config directory
    pub fn with_directory(config_dir: PathBuf) -> ConfigResult<Self> {
        let persistence = ConfigPersistence::new(config_dir.join(CONFIG_FILE));

        Ok(Self {
            persistence,
            config_dir,
        })
    }

    fn default_config_dir() -> ConfigResult<PathBuf> {
        ProjectDirs::from("", "", "pcmflow")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or_else(|| ConfigError::PathResolutionError {
                reason: "Could not determine user config directory".to_string(),
            })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Full path of the config file
    pub fn config_path(&self) -> PathBuf {
        self.persistence.config_path().to_path_buf()
    }

    /// Loads the configuration, or the defaults if there is no file
    pub fn load(&self) -> ConfigResult<Config> {
        self.persistence.load()
    }

    /// Loads the configuration, falling back to defaults on any error
    pub fn load_or_default(&self) -> Config {
        match self.load() {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load config: {}, using defaults", e);
                Config::default()
            }
        }
    }

    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        self.persistence.save(config)
    }

    /// Loads the current config, applies `update_fn` and saves the result
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use pcmflow_config::ConfigManager;
    /// # let manager = ConfigManager::new().unwrap();
    /// manager.update(|config| {
    ///     config.resample.frame_size = 960;
    /// }).expect("Failed to update config");
    /// ```
    pub fn update<F>(&self, update_fn: F) -> ConfigResult<()>
    where
        F: FnOnce(&mut Config),
    {
        let mut config = self.load()?;
        update_fn(&mut config);
        self.save(&config)
    }

    /// Writes a default config file if none exists.
    ///
    /// Returns whether a file was created.
    pub fn initialize(&self) -> ConfigResult<bool> {
        let path = self.config_path();
        if path.exists() {
            log::info!("Config file already exists at {}", path.display());
            return Ok(false);
        }

        self.persistence.generate_default()?;
        Ok(true)
    }

    /// Overwrites the config file with defaults
    pub fn reset(&self) -> ConfigResult<()> {
        self.save(&Config::default())
    }

    /// Returns the validation problems of the stored config file
    pub fn validate(&self) -> ConfigResult<Vec<String>> {
        let config = self.load()?;

        match config.validate() {
            Ok(()) => Ok(Vec::new()),
            Err(errors) => Ok(errors.iter().map(|e| e.to_string()).collect()),
        }
    }

    /// Loads the config and applies `PCMFLOW_<SECTION>_<FIELD>` environment
    /// overrides:
    ///
    /// - `PCMFLOW_RESAMPLE_SAMPLE_RATE=44100`
    /// - `PCMFLOW_RESAMPLE_FRAME_SIZE=960`
    /// - `PCMFLOW_RESAMPLE_SAMPLE_FORMAT=fltp`
    /// - `PCMFLOW_RESAMPLE_CHANNEL_LAYOUT=5.1`
    /// - `PCMFLOW_APP_LOG_LEVEL=debug`
    pub fn load_with_env_overrides(&self) -> ConfigResult<Config> {
        let mut config = self.load()?;
        apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;

        if let Err(errors) = config.validate() {
            log::warn!(
                "Config validation warnings after env overrides: {:?}",
                errors
            );
        }

        Ok(config)
    }
}

/// Applies overrides looked up through `lookup`
pub(crate) fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let resample = &mut config.resample;

    if let Some(rate) = read_var::<u32, _>(&lookup, "RESAMPLE_SAMPLE_RATE")? {
        resample.sample_rate = rate;
    }
    if let Some(size) = read_var::<usize, _>(&lookup, "RESAMPLE_FRAME_SIZE")? {
        resample.frame_size = size;
    }
    if let Some(format) = read_var::<SampleFormat, _>(&lookup, "RESAMPLE_SAMPLE_FORMAT")? {
        resample.sample_format = format;
    }
    if let Some(layout) = read_var::<ChannelLayout, _>(&lookup, "RESAMPLE_CHANNEL_LAYOUT")? {
        resample.channel_layout = layout;
    }
    if let Some(level) = read_var::<LogLevel, _>(&lookup, "APP_LOG_LEVEL")? {
        config.app.log_level = level;
    }

    Ok(())
}

fn read_var<T, F>(lookup: &F, suffix: &str) -> ConfigResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let variable = format!("{}_{}", ENV_PREFIX, suffix);
    let Some(raw) = lookup(&variable) else {
        return Ok(None);
    };

    let value = raw
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::EnvOverrideError {
            variable: variable.clone(),
            reason: e.to_string(),
        })?;

    log::debug!("{} overrides config file", variable);
    Ok(Some(value))
}
