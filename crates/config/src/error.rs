//! Errors raised while loading, saving or overriding `pcmflow.toml`

use std::path::PathBuf;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// `pcmflow.toml` exists but could not be read, or is empty
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Renaming the freshly written temp file over `pcmflow.toml` failed
    #[error("Failed to write config file at {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not TOML, or names an unknown sample format, layout or
    /// quality preset
    #[error("Failed to parse config file at {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// A rate or frame size outside its allowed range; carries every
    /// offending field, joined
    #[error("Config validation failed: {0}")]
    ValidationError(String),

    #[error("Failed to create config directory at {path}: {source}")]
    DirectoryCreationError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A `PCMFLOW_*` variable holds a value its field cannot take
    #[error("Invalid value for {variable}: {reason}")]
    EnvOverrideError { variable: String, reason: String },

    /// The platform reports no home directory to place `pcmflow/` under
    #[error("Could not determine config directory path: {reason}")]
    PathResolutionError { reason: String },

    /// Copying the previous `pcmflow.toml` to `pcmflow.toml.backup` failed
    #[error("Failed to backup config file: {source}")]
    BackupError { source: std::io::Error },

    /// Temp file creation or write while saving
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// One rejected field, e.g. `resample.sample_rate`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted `section.field` path
    pub field: String,
    pub message: String,
    /// Rejected value as written in the file
    pub value: Option<String>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            value: None,
        }
    }

    /// Same as [`ValidationError::new`], also recording the rejected value
    pub fn with_value(
        field: impl Into<String>,
        message: impl Into<String>,
        value: impl ToString,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            value: Some(value.to_string()),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Field '{}': {}", self.field, self.message)?;
        if let Some(ref value) = self.value {
            write!(f, " (got: {})", value)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}
