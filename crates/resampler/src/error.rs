use pcmflow_core::MediaError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResampleError {
    /// Sample storage could not be allocated; the resampler stays usable
    #[error("Allocation failed: {0}")]
    Allocation(MediaError),

    #[error("Frame error: {0}")]
    Frame(MediaError),

    /// The conversion engine reported a failure
    #[error("Conversion failed: {message}")]
    Conversion { message: String },

    #[error("Invalid input frame: {reason}")]
    InvalidFrame { reason: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ResampleError {
    pub(crate) fn conversion(message: impl Into<String>) -> Self {
        Self::Conversion {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Returns true if the same call may succeed when retried
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Allocation(_))
    }
}

impl From<MediaError> for ResampleError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::OutOfMemory { .. } => Self::Allocation(err),
            other => Self::Frame(other),
        }
    }
}

impl From<rubato::ResampleError> for ResampleError {
    fn from(err: rubato::ResampleError) -> Self {
        Self::conversion(err.to_string())
    }
}

impl From<rubato::ResamplerConstructionError> for ResampleError {
    fn from(err: rubato::ResamplerConstructionError) -> Self {
        Self::invalid_config(err.to_string())
    }
}

pub type ResampleResult<T> = Result<T, ResampleError>;
