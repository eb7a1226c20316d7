//! Error types for frame storage and timestamp handling
//!
//! Errors are classified in three severity tiers:
//! - **Recoverable**: the same call may succeed later (allocation pressure)
//! - **Degraded**: the input is unusable but the pipeline can continue
//! - **Fatal**: the caller violated an invariant and must rebuild its state

use std::fmt;
use thiserror::Error;

/// Error severity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Error can be recovered from by retrying
    Recoverable,
    /// The offending input should be skipped
    Degraded,
    /// Requires the caller to rebuild its pipeline
    Fatal,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recoverable => write!(f, "Recoverable"),
            Self::Degraded => write!(f, "Degraded"),
            Self::Fatal => write!(f, "Fatal"),
        }
    }
}

/// Errors raised by frame allocation and sample manipulation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    /// Sample storage could not be allocated
    #[error("Out of memory: requested {requested_bytes} bytes")]
    OutOfMemory { requested_bytes: u64 },

    /// An argument is outside its valid domain
    #[error("Invalid argument: {argument} - {reason}")]
    InvalidArgument { argument: String, reason: String },

    /// Two frames that must share layout and format do not
    #[error("Format mismatch: expected {expected}, got {actual}")]
    FormatMismatch { expected: String, actual: String },

    /// Write access was requested on a frame whose storage is shared
    #[error("Frame storage is shared and cannot be written")]
    NotWritable,

    /// A sample range reaches past the frame capacity
    #[error("Sample range {end} exceeds capacity {capacity}")]
    CapacityExceeded { end: usize, capacity: usize },

    /// The channel layout is empty or contains unknown positions
    #[error("Unsupported channel layout: {layout}")]
    UnsupportedLayout { layout: String },
}

impl MediaError {
    /// Convenience constructor for [`MediaError::InvalidArgument`]
    pub fn invalid_argument(argument: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            argument: argument.into(),
            reason: reason.into(),
        }
    }

    /// Returns the severity level of this error
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::OutOfMemory { .. } => ErrorSeverity::Recoverable,
            Self::FormatMismatch { .. } | Self::UnsupportedLayout { .. } => {
                ErrorSeverity::Degraded
            }
            Self::InvalidArgument { .. }
            | Self::NotWritable
            | Self::CapacityExceeded { .. } => ErrorSeverity::Fatal,
        }
    }

    /// Returns true if retrying the same operation may succeed
    pub fn is_recoverable(&self) -> bool {
        self.severity() == ErrorSeverity::Recoverable
    }
}

/// Result type for frame operations
pub type MediaResult<T> = Result<T, MediaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_memory_is_recoverable() {
        let err = MediaError::OutOfMemory {
            requested_bytes: 1024,
        };
        assert!(err.is_recoverable());
        assert_eq!(err.severity(), ErrorSeverity::Recoverable);
    }

    #[test]
    fn test_not_writable_is_fatal() {
        assert_eq!(MediaError::NotWritable.severity(), ErrorSeverity::Fatal);
        assert!(!MediaError::NotWritable.is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let err = MediaError::invalid_argument("sample_rate", "must be non-zero");
        assert_eq!(
            err.to_string(),
            "Invalid argument: sample_rate - must be non-zero"
        );

        let err = MediaError::CapacityExceeded {
            end: 1200,
            capacity: 960,
        };
        assert!(err.to_string().contains("960"));
    }

    #[test]
    fn test_severity_ordering() {
        assert!(ErrorSeverity::Recoverable < ErrorSeverity::Degraded);
        assert!(ErrorSeverity::Degraded < ErrorSeverity::Fatal);
    }
}
