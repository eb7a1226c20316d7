//! Resampling quality presets

use crate::error::MediaError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Trade-off between conversion cost and stop-band quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleQuality {
    /// Cubic polynomial interpolation, lowest latency
    Fast,
    /// Short windowed sinc, suitable for playback and streaming
    #[default]
    Balanced,
    /// Long windowed sinc for mastering-grade output
    Accurate,
}

impl ResampleQuality {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Balanced => "balanced",
            Self::Accurate => "accurate",
        }
    }

    /// Returns a human-readable description of the preset
    pub fn description(&self) -> &'static str {
        match self {
            Self::Fast => "Polynomial interpolation (cheapest, audible aliasing on some material)",
            Self::Balanced => "Windowed sinc, 16 taps (low latency)",
            Self::Accurate => "Windowed sinc, 256 taps with a steep cutoff",
        }
    }
}

impl fmt::Display for ResampleQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ResampleQuality {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "balanced" => Ok(Self::Balanced),
            "accurate" => Ok(Self::Accurate),
            _ => Err(MediaError::invalid_argument(
                "quality",
                format!("unknown preset '{}'", s),
            )),
        }
    }
}
