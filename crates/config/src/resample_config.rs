//! Conversion defaults

use crate::validation::{ConfigSection, ValidationError, Validator};
use pcmflow_core::{ChannelLayout, ResampleQuality, SampleFormat};
use serde::{Deserialize, Serialize};

pub const MIN_SAMPLE_RATE: u32 = 1_000;
pub const MAX_SAMPLE_RATE: u32 = 768_000;
pub const MAX_FRAME_SIZE: usize = 1 << 20;

/// Target stream description used when the command line does not override it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResampleConfig {
    /// Output sample rate in Hz
    pub sample_rate: u32,

    pub sample_format: SampleFormat,

    pub channel_layout: ChannelLayout,

    /// Samples per output frame; 0 emits frames as they are converted
    pub frame_size: usize,

    pub quality: ResampleQuality,

    /// Fill timestamp gaps with silence and drop overlapping input
    pub compensation: bool,
}

impl ResampleConfig {
    /// Fixed output frame size, if re-blocking is enabled
    pub fn frame_samples(&self) -> Option<usize> {
        (self.frame_size > 0).then_some(self.frame_size)
    }
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            sample_format: SampleFormat::S16,
            channel_layout: ChannelLayout::STEREO,
            frame_size: 0,
            quality: ResampleQuality::Balanced,
            compensation: false,
        }
    }
}

impl ConfigSection for ResampleConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::collect_errors(vec![
            Validator::in_range(
                self.sample_rate,
                MIN_SAMPLE_RATE,
                MAX_SAMPLE_RATE,
                "resample.sample_rate",
            ),
            Validator::at_most(self.frame_size, MAX_FRAME_SIZE, "resample.frame_size"),
        ])
    }

    fn merge(&mut self, other: Self) {
        self.sample_rate = other.sample_rate;
        self.sample_format = other.sample_format;
        self.channel_layout = other.channel_layout;
        self.frame_size = other.frame_size;
        self.quality = other.quality;
        self.compensation = other.compensation;
    }

    fn section_name(&self) -> &'static str {
        "resample"
    }
}
