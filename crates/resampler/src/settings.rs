//! Resampler configuration and builder

use crate::engine::{ResampleEngine, SampleConverter};
use crate::error::{ResampleError, ResampleResult};
use crate::resampler::Resampler;
use pcmflow_core::{ChannelLayout, ResampleQuality, SampleFormat};

/// Largest fixed output frame size accepted
pub const MAX_FRAME_SAMPLES: usize = 1 << 20;

/// Immutable description of one conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResamplerConfig {
    pub source_channel_layout: ChannelLayout,
    pub source_sample_format: SampleFormat,
    pub source_sample_rate: u32,

    pub target_channel_layout: ChannelLayout,
    pub target_sample_format: SampleFormat,
    pub target_sample_rate: u32,

    /// Exact size of every emitted frame except the last; `None` passes
    /// converted batches through unchanged
    pub target_frame_samples: Option<usize>,

    /// Correct timestamp discontinuities by inserting silence or dropping
    /// samples
    pub compensation: bool,

    pub quality: ResampleQuality,
}

impl ResamplerConfig {
    pub fn validate(&self) -> ResampleResult<()> {
        if self.source_sample_rate == 0 {
            return Err(ResampleError::invalid_config("source sample rate is zero"));
        }

        if self.target_sample_rate == 0 {
            return Err(ResampleError::invalid_config("target sample rate is zero"));
        }

        match self.target_frame_samples {
            Some(0) => Err(ResampleError::invalid_config(
                "target frame size must be positive",
            )),
            Some(n) if n > MAX_FRAME_SAMPLES => Err(ResampleError::invalid_config(format!(
                "target frame size {} exceeds {}",
                n, MAX_FRAME_SAMPLES
            ))),
            _ => Ok(()),
        }
    }

    /// Returns true if rate, layout and format are all unchanged
    pub fn is_identity(&self) -> bool {
        self.source_sample_rate == self.target_sample_rate
            && self.source_channel_layout == self.target_channel_layout
            && self.source_sample_format == self.target_sample_format
    }
}

/// Builder for [`Resampler`]
#[derive(Debug, Clone, Default)]
pub struct ResamplerBuilder {
    source_channel_layout: Option<ChannelLayout>,
    source_sample_format: Option<SampleFormat>,
    source_sample_rate: Option<u32>,

    target_channel_layout: Option<ChannelLayout>,
    target_sample_format: Option<SampleFormat>,
    target_sample_rate: Option<u32>,

    target_frame_samples: Option<usize>,
    compensation: bool,
    quality: ResampleQuality,
}

impl ResamplerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source_channel_layout(mut self, layout: ChannelLayout) -> Self {
        self.source_channel_layout = Some(layout);
        self
    }

    pub fn source_sample_format(mut self, format: SampleFormat) -> Self {
        self.source_sample_format = Some(format);
        self
    }

    pub fn source_sample_rate(mut self, rate: u32) -> Self {
        self.source_sample_rate = Some(rate);
        self
    }

    pub fn target_channel_layout(mut self, layout: ChannelLayout) -> Self {
        self.target_channel_layout = Some(layout);
        self
    }

    pub fn target_sample_format(mut self, format: SampleFormat) -> Self {
        self.target_sample_format = Some(format);
        self
    }

    pub fn target_sample_rate(mut self, rate: u32) -> Self {
        self.target_sample_rate = Some(rate);
        self
    }

    /// Sets the fixed output frame size. `None` or `Some(0)` disables
    /// re-blocking.
    pub fn target_frame_samples(mut self, samples: Option<usize>) -> Self {
        self.target_frame_samples = samples.filter(|n| *n > 0);
        self
    }

    pub fn compensation(mut self, enabled: bool) -> Self {
        self.compensation = enabled;
        self
    }

    pub fn quality(mut self, quality: ResampleQuality) -> Self {
        self.quality = quality;
        self
    }

    /// Resolves the configuration without building an engine
    pub fn config(&self) -> ResampleResult<ResamplerConfig> {
        let config = ResamplerConfig {
            source_channel_layout: self
                .source_channel_layout
                .ok_or_else(|| ResampleError::invalid_config("source channel layout was not set"))?,
            source_sample_format: self
                .source_sample_format
                .ok_or_else(|| ResampleError::invalid_config("source sample format was not set"))?,
            source_sample_rate: self
                .source_sample_rate
                .ok_or_else(|| ResampleError::invalid_config("source sample rate was not set"))?,
            target_channel_layout: self
                .target_channel_layout
                .ok_or_else(|| ResampleError::invalid_config("target channel layout was not set"))?,
            target_sample_format: self
                .target_sample_format
                .ok_or_else(|| ResampleError::invalid_config("target sample format was not set"))?,
            target_sample_rate: self
                .target_sample_rate
                .ok_or_else(|| ResampleError::invalid_config("target sample rate was not set"))?,
            target_frame_samples: self.target_frame_samples,
            compensation: self.compensation,
            quality: self.quality,
        };

        config.validate()?;
        Ok(config)
    }

    /// Builds a resampler backed by [`SampleConverter`]
    pub fn build(self) -> ResampleResult<Resampler> {
        let config = self.config()?;
        let engine = SampleConverter::new(&config)?;
        Ok(Resampler::with_engine(config, engine))
    }

    /// Builds a resampler around a caller-supplied engine
    pub fn build_with<E: ResampleEngine>(self, engine: E) -> ResampleResult<Resampler<E>> {
        let config = self.config()?;
        Ok(Resampler::with_engine(config, engine))
    }
}
