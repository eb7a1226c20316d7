//! Default conversion engine: format decode, remix, rate conversion, encode

use super::kernel::RateStage;
use super::mix::ChannelMixer;
use super::ResampleEngine;
use crate::error::{ResampleError, ResampleResult};
use crate::settings::ResamplerConfig;
use log::{debug, warn};
use pcmflow_core::{rescale_raw, AudioFrame, ChannelLayout, Rounding, SampleFormat};

/// Timestamp jumps up to this fraction of a second are absorbed as jitter
const COMPENSATION_THRESHOLD_DIVISOR: i64 = 10;

/// Converts between any pair of layout, format and rate.
///
/// Samples are decoded to planar `f32`, remixed, rate converted and encoded
/// into the target format. Output that does not fit the destination frame is
/// kept and emitted by later calls. When source and target are identical the
/// bytes are copied unchanged.
pub struct SampleConverter {
    source_layout: ChannelLayout,
    source_format: SampleFormat,
    source_rate: u32,
    target_layout: ChannelLayout,
    target_format: SampleFormat,
    target_rate: u32,

    bypass: bool,
    mixer: Option<ChannelMixer>,
    stage: RateStage,
    pending: Vec<Vec<f32>>,

    /// Source samples fed to the rate stage
    consumed: i64,
    /// Target samples written out
    emitted: i64,

    compensation: bool,
    /// Timestamp of the next emitted sample, `1 / (source_rate * target_rate)` units
    timeline: Option<i64>,
    pending_silence: i64,
    pending_drop: i64,
    inserted: u64,
    dropped: u64,
}

impl SampleConverter {
    pub fn new(config: &ResamplerConfig) -> ResampleResult<Self> {
        config.validate()?;

        let mixer = if config.source_channel_layout == config.target_channel_layout {
            None
        } else {
            Some(ChannelMixer::new(
                config.source_channel_layout,
                config.target_channel_layout,
            ))
        };

        let channels = config.target_channel_layout.channels();
        let stage = RateStage::new(
            config.quality,
            config.source_sample_rate,
            config.target_sample_rate,
            channels,
        )?;

        debug!(
            "Converter {} {} {}Hz -> {} {} {}Hz (quality: {}, mixing: {}, resampling: {})",
            config.source_channel_layout,
            config.source_sample_format,
            config.source_sample_rate,
            config.target_channel_layout,
            config.target_sample_format,
            config.target_sample_rate,
            config.quality,
            mixer.is_some(),
            !stage.is_passthrough()
        );

        Ok(Self {
            source_layout: config.source_channel_layout,
            source_format: config.source_sample_format,
            source_rate: config.source_sample_rate,
            target_layout: config.target_channel_layout,
            target_format: config.target_sample_format,
            target_rate: config.target_sample_rate,
            bypass: config.is_identity() && !config.compensation,
            mixer,
            stage,
            pending: vec![Vec::new(); channels],
            consumed: 0,
            emitted: 0,
            compensation: config.compensation,
            timeline: None,
            pending_silence: 0,
            pending_drop: 0,
            inserted: 0,
            dropped: 0,
        })
    }

    /// Total source samples accepted, after compensation
    pub fn consumed_samples(&self) -> u64 {
        self.consumed as u64
    }

    /// Total target samples written
    pub fn emitted_samples(&self) -> u64 {
        self.emitted as u64
    }

    /// Source samples of silence inserted to cover timestamp gaps
    pub fn inserted_samples(&self) -> u64 {
        self.inserted
    }

    /// Source samples discarded to cover timestamp overlaps
    pub fn dropped_samples(&self) -> u64 {
        self.dropped
    }

    fn pending_len(&self) -> usize {
        self.pending.first().map_or(0, Vec::len)
    }

    /// Delay in `1 / (source_rate * target_rate)` units
    fn delay_units(&self, corrections: bool) -> i64 {
        let mut input = self.consumed as i128;
        if corrections {
            input += self.pending_silence as i128 - self.pending_drop as i128;
        }

        let delay = input * self.target_rate as i128 - self.emitted as i128 * self.source_rate as i128;
        delay.clamp(i64::MIN as i128 + 1, i64::MAX as i128) as i64
    }

    fn check_source(&self, src: &AudioFrame) -> ResampleResult<()> {
        if src.layout() != self.source_layout
            || src.format() != self.source_format
            || src.sample_rate() != self.source_rate
        {
            return Err(ResampleError::InvalidFrame {
                reason: format!(
                    "expected {} {} {}Hz, got {} {} {}Hz",
                    self.source_layout,
                    self.source_format,
                    self.source_rate,
                    src.layout(),
                    src.format(),
                    src.sample_rate()
                ),
            });
        }

        Ok(())
    }

    fn feed(&mut self, src: &AudioFrame) -> ResampleResult<()> {
        let decoded = (0..src.channels())
            .map(|ch| src.channel_f32(ch))
            .collect::<Result<Vec<_>, _>>()?;

        let mut planar = match &self.mixer {
            Some(mixer) => mixer.apply(&decoded),
            None => decoded,
        };

        if self.pending_silence > 0 {
            let silence = self.pending_silence as usize;
            for channel in &mut planar {
                channel.splice(0..0, std::iter::repeat(0.0).take(silence));
            }
            self.inserted += silence as u64;
            self.pending_silence = 0;
        }

        if self.pending_drop > 0 {
            let available = planar.first().map_or(0, Vec::len);
            let drop = (self.pending_drop as usize).min(available);
            for channel in &mut planar {
                channel.drain(..drop);
            }
            self.dropped += drop as u64;
            self.pending_drop -= drop as i64;
        }

        self.consumed += planar.first().map_or(0, Vec::len) as i64;
        self.stage.process(&planar, &mut self.pending)
    }

    fn drain(&mut self) -> ResampleResult<()> {
        if self.pending_silence != 0 || self.pending_drop != 0 {
            debug!(
                "Discarding pending compensation at end of stream (silence: {}, drop: {})",
                self.pending_silence, self.pending_drop
            );
            self.pending_silence = 0;
            self.pending_drop = 0;
        }

        let total = rescale_raw(
            self.consumed,
            self.target_rate as i64,
            self.source_rate as i64,
            Rounding::NearInf,
        );
        let outstanding = (total - self.emitted).max(0) as usize;

        let missing = outstanding.saturating_sub(self.pending_len());
        if missing > 0 {
            self.stage.drain(missing, &mut self.pending)?;
        } else {
            self.stage.reset();
        }

        for channel in &mut self.pending {
            channel.truncate(outstanding);
        }

        Ok(())
    }

    fn write_pending(&mut self, dst: &mut AudioFrame) -> ResampleResult<usize> {
        let count = self.pending_len().min(dst.capacity());

        for (ch, channel) in self.pending.iter_mut().enumerate() {
            dst.write_f32(ch, 0, &channel[..count])?;
            channel.drain(..count);
        }

        self.advance(count);
        Ok(count)
    }

    fn advance(&mut self, written: usize) {
        self.emitted += written as i64;
        if let Some(timeline) = &mut self.timeline {
            *timeline = timeline.saturating_add(written as i64 * self.source_rate as i64);
        }
    }
}

impl ResampleEngine for SampleConverter {
    fn estimate_output_capacity(&mut self, input_samples: usize) -> ResampleResult<usize> {
        let incoming = input_samples
            .checked_add(self.pending_silence.max(0) as usize)
            .ok_or_else(|| ResampleError::conversion("input sample count overflows"))?;

        self.stage
            .estimate(incoming)
            .and_then(|n| n.checked_add(self.pending_len()))
            .ok_or_else(|| ResampleError::conversion("output capacity overflows"))
    }

    fn convert(&mut self, dst: &mut AudioFrame, src: Option<&AudioFrame>) -> ResampleResult<usize> {
        if dst.layout() != self.target_layout || dst.format() != self.target_format {
            return Err(ResampleError::conversion(format!(
                "destination is {} {}, expected {} {}",
                dst.layout(),
                dst.format(),
                self.target_layout,
                self.target_format
            )));
        }

        match src {
            Some(src) => {
                self.check_source(src)?;

                let samples = src.samples();
                if self.bypass && self.pending_len() == 0 && samples <= dst.capacity() {
                    dst.copy_samples(0, src, 0, samples)?;
                    self.consumed += samples as i64;
                    self.advance(samples);
                    return Ok(samples);
                }

                self.feed(src)?;
            }
            None => self.drain()?,
        }

        self.write_pending(dst)
    }

    fn internal_delay(&self, base: u32) -> usize {
        let units = self.delay_units(false).max(0);
        let per_second = self.source_rate as i64 * self.target_rate as i64;

        rescale_raw(units, base as i64, per_second, Rounding::Up).max(0) as usize
    }

    fn next_output_pts(&mut self, pts: i64) -> i64 {
        let expected = pts.saturating_sub(self.delay_units(true));

        if !self.compensation {
            return expected;
        }

        let Some(timeline) = self.timeline else {
            self.timeline = Some(expected);
            return expected;
        };

        let per_second = self.source_rate as i64 * self.target_rate as i64;
        let threshold = per_second / COMPENSATION_THRESHOLD_DIVISOR;
        let delta = expected.saturating_sub(timeline);
        let frames = rescale_raw(delta.saturating_abs(), 1, self.target_rate as i64, Rounding::NearInf);

        if delta > threshold {
            warn!(
                "Timestamp gap of {} source samples, inserting silence",
                frames
            );
            self.pending_silence += frames;
        } else if delta < -threshold {
            warn!(
                "Timestamp overlap of {} source samples, dropping input",
                frames
            );
            self.pending_drop += frames;
        }

        timeline
    }
}
