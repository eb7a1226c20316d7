//! Push/pull resampler with fixed-size re-blocking
//!
//! # Operation
//! 1. Push a source frame.
//! 2. Pull until `None`.
//! 3. Repeat from 1 while input remains.
//! 4. Flush.
//! 5. Pull until `None`.
//!
//! Output frames carry timestamps in `1 / target_sample_rate`.

use crate::engine::{ResampleEngine, SampleConverter};
use crate::error::{ResampleError, ResampleResult};
use crate::settings::{ResamplerBuilder, ResamplerConfig};
use crate::stats::ResamplerStats;
use log::{debug, warn};
use pcmflow_core::{rescale, rescale_raw, rounded_div, AudioFrame, Rounding, TimeBase, Timestamp};

/// Extra room for the flush batch beyond the engine's reported delay
const FLUSH_MARGIN: usize = 3;

/// Outcome of [`Resampler::push`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushStatus {
    /// The input was converted; pull until `None`
    Consumed,
    /// Converted samples are still unread; the input was not consumed
    NotReady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushState {
    Idle,
    /// End of input was pushed and converted samples remain to be emitted
    Draining,
}

pub struct Resampler<E = SampleConverter> {
    config: ResamplerConfig,
    engine: E,
    target_time_base: TimeBase,

    scratch: Option<AudioFrame>,
    /// Read cursor into the scratch batch
    offset: usize,
    accumulation: Option<AudioFrame>,

    flush: FlushState,
    /// Timestamp following the last converted batch, in target samples
    next_batch_pts: Option<i64>,
    /// Timestamp the next source frame should carry, in source samples
    expected_source_pts: Option<i64>,

    stats: ResamplerStats,
}

impl Resampler {
    pub fn builder() -> ResamplerBuilder {
        ResamplerBuilder::new()
    }

    /// Creates a resampler backed by [`SampleConverter`]
    pub fn new(config: ResamplerConfig) -> ResampleResult<Self> {
        config.validate()?;
        let engine = SampleConverter::new(&config)?;
        Ok(Self::with_engine(config, engine))
    }
}

impl<E: ResampleEngine> Resampler<E> {
    pub(crate) fn with_engine(config: ResamplerConfig, engine: E) -> Self {
        Self {
            target_time_base: TimeBase::for_sample_rate(config.target_sample_rate),
            config,
            engine,
            scratch: None,
            offset: 0,
            accumulation: None,
            flush: FlushState::Idle,
            next_batch_pts: None,
            expected_source_pts: None,
            stats: ResamplerStats::default(),
        }
    }

    /// Converts a frame, or starts flushing when `frame` is `None`.
    ///
    /// Returns [`PushStatus::NotReady`] without touching anything while the
    /// previous batch has unread samples.
    pub fn push(&mut self, frame: Option<&AudioFrame>) -> ResampleResult<PushStatus> {
        if self.has_unread() {
            self.stats.rejected_pushes += 1;
            return Ok(PushStatus::NotReady);
        }

        if let Some(frame) = frame {
            self.check_input(frame)?;
        }

        // may schedule compensation, which changes the capacity estimate
        let (batch_pts, source_pts) = match frame {
            Some(frame) => self.output_pts(frame),
            None => (self.next_batch_pts, None),
        };

        let required = match frame {
            Some(frame) => self.engine.estimate_output_capacity(frame.samples())?,
            None => {
                if self.flush == FlushState::Idle {
                    debug!("Flushing resampler");
                }
                self.flush = FlushState::Draining;
                self.engine.internal_delay(self.config.target_sample_rate) + FLUSH_MARGIN
            }
        };

        let mut scratch = match self.scratch.take() {
            Some(buffer) if buffer.is_writable() && buffer.capacity() >= required => buffer,
            previous => {
                let reason = match &previous {
                    None => "initial",
                    Some(buffer) if !buffer.is_writable() => "shared",
                    Some(_) => "undersized",
                };
                drop(previous);

                let buffer = self.alloc(required)?;
                self.stats.scratch_reallocations += 1;
                debug!(
                    "Allocated scratch buffer of {} samples ({})",
                    required, reason
                );
                buffer
            }
        };
        scratch.set_samples(0)?;
        self.offset = 0;

        let produced = match self.engine.convert(&mut scratch, frame) {
            Ok(produced) => produced,
            Err(err) => {
                self.scratch = Some(scratch);
                return Err(err);
            }
        };

        if let Some(frame) = frame {
            self.track_source_pts(frame, source_pts);
            self.stats.frames_pushed += 1;
            self.stats.samples_in += frame.samples() as u64;
        }

        let resized = scratch.set_samples(produced);
        scratch.set_pts(match batch_pts {
            Some(pts) => Timestamp::new(pts, self.target_time_base),
            None => Timestamp::null().with_time_base(self.target_time_base),
        });
        self.scratch = Some(scratch);
        resized?;

        self.next_batch_pts = batch_pts.map(|pts| pts.saturating_add(produced as i64));

        Ok(PushStatus::Consumed)
    }

    /// Pushes a source frame
    pub fn push_frame(&mut self, frame: &AudioFrame) -> ResampleResult<PushStatus> {
        self.push(Some(frame))
    }

    /// Signals end of input
    pub fn flush(&mut self) -> ResampleResult<PushStatus> {
        self.push(None)
    }

    /// Takes the next output frame, or `None` if more input (or a flush) is
    /// needed first
    pub fn pull(&mut self) -> ResampleResult<Option<AudioFrame>> {
        let frame = match self.config.target_frame_samples {
            None => self.pull_batch()?,
            Some(size) => self.pull_fixed(size)?,
        };

        if let Some(frame) = &frame {
            self.stats.frames_pulled += 1;
            self.stats.samples_out += frame.samples() as u64;
        }

        Ok(frame)
    }

    pub fn config(&self) -> &ResamplerConfig {
        &self.config
    }

    pub fn stats(&self) -> &ResamplerStats {
        &self.stats
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn flush_state(&self) -> FlushState {
        self.flush
    }

    pub fn is_flushing(&self) -> bool {
        self.flush == FlushState::Draining
    }

    /// Time base of emitted frames
    pub fn target_time_base(&self) -> TimeBase {
        self.target_time_base
    }

    /// Converted samples not yet handed out
    pub fn pending_samples(&self) -> usize {
        let unread = self
            .scratch
            .as_ref()
            .map_or(0, |s| s.samples().saturating_sub(self.offset));
        let accumulated = self.accumulation.as_ref().map_or(0, AudioFrame::samples);

        unread + accumulated
    }

    fn has_unread(&self) -> bool {
        self.scratch
            .as_ref()
            .is_some_and(|scratch| self.offset < scratch.samples())
    }

    fn alloc(&self, samples: usize) -> ResampleResult<AudioFrame> {
        let mut buffer = AudioFrame::alloc(
            self.config.target_channel_layout,
            self.config.target_sample_format,
            self.config.target_sample_rate,
            samples,
        )?;
        buffer.set_samples(0)?;
        Ok(buffer)
    }

    fn check_input(&self, frame: &AudioFrame) -> ResampleResult<()> {
        let reason = if frame.layout() != self.config.source_channel_layout {
            "channel layout does not match"
        } else if frame.format() != self.config.source_sample_format {
            "sample format does not match"
        } else if frame.sample_rate() != self.config.source_sample_rate {
            "sample rate does not match"
        } else if !frame.pts().is_null() && !frame.pts().time_base().is_valid() {
            "timestamp has an invalid time base"
        } else {
            return Ok(());
        };

        Err(ResampleError::InvalidFrame {
            reason: reason.to_string(),
        })
    }

    /// Timestamp of the first sample the conversion of `frame` emits, in
    /// target samples, along with the frame's own timestamp in source samples.
    ///
    /// Leaves the discontinuity bookkeeping alone so a push that fails after
    /// this point can be retried.
    fn output_pts(&mut self, frame: &AudioFrame) -> (Option<i64>, Option<i64>) {
        let source_rate = self.config.source_sample_rate as i64;
        let target_rate = self.config.target_sample_rate as i64;

        let Some(pts) = frame.pts().pts() else {
            return (None, None);
        };
        let time_base = frame.pts().time_base();

        let source_pts = rescale(
            pts,
            time_base,
            TimeBase::for_sample_rate(self.config.source_sample_rate),
            Rounding::NearInf,
        );

        let rescaled = match (time_base.num() as i64).checked_mul(source_rate * target_rate) {
            Some(b) => rescale_raw(pts, b, time_base.den() as i64, Rounding::NearInf),
            None => source_pts.saturating_mul(target_rate),
        };

        let batch_pts = rounded_div(self.engine.next_output_pts(rescaled), source_rate);
        (Some(batch_pts), Some(source_pts))
    }

    /// Checks a converted frame against the timestamp its predecessor implied
    /// and moves the expectation past it
    fn track_source_pts(&mut self, frame: &AudioFrame, source_pts: Option<i64>) {
        let samples = frame.samples() as i64;

        let Some(source_pts) = source_pts else {
            self.expected_source_pts = self
                .expected_source_pts
                .map(|expected| expected.saturating_add(samples));
            return;
        };

        if let Some(expected) = self.expected_source_pts {
            let drift = source_pts.saturating_sub(expected);
            if drift.abs() > 1 {
                warn!(
                    "Source timestamp discontinuity: expected {}, got {} ({:+} samples)",
                    expected, source_pts, drift
                );
                self.stats.discontinuities += 1;
            }
        }
        self.expected_source_pts = Some(source_pts.saturating_add(samples));
    }

    fn pull_batch(&mut self) -> ResampleResult<Option<AudioFrame>> {
        let Some(scratch) = self.scratch.as_mut() else {
            return Ok(None);
        };

        self.flush = FlushState::Idle;

        if scratch.samples() == 0 {
            return Ok(None);
        }

        let frame = scratch.clone();
        scratch.set_samples(0)?;

        Ok(Some(frame))
    }

    fn pull_fixed(&mut self, size: usize) -> ResampleResult<Option<AudioFrame>> {
        if self.scratch.is_none() {
            return Ok(None);
        }

        let mut accumulation = match self.accumulation.take() {
            Some(buffer) if buffer.is_writable() => buffer,
            _ => {
                let buffer = self.alloc(size)?;
                self.stats.accumulation_reallocations += 1;
                debug!("Allocated accumulation buffer of {} samples", size);
                buffer
            }
        };

        let result = self.fill(&mut accumulation, size);
        self.accumulation = Some(accumulation);
        result
    }

    fn fill(&mut self, accumulation: &mut AudioFrame, size: usize) -> ResampleResult<Option<AudioFrame>> {
        let Some(scratch) = self.scratch.as_ref() else {
            return Ok(None);
        };

        let accumulated = accumulation.samples();
        let required = size - accumulated;
        let available = scratch.samples().saturating_sub(self.offset);
        let count = required.min(available);

        if count > 0 {
            accumulation.copy_samples(accumulated, scratch, self.offset, count)?;
            if accumulated == 0 {
                accumulation.set_pts(scratch.pts().offset(self.offset as i64));
            }

            self.offset += count;
            accumulation.set_samples(accumulated + count)?;
        }

        let drained = self.offset >= scratch.samples();
        let filled = accumulation.samples();

        if filled < size && self.flush == FlushState::Idle {
            return Ok(None);
        }

        if filled == 0 {
            if drained {
                self.flush = FlushState::Idle;
                debug!("Flush complete");
            }
            return Ok(None);
        }

        let frame = accumulation.clone();
        accumulation.set_samples(0)?;

        if self.flush == FlushState::Draining && drained {
            self.flush = FlushState::Idle;
            debug!("Flush complete, final frame of {} samples", frame.samples());
        }

        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcmflow_core::{ChannelLayout, SampleFormat};

    /// Copies input through unchanged, holding back a fixed number of
    /// samples until flush
    struct DelayLine {
        held: Vec<f32>,
        delay: usize,
        fail: bool,
        pts_queries: Vec<i64>,
    }

    impl DelayLine {
        fn new(delay: usize) -> Self {
            Self {
                held: Vec::new(),
                delay,
                fail: false,
                pts_queries: Vec::new(),
            }
        }
    }

    impl ResampleEngine for DelayLine {
        fn estimate_output_capacity(&mut self, input_samples: usize) -> ResampleResult<usize> {
            Ok(self.held.len() + input_samples)
        }

        fn convert(&mut self, dst: &mut AudioFrame, src: Option<&AudioFrame>) -> ResampleResult<usize> {
            if self.fail {
                return Err(ResampleError::Conversion {
                    message: "engine fault".to_string(),
                });
            }

            let keep = match src {
                Some(src) => {
                    self.held.extend(src.channel_f32(0)?);
                    self.delay
                }
                None => 0,
            };

            let count = self.held.len().saturating_sub(keep).min(dst.capacity());
            let out: Vec<f32> = self.held.drain(..count).collect();
            dst.write_f32(0, 0, &out)?;
            Ok(count)
        }

        fn internal_delay(&self, _base: u32) -> usize {
            self.held.len()
        }

        fn next_output_pts(&mut self, pts: i64) -> i64 {
            self.pts_queries.push(pts);
            pts - self.held.len() as i64 * 1000
        }
    }

    fn mono_config(frame_samples: Option<usize>) -> ResamplerConfig {
        ResamplerConfig {
            source_channel_layout: ChannelLayout::MONO,
            source_sample_format: SampleFormat::F32,
            source_sample_rate: 1000,
            target_channel_layout: ChannelLayout::MONO,
            target_sample_format: SampleFormat::F32,
            target_sample_rate: 1000,
            target_frame_samples: frame_samples,
            compensation: false,
            quality: Default::default(),
        }
    }

    fn ramp(start: usize, len: usize, pts: Option<i64>) -> AudioFrame {
        let values: Vec<f32> = (start..start + len).map(|v| v as f32).collect();
        let frame = AudioFrame::from_f32(ChannelLayout::MONO, SampleFormat::F32, 1000, &values)
            .expect("frame");
        match pts {
            Some(pts) => frame.with_pts(Timestamp::new(pts, TimeBase::for_sample_rate(1000))),
            None => frame,
        }
    }

    fn values(frame: &AudioFrame) -> Vec<f32> {
        frame.channel_f32(0).expect("channel")
    }

    #[test]
    fn test_pull_before_push_is_not_ready() {
        let mut batch = Resampler::with_engine(mono_config(None), DelayLine::new(0));
        assert!(batch.pull().expect("pull").is_none());

        let mut fixed = Resampler::with_engine(mono_config(Some(4)), DelayLine::new(0));
        assert!(fixed.pull().expect("pull").is_none());
        assert_eq!(fixed.stats().accumulation_reallocations, 0);
    }

    #[test]
    fn test_push_rejected_while_unread() {
        let mut resampler = Resampler::with_engine(mono_config(Some(4)), DelayLine::new(0));

        assert_eq!(
            resampler.push_frame(&ramp(0, 10, Some(0))).expect("push"),
            PushStatus::Consumed
        );
        assert_eq!(
            resampler.push_frame(&ramp(10, 10, Some(10))).expect("push"),
            PushStatus::NotReady
        );
        assert_eq!(
            resampler.flush().expect("flush"),
            PushStatus::NotReady
        );
        assert!(!resampler.is_flushing());
        assert_eq!(resampler.stats().rejected_pushes, 2);
        assert_eq!(resampler.pending_samples(), 10);
    }

    #[test]
    fn test_scratch_reused_only_when_released() {
        let mut resampler = Resampler::with_engine(mono_config(None), DelayLine::new(0));

        resampler.push_frame(&ramp(0, 8, None)).expect("push");
        let held = resampler.pull().expect("pull").expect("frame");
        assert_eq!(resampler.stats().scratch_reallocations, 1);

        // the emitted frame still shares the buffer
        resampler.push_frame(&ramp(8, 8, None)).expect("push");
        assert_eq!(resampler.stats().scratch_reallocations, 2);
        assert_eq!(values(&held), (0..8).map(|v| v as f32).collect::<Vec<_>>());

        drop(resampler.pull().expect("pull"));
        drop(held);

        resampler.push_frame(&ramp(16, 8, None)).expect("push");
        assert_eq!(resampler.stats().scratch_reallocations, 2);

        // a larger batch needs a larger buffer
        drop(resampler.pull().expect("pull"));
        resampler.push_frame(&ramp(24, 32, None)).expect("push");
        assert_eq!(resampler.stats().scratch_reallocations, 3);
    }

    #[test]
    fn test_accumulation_reused_only_when_released() {
        let mut resampler = Resampler::with_engine(mono_config(Some(4)), DelayLine::new(0));

        resampler.push_frame(&ramp(0, 12, None)).expect("push");
        let held = resampler.pull().expect("pull").expect("first");
        assert_eq!(resampler.stats().accumulation_reallocations, 1);

        // the emitted frame still shares the buffer
        let second = resampler.pull().expect("pull").expect("second");
        assert_eq!(resampler.stats().accumulation_reallocations, 2);
        assert_eq!(values(&held), vec![0.0, 1.0, 2.0, 3.0]);

        drop(second);
        let third = resampler.pull().expect("pull").expect("third");
        assert_eq!(resampler.stats().accumulation_reallocations, 2);
        assert_eq!(values(&third), vec![8.0, 9.0, 10.0, 11.0]);

        // frames handed out earlier keep their own samples
        assert_eq!(values(&held), vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_batch_mode_emits_whole_batch_once() {
        let mut resampler = Resampler::with_engine(mono_config(None), DelayLine::new(2));

        resampler.push_frame(&ramp(0, 6, Some(100))).expect("push");
        let frame = resampler.pull().expect("pull").expect("frame");
        assert_eq!(values(&frame), vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(frame.pts().pts(), Some(100));
        assert!(resampler.pull().expect("pull").is_none());

        resampler.flush().expect("flush");
        assert!(resampler.is_flushing());
        let tail = resampler.pull().expect("pull").expect("tail");
        assert_eq!(values(&tail), vec![4.0, 5.0]);
        assert_eq!(tail.pts().pts(), Some(104));
        assert!(!resampler.is_flushing());
        assert!(resampler.pull().expect("pull").is_none());
    }

    #[test]
    fn test_pts_is_queried_before_conversion() {
        let mut resampler = Resampler::with_engine(mono_config(None), DelayLine::new(3));

        resampler.push_frame(&ramp(0, 5, Some(0))).expect("push");
        drop(resampler.pull().expect("pull"));
        resampler.push_frame(&ramp(5, 5, Some(5))).expect("push");
        let frame = resampler.pull().expect("pull").expect("frame");

        // three samples were held when the second frame arrived
        assert_eq!(frame.pts().pts(), Some(2));
        assert_eq!(resampler.engine().pts_queries, vec![0, 5_000]);
    }

    #[test]
    fn test_fixed_mode_reblocks_across_batches() {
        let mut resampler = Resampler::with_engine(mono_config(Some(4)), DelayLine::new(0));

        resampler.push_frame(&ramp(0, 3, Some(50))).expect("push");
        assert!(resampler.pull().expect("pull").is_none());
        assert_eq!(resampler.pending_samples(), 3);

        resampler.push_frame(&ramp(3, 6, Some(53))).expect("push");
        let first = resampler.pull().expect("pull").expect("first");
        assert_eq!(values(&first), vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(first.pts().pts(), Some(50));

        let second = resampler.pull().expect("pull").expect("second");
        assert_eq!(values(&second), vec![4.0, 5.0, 6.0, 7.0]);
        assert_eq!(second.pts().pts(), Some(54));
        assert!(resampler.pull().expect("pull").is_none());

        resampler.flush().expect("flush");
        let last = resampler.pull().expect("pull").expect("last");
        assert_eq!(values(&last), vec![8.0]);
        assert_eq!(last.pts().pts(), Some(58));
        assert!(resampler.pull().expect("pull").is_none());
        assert!(!resampler.is_flushing());
    }

    #[test]
    fn test_flush_keeps_draining_until_scratch_is_empty() {
        let mut resampler = Resampler::with_engine(mono_config(Some(4)), DelayLine::new(10));

        resampler.push_frame(&ramp(0, 10, Some(0))).expect("push");
        assert!(resampler.pull().expect("pull").is_none());

        resampler.flush().expect("flush");
        let sizes: Vec<usize> = std::iter::from_fn(|| resampler.pull().expect("pull"))
            .map(|frame| frame.samples())
            .collect();

        assert_eq!(sizes, vec![4, 4, 2]);
        assert!(!resampler.is_flushing());
    }

    #[test]
    fn test_flush_with_nothing_buffered_emits_nothing() {
        let mut resampler = Resampler::with_engine(mono_config(Some(4)), DelayLine::new(0));

        resampler.push_frame(&ramp(0, 8, None)).expect("push");
        assert!(resampler.pull().expect("pull").is_some());
        assert!(resampler.pull().expect("pull").is_some());

        resampler.flush().expect("flush");
        assert!(resampler.pull().expect("pull").is_none());
        assert_eq!(resampler.flush_state(), FlushState::Idle);
    }

    #[test]
    fn test_conversion_error_propagates_and_state_survives() {
        let mut engine = DelayLine::new(0);
        engine.fail = true;
        let mut resampler = Resampler::with_engine(mono_config(None), engine);

        let err = resampler
            .push_frame(&ramp(0, 4, None))
            .expect_err("engine fault");
        assert!(matches!(err, ResampleError::Conversion { .. }));
        assert!(resampler.pull().expect("pull").is_none());
        assert_eq!(resampler.stats().frames_pushed, 0);
    }

    #[test]
    fn test_mismatched_input_is_rejected() {
        let mut resampler = Resampler::with_engine(mono_config(None), DelayLine::new(0));
        let stereo = AudioFrame::alloc(ChannelLayout::STEREO, SampleFormat::F32, 1000, 4)
            .expect("alloc");
        let wrong_rate = AudioFrame::alloc(ChannelLayout::MONO, SampleFormat::F32, 2000, 4)
            .expect("alloc");

        for frame in [&stereo, &wrong_rate] {
            assert!(matches!(
                resampler.push_frame(frame),
                Err(ResampleError::InvalidFrame { .. })
            ));
        }
    }

    #[test]
    fn test_discontinuities_are_counted() {
        let mut resampler = Resampler::with_engine(mono_config(None), DelayLine::new(0));

        for (start, pts) in [(0, 0), (4, 4), (8, 100)] {
            resampler.push_frame(&ramp(start, 4, Some(pts))).expect("push");
            drop(resampler.pull().expect("pull"));
        }

        assert_eq!(resampler.stats().discontinuities, 1);
        assert_eq!(resampler.stats().frames_pulled, 3);
        assert_eq!(resampler.stats().samples_out, 12);
    }

    #[test]
    fn test_failed_push_leaves_timestamp_tracking_alone() {
        let mut resampler = Resampler::with_engine(mono_config(None), DelayLine::new(0));

        resampler.push_frame(&ramp(0, 4, Some(0))).expect("push");
        drop(resampler.pull().expect("pull"));

        resampler.engine.fail = true;
        assert!(resampler.push_frame(&ramp(4, 4, Some(100))).is_err());
        assert_eq!(resampler.stats().discontinuities, 0);

        resampler.engine.fail = false;
        resampler.push_frame(&ramp(4, 4, Some(100))).expect("retry");
        assert_eq!(resampler.stats().discontinuities, 1);

        // tracking continues from the retried frame
        drop(resampler.pull().expect("pull"));
        resampler.push_frame(&ramp(8, 4, Some(104))).expect("push");
        assert_eq!(resampler.stats().discontinuities, 1);
    }
}
