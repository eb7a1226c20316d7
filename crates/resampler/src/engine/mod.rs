//! Conversion engines behind the [`Resampler`](crate::Resampler)
//!
//! A [`ResampleEngine`] turns source frames into target samples and keeps
//! whatever it cannot emit yet (filter history, partial input chunks,
//! overflow output) as internal delay. The resampler only sequences calls to
//! it; the math lives here.

mod converter;
mod kernel;
mod mix;

pub use converter::SampleConverter;
pub use mix::ChannelMixer;

use crate::error::ResampleResult;
use pcmflow_core::AudioFrame;

pub trait ResampleEngine {
    /// Upper bound on the samples the next `convert` of `input_samples`
    /// source samples can produce, including anything already buffered
    fn estimate_output_capacity(&mut self, input_samples: usize) -> ResampleResult<usize>;

    /// Converts `src` into `dst`, or drains buffered samples when `src` is
    /// `None`. Writes at most `dst.capacity()` samples per channel starting
    /// at sample 0 and returns how many were written.
    fn convert(&mut self, dst: &mut AudioFrame, src: Option<&AudioFrame>) -> ResampleResult<usize>;

    /// Samples buffered inside the engine, expressed at `base` samples per
    /// second and rounded up
    fn internal_delay(&self, base: u32) -> usize;

    /// Maps the timestamp of the next source frame to the timestamp of the
    /// first sample the following `convert` will emit.
    ///
    /// Both values are in units of `1 / (source_rate * target_rate)` seconds.
    /// Called before capacity is estimated for that frame. A push that fails
    /// before `convert` is retried with the same timestamp, so a repeated
    /// call must return the same value without scheduling anything twice.
    fn next_output_pts(&mut self, pts: i64) -> i64;
}

impl<E: ResampleEngine + ?Sized> ResampleEngine for Box<E> {
    fn estimate_output_capacity(&mut self, input_samples: usize) -> ResampleResult<usize> {
        (**self).estimate_output_capacity(input_samples)
    }

    fn convert(&mut self, dst: &mut AudioFrame, src: Option<&AudioFrame>) -> ResampleResult<usize> {
        (**self).convert(dst, src)
    }

    fn internal_delay(&self, base: u32) -> usize {
        (**self).internal_delay(base)
    }

    fn next_output_pts(&mut self, pts: i64) -> i64 {
        (**self).next_output_pts(pts)
    }
}
