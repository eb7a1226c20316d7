//! Sample rate stage backed by rubato

use crate::error::{ResampleError, ResampleResult};
use pcmflow_core::ResampleQuality;
use rubato::{
    FastFixedIn, PolynomialDegree, Resampler as RubatoResampler, SincFixedIn,
    SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

/// Input frames handed to the kernel per call. Kept small so a push only
/// waits for this many frames plus the filter window.
const CHUNK_SIZE: usize = 64;

/// Headroom for ratio changes; the ratio never changes, rubato requires >= 1
const MAX_RATIO_RELATIVE: f64 = 1.1;

/// Frames of history rubato's polynomial kernels interpolate over
const POLYNOMIAL_WINDOW: usize = 8;

enum Kernel {
    Fast(FastFixedIn<f32>),
    Sinc(SincFixedIn<f32>),
}

macro_rules! with_kernel {
    ($kernel:expr, $k:ident => $body:expr) => {
        match $kernel {
            Kernel::Fast($k) => $body,
            Kernel::Sinc($k) => $body,
        }
    };
}

/// Sinc filter settings per preset; `Fast` uses polynomial interpolation
fn sinc_parameters(quality: ResampleQuality) -> Option<SincInterpolationParameters> {
    match quality {
        ResampleQuality::Fast => None,
        ResampleQuality::Balanced => Some(SincInterpolationParameters {
            sinc_len: 16,
            f_cutoff: 0.88,
            oversampling_factor: 256,
            interpolation: SincInterpolationType::Cubic,
            window: WindowFunction::BlackmanHarris,
        }),
        ResampleQuality::Accurate => Some(SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            oversampling_factor: 512,
            interpolation: SincInterpolationType::Cubic,
            window: WindowFunction::BlackmanHarris2,
        }),
    }
}

/// Input frames the kernel reads past its current position
fn window_len(quality: ResampleQuality) -> usize {
    sinc_parameters(quality).map_or(POLYNOMIAL_WINDOW, |params| params.sinc_len)
}

impl Kernel {
    fn new(
        quality: ResampleQuality,
        source_rate: u32,
        target_rate: u32,
        channels: usize,
    ) -> ResampleResult<Self> {
        let ratio = target_rate as f64 / source_rate as f64;

        let Some(params) = sinc_parameters(quality) else {
            let kernel = FastFixedIn::<f32>::new(
                ratio,
                MAX_RATIO_RELATIVE,
                PolynomialDegree::Cubic,
                CHUNK_SIZE,
                channels,
            )?;
            return Ok(Self::Fast(kernel));
        };

        let kernel =
            SincFixedIn::<f32>::new(ratio, MAX_RATIO_RELATIVE, params, CHUNK_SIZE, channels)?;
        Ok(Self::Sinc(kernel))
    }

    fn output_frames_max(&self) -> usize {
        with_kernel!(self, k => k.output_frames_max())
    }

    /// Leading output frames that come before input time zero.
    ///
    /// The sinc kernels start with their window centred on the first input
    /// frame. The polynomial kernel starts half a window early.
    fn start_delay(&self) -> usize {
        match self {
            Self::Fast(k) => k.output_delay(),
            Self::Sinc(_) => 0,
        }
    }

    fn process(&mut self, input: &[&[f32]], output: &mut [Vec<f32>]) -> ResampleResult<usize> {
        let (_, written) = with_kernel!(self, k => k.process_into_buffer(input, output, None))?;
        Ok(written)
    }

    fn reset(&mut self) {
        with_kernel!(self, k => k.reset())
    }
}

/// Converts planar `f32` audio from one rate to another.
///
/// Equal rates use a zero-delay pass-through. Otherwise input is collected
/// into small fixed chunks for the kernel, and output sample `n` lines up
/// with input time `n / target_rate`.
pub(crate) struct RateStage {
    kernel: Option<Kernel>,
    channels: usize,
    ratio: f64,
    /// Most input frames that can sit in `fifo` or the kernel's window
    lookahead: usize,
    fifo: Vec<Vec<f32>>,
    output: Vec<Vec<f32>>,
    skip: usize,
}

impl RateStage {
    pub(crate) fn new(
        quality: ResampleQuality,
        source_rate: u32,
        target_rate: u32,
        channels: usize,
    ) -> ResampleResult<Self> {
        let ratio = target_rate as f64 / source_rate as f64;
        let kernel = if source_rate == target_rate {
            None
        } else {
            Some(Kernel::new(quality, source_rate, target_rate, channels)?)
        };

        let (output, lookahead, skip) = match &kernel {
            Some(k) => (
                vec![vec![0.0; k.output_frames_max()]; channels],
                CHUNK_SIZE + window_len(quality) + 1 + (1.0 / ratio).ceil() as usize,
                k.start_delay(),
            ),
            None => (Vec::new(), 0, 0),
        };

        Ok(Self {
            kernel,
            channels,
            ratio,
            lookahead,
            fifo: vec![Vec::new(); channels],
            output,
            skip,
        })
    }

    pub(crate) fn is_passthrough(&self) -> bool {
        self.kernel.is_none()
    }

    /// Input frames waiting for a complete chunk
    pub(crate) fn buffered(&self) -> usize {
        self.fifo.first().map_or(0, Vec::len)
    }

    /// Upper bound on the frames produced by the next `process` of `incoming`
    /// frames
    pub(crate) fn estimate(&self, incoming: usize) -> Option<usize> {
        if self.kernel.is_none() {
            return Some(incoming);
        }

        let frames = (incoming.checked_add(self.lookahead)? as f64 * self.ratio).ceil();
        if frames >= usize::MAX as f64 {
            return None;
        }
        (frames as usize).checked_add(2)
    }

    /// Feeds planar input and appends any converted frames to `out`
    pub(crate) fn process(&mut self, input: &[Vec<f32>], out: &mut [Vec<f32>]) -> ResampleResult<()> {
        if self.kernel.is_none() {
            for (dst, src) in out.iter_mut().zip(input) {
                dst.extend_from_slice(src);
            }
            return Ok(());
        }

        for (fifo, src) in self.fifo.iter_mut().zip(input) {
            fifo.extend_from_slice(src);
        }

        let ready = self.buffered() / CHUNK_SIZE * CHUNK_SIZE;
        let mut start = 0;
        while start < ready {
            self.run_chunk(start, out)?;
            start += CHUNK_SIZE;
        }

        for fifo in &mut self.fifo {
            fifo.drain(..ready);
        }

        Ok(())
    }

    /// Pushes silence through the kernel until at least `wanted` more frames
    /// have been appended to `out`, then resets the kernel for reuse
    pub(crate) fn drain(&mut self, wanted: usize, out: &mut [Vec<f32>]) -> ResampleResult<()> {
        if self.kernel.is_none() {
            return Ok(());
        }

        // once the window is flushed every chunk yields output, so this
        // bounds the loop
        let limit = wanted + self.lookahead / CHUNK_SIZE + 2;
        let start = out.first().map_or(0, Vec::len);
        let mut rounds = 0;

        while out.first().map_or(0, Vec::len) - start < wanted {
            if rounds > limit {
                return Err(ResampleError::conversion(
                    "rate kernel stopped producing output while draining",
                ));
            }

            for fifo in &mut self.fifo {
                fifo.resize(CHUNK_SIZE, 0.0);
            }
            self.run_chunk(0, out)?;
            for fifo in &mut self.fifo {
                fifo.clear();
            }
            rounds += 1;
        }

        self.reset();
        Ok(())
    }

    /// Discards buffered input and filter history
    pub(crate) fn reset(&mut self) {
        for fifo in &mut self.fifo {
            fifo.clear();
        }

        if let Some(kernel) = &mut self.kernel {
            kernel.reset();
            self.skip = kernel.start_delay();
        }
    }

    fn run_chunk(&mut self, start: usize, out: &mut [Vec<f32>]) -> ResampleResult<()> {
        let Some(kernel) = &mut self.kernel else {
            return Ok(());
        };

        let input: Vec<&[f32]> = self
            .fifo
            .iter()
            .map(|f| &f[start..start + CHUNK_SIZE])
            .collect();
        let written = kernel.process(&input, &mut self.output)?;

        let skipped = self.skip.min(written);
        self.skip -= skipped;

        for (dst, src) in out.iter_mut().zip(&self.output).take(self.channels) {
            dst.extend_from_slice(&src[skipped..written]);
        }

        Ok(())
    }
}
