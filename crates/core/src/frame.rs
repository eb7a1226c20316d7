//! Reference-counted audio frames
//!
//! An [`AudioFrame`] is a handle to shared sample storage. Cloning a frame is
//! cheap and shares the storage; the sample count and timestamp belong to the
//! handle, so a clone can be handed out while the original is reset and
//! reused. Storage is writable only while a single handle refers to it.

use crate::error::{MediaError, MediaResult};
use crate::format::SampleFormat;
use crate::layout::ChannelLayout;
use crate::time::{TimeBase, Timestamp};
use std::sync::Arc;
use std::time::Duration;

/// A block of audio samples with a shared backing store
#[derive(Debug, Clone)]
pub struct AudioFrame {
    planes: Arc<Vec<Vec<u8>>>,
    layout: ChannelLayout,
    format: SampleFormat,
    sample_rate: u32,
    capacity: usize,
    samples: usize,
    pts: Timestamp,
}

impl AudioFrame {
    /// Allocates a silent frame able to hold `samples` samples per channel.
    ///
    /// The sample count of the new frame equals its capacity. Allocation
    /// failure is reported as [`MediaError::OutOfMemory`] instead of aborting.
    pub fn alloc(
        layout: ChannelLayout,
        format: SampleFormat,
        sample_rate: u32,
        samples: usize,
    ) -> MediaResult<Self> {
        if sample_rate == 0 {
            return Err(MediaError::invalid_argument(
                "sample_rate",
                "must be non-zero",
            ));
        }

        let (plane_count, plane_len) = plane_geometry(layout, format, samples)?;
        let silence = if format.packed() == SampleFormat::U8 {
            0x80
        } else {
            0
        };

        let mut planes = Vec::new();
        planes
            .try_reserve_exact(plane_count)
            .map_err(|_| out_of_memory(plane_count, plane_len))?;

        for _ in 0..plane_count {
            let mut plane = Vec::new();
            plane
                .try_reserve_exact(plane_len)
                .map_err(|_| out_of_memory(plane_count, plane_len))?;
            plane.resize(plane_len, silence);
            planes.push(plane);
        }

        Ok(Self {
            planes: Arc::new(planes),
            layout,
            format,
            sample_rate,
            capacity: samples,
            samples,
            pts: Timestamp::null(),
        })
    }

    /// Wraps existing plane data. Every plane must have the same length and
    /// hold a whole number of samples.
    pub fn from_planes(
        layout: ChannelLayout,
        format: SampleFormat,
        sample_rate: u32,
        planes: Vec<Vec<u8>>,
    ) -> MediaResult<Self> {
        if sample_rate == 0 {
            return Err(MediaError::invalid_argument(
                "sample_rate",
                "must be non-zero",
            ));
        }

        let expected_planes = if format.is_planar() {
            layout.channels()
        } else {
            1
        };
        if planes.len() != expected_planes {
            return Err(MediaError::invalid_argument(
                "planes",
                format!("expected {} planes, got {}", expected_planes, planes.len()),
            ));
        }

        let stride = sample_stride(layout, format);
        let len = planes[0].len();
        if planes.iter().any(|plane| plane.len() != len) || len % stride != 0 {
            return Err(MediaError::invalid_argument(
                "planes",
                "planes must have equal length and hold whole samples",
            ));
        }

        let samples = len / stride;
        Ok(Self {
            planes: Arc::new(planes),
            layout,
            format,
            sample_rate,
            capacity: samples,
            samples,
            pts: Timestamp::null(),
        })
    }

    /// Builds a frame from interleaved `f32` samples, encoding them into
    /// `format`
    pub fn from_f32(
        layout: ChannelLayout,
        format: SampleFormat,
        sample_rate: u32,
        interleaved: &[f32],
    ) -> MediaResult<Self> {
        let channels = layout.channels();
        if interleaved.len() % channels != 0 {
            return Err(MediaError::invalid_argument(
                "interleaved",
                format!(
                    "{} values do not divide into {} channels",
                    interleaved.len(),
                    channels
                ),
            ));
        }

        let samples = interleaved.len() / channels;
        let mut frame = Self::alloc(layout, format, sample_rate, samples)?;
        for ch in 0..channels {
            let channel: Vec<f32> = interleaved
                .iter()
                .skip(ch)
                .step_by(channels)
                .copied()
                .collect();
            frame.write_f32(ch, 0, &channel)?;
        }

        Ok(frame)
    }

    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    pub fn format(&self) -> SampleFormat {
        self.format
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.layout.channels()
    }

    /// Maximum number of samples per channel the storage can hold
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of valid samples per channel
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Sets the number of valid samples
    pub fn set_samples(&mut self, samples: usize) -> MediaResult<()> {
        if samples > self.capacity {
            return Err(MediaError::CapacityExceeded {
                end: samples,
                capacity: self.capacity,
            });
        }

        self.samples = samples;
        Ok(())
    }

    pub fn pts(&self) -> Timestamp {
        self.pts
    }

    pub fn set_pts(&mut self, pts: Timestamp) {
        self.pts = pts;
    }

    pub fn with_pts(mut self, pts: Timestamp) -> Self {
        self.pts = pts;
        self
    }

    /// Re-expresses the timestamp in another time base
    pub fn with_time_base(mut self, time_base: TimeBase) -> Self {
        self.pts = self.pts.with_time_base(time_base);
        self
    }

    /// Returns true if no other handle shares the storage
    pub fn is_writable(&self) -> bool {
        Arc::strong_count(&self.planes) == 1 && Arc::weak_count(&self.planes) == 0
    }

    /// Number of storage planes (one per channel when planar, else one)
    pub fn plane_count(&self) -> usize {
        self.planes.len()
    }

    /// Bytes of the valid samples in a plane
    pub fn plane(&self, index: usize) -> Option<&[u8]> {
        let valid = self.samples * sample_stride(self.layout, self.format);
        self.planes.get(index).map(|plane| &plane[..valid])
    }

    /// Mutable access to a whole plane, up to its capacity
    pub fn plane_mut(&mut self, index: usize) -> MediaResult<&mut [u8]> {
        let planes = Arc::get_mut(&mut self.planes).ok_or(MediaError::NotWritable)?;
        let count = planes.len();
        planes
            .get_mut(index)
            .map(|plane| plane.as_mut_slice())
            .ok_or_else(|| {
                MediaError::invalid_argument(
                    "plane",
                    format!("index {} out of {} planes", index, count),
                )
            })
    }

    /// Copies `count` samples of every channel from `src` (starting at
    /// `src_offset`) into this frame at `dst_offset`.
    ///
    /// Both frames must share layout and format. The source range must lie
    /// within the valid samples of `src`; the destination range within the
    /// capacity of this frame. The sample count of this frame is unchanged.
    pub fn copy_samples(
        &mut self,
        dst_offset: usize,
        src: &AudioFrame,
        src_offset: usize,
        count: usize,
    ) -> MediaResult<()> {
        if src.layout != self.layout || src.format != self.format {
            return Err(MediaError::FormatMismatch {
                expected: format!("{} {}", self.layout, self.format),
                actual: format!("{} {}", src.layout, src.format),
            });
        }

        let src_end = src_offset.saturating_add(count);
        if src_end > src.samples {
            return Err(MediaError::CapacityExceeded {
                end: src_end,
                capacity: src.samples,
            });
        }

        let dst_end = dst_offset.saturating_add(count);
        if dst_end > self.capacity {
            return Err(MediaError::CapacityExceeded {
                end: dst_end,
                capacity: self.capacity,
            });
        }

        let stride = sample_stride(self.layout, self.format);
        let planes = Arc::get_mut(&mut self.planes).ok_or(MediaError::NotWritable)?;
        for (dst, src) in planes.iter_mut().zip(src.planes.iter()) {
            dst[dst_offset * stride..dst_end * stride]
                .copy_from_slice(&src[src_offset * stride..src_end * stride]);
        }

        Ok(())
    }

    /// Decodes the valid samples of one channel
    pub fn channel_f32(&self, channel: usize) -> MediaResult<Vec<f32>> {
        let channels = self.channels();
        if channel >= channels {
            return Err(MediaError::invalid_argument(
                "channel",
                format!("index {} out of {} channels", channel, channels),
            ));
        }

        let bps = self.format.bytes_per_sample();
        let (plane, step, start) = if self.format.is_planar() {
            (&self.planes[channel], bps, 0)
        } else {
            (&self.planes[0], bps * channels, bps * channel)
        };

        Ok((0..self.samples)
            .map(|i| self.format.read_f32(&plane[start + i * step..]))
            .collect())
    }

    /// Encodes `values` into one channel starting at sample `offset`
    pub fn write_f32(&mut self, channel: usize, offset: usize, values: &[f32]) -> MediaResult<()> {
        let channels = self.channels();
        if channel >= channels {
            return Err(MediaError::invalid_argument(
                "channel",
                format!("index {} out of {} channels", channel, channels),
            ));
        }

        let end = offset.saturating_add(values.len());
        if end > self.capacity {
            return Err(MediaError::CapacityExceeded {
                end,
                capacity: self.capacity,
            });
        }

        let format = self.format;
        let bps = format.bytes_per_sample();
        let planar = format.is_planar();
        let planes = Arc::get_mut(&mut self.planes).ok_or(MediaError::NotWritable)?;
        let (plane, step, start) = if planar {
            (&mut planes[channel], bps, 0)
        } else {
            (&mut planes[0], bps * channels, bps * channel)
        };

        for (i, value) in values.iter().enumerate() {
            let pos = start + (offset + i) * step;
            format.write_f32(&mut plane[pos..pos + bps], *value);
        }

        Ok(())
    }

    /// Playback duration of the valid samples
    pub fn duration(&self) -> Duration {
        let nanos = self.samples as u128 * 1_000_000_000 / self.sample_rate as u128;
        Duration::from_nanos(nanos.min(u64::MAX as u128) as u64)
    }
}

/// Bytes between consecutive samples of one channel within a plane
fn sample_stride(layout: ChannelLayout, format: SampleFormat) -> usize {
    if format.is_planar() {
        format.bytes_per_sample()
    } else {
        format.bytes_per_sample() * layout.channels()
    }
}

fn plane_geometry(
    layout: ChannelLayout,
    format: SampleFormat,
    samples: usize,
) -> MediaResult<(usize, usize)> {
    let plane_count = if format.is_planar() {
        layout.channels()
    } else {
        1
    };

    let plane_len = samples
        .checked_mul(sample_stride(layout, format))
        .ok_or(MediaError::OutOfMemory {
            requested_bytes: u64::MAX,
        })?;

    Ok((plane_count, plane_len))
}

fn out_of_memory(plane_count: usize, plane_len: usize) -> MediaError {
    MediaError::OutOfMemory {
        requested_bytes: (plane_count as u64).saturating_mul(plane_len as u64),
    }
}
