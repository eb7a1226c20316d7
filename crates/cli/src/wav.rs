//! RIFF/WAVE output
//!
//! Mono and stereo streams get a plain `fmt ` chunk; anything else is written
//! as `WAVE_FORMAT_EXTENSIBLE` with the layout mask as the speaker mask.
//! The RIFF and data sizes are patched in by [`WavWriter::finish`].

use anyhow::{bail, Context, Result};
use pcmflow_core::{AudioFrame, ChannelLayout, SampleFormat};
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

const WAVE_FORMAT_PCM: u16 = 0x0001;
const WAVE_FORMAT_IEEE_FLOAT: u16 = 0x0003;
const WAVE_FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// Tail shared by the KSDATAFORMAT_SUBTYPE GUIDs; the first two bytes carry
/// the format tag
const SUBTYPE_TAIL: [u8; 14] = [
    0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xAA, 0x00, 0x38, 0x9B, 0x71,
];

/// Byte offset of the RIFF size field
const RIFF_SIZE_OFFSET: u64 = 4;

pub struct WavWriter<W: Write + Seek> {
    out: W,
    layout: ChannelLayout,
    format: SampleFormat,
    sample_rate: u32,
    data_size_offset: u64,
    data_bytes: u64,
    interleave: Vec<u8>,
}

impl WavWriter<BufWriter<File>> {
    /// Creates `path` and writes the header
    pub fn create(
        path: &Path,
        layout: ChannelLayout,
        format: SampleFormat,
        sample_rate: u32,
    ) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        Self::new(BufWriter::new(file), layout, format, sample_rate)
    }
}

impl<W: Write + Seek> WavWriter<W> {
    pub fn new(
        mut out: W,
        layout: ChannelLayout,
        format: SampleFormat,
        sample_rate: u32,
    ) -> Result<Self> {
        let data_size_offset = write_header(&mut out, layout, format, sample_rate)?;

        Ok(Self {
            out,
            layout,
            format,
            sample_rate,
            data_size_offset,
            data_bytes: 0,
            interleave: Vec::new(),
        })
    }

    /// Appends the valid samples of `frame`, interleaving planar data
    pub fn write_frame(&mut self, frame: &AudioFrame) -> Result<()> {
        if frame.layout() != self.layout
            || frame.format().packed() != self.format.packed()
            || frame.sample_rate() != self.sample_rate
        {
            bail!(
                "Frame {} {} {} Hz does not match the file ({} {} {} Hz)",
                frame.layout(),
                frame.format(),
                frame.sample_rate(),
                self.layout,
                self.format,
                self.sample_rate
            );
        }

        if frame.format().is_planar() {
            self.interleave_planes(frame)?;
            self.out.write_all(&self.interleave)?;
            self.data_bytes += self.interleave.len() as u64;
        } else {
            let bytes = frame.plane(0).unwrap_or_default();
            self.out.write_all(bytes)?;
            self.data_bytes += bytes.len() as u64;
        }

        Ok(())
    }

    fn interleave_planes(&mut self, frame: &AudioFrame) -> Result<()> {
        let width = frame.format().bytes_per_sample();
        let channels = frame.channels();
        self.interleave.clear();
        self.interleave.resize(frame.samples() * channels * width, 0);

        for channel in 0..channels {
            let plane = frame
                .plane(channel)
                .with_context(|| format!("Frame has no plane {}", channel))?;
            for (i, sample) in plane.chunks_exact(width).enumerate() {
                let at = (i * channels + channel) * width;
                self.interleave[at..at + width].copy_from_slice(sample);
            }
        }

        Ok(())
    }

    /// Samples per channel written so far
    pub fn samples_written(&self) -> u64 {
        self.data_bytes / block_align(self.layout, self.format) as u64
    }

    /// Pads the data chunk, fixes up the size fields and returns the writer
    pub fn finish(mut self) -> Result<W> {
        let Ok(data_size) = u32::try_from(self.data_bytes) else {
            bail!("{} bytes of audio do not fit in a WAV file", self.data_bytes);
        };

        if data_size % 2 == 1 {
            self.out.write_all(&[0])?;
        }
        let end = self.out.stream_position()?;
        let riff_size = u32::try_from(end - 8)
            .context("WAV file exceeds 4 GiB")?;

        self.out.seek(SeekFrom::Start(RIFF_SIZE_OFFSET))?;
        self.out.write_all(&riff_size.to_le_bytes())?;
        self.out.seek(SeekFrom::Start(self.data_size_offset))?;
        self.out.write_all(&data_size.to_le_bytes())?;
        self.out.seek(SeekFrom::Start(end))?;
        self.out.flush()?;

        Ok(self.out)
    }
}

fn block_align(layout: ChannelLayout, format: SampleFormat) -> usize {
    layout.channels() * format.bytes_per_sample()
}

fn needs_extensible(layout: ChannelLayout) -> bool {
    layout != ChannelLayout::MONO && layout != ChannelLayout::STEREO
}

/// Writes everything up to the data payload, returning the offset of the
/// data size field
fn write_header<W: Write + Seek>(
    out: &mut W,
    layout: ChannelLayout,
    format: SampleFormat,
    sample_rate: u32,
) -> Result<u64> {
    let Ok(channels) = u16::try_from(layout.channels()) else {
        bail!("Too many channels for WAV: {}", layout.channels());
    };
    let bits = (format.bytes_per_sample() * 8) as u16;
    let align = block_align(layout, format) as u16;
    let byte_rate = sample_rate
        .checked_mul(align as u32)
        .context("Byte rate overflows the WAV header")?;
    let tag = if format.is_float() {
        WAVE_FORMAT_IEEE_FLOAT
    } else {
        WAVE_FORMAT_PCM
    };
    let extensible = needs_extensible(layout);

    let mut fmt = Vec::with_capacity(40);
    fmt.extend_from_slice(&if extensible { WAVE_FORMAT_EXTENSIBLE } else { tag }.to_le_bytes());
    fmt.extend_from_slice(&channels.to_le_bytes());
    fmt.extend_from_slice(&sample_rate.to_le_bytes());
    fmt.extend_from_slice(&byte_rate.to_le_bytes());
    fmt.extend_from_slice(&align.to_le_bytes());
    fmt.extend_from_slice(&bits.to_le_bytes());
    if extensible {
        let Ok(mask) = u32::try_from(layout.mask()) else {
            bail!("Layout {} has no WAV speaker mask", layout);
        };
        fmt.extend_from_slice(&22u16.to_le_bytes());
        fmt.extend_from_slice(&bits.to_le_bytes());
        fmt.extend_from_slice(&mask.to_le_bytes());
        fmt.extend_from_slice(&tag.to_le_bytes());
        fmt.extend_from_slice(&SUBTYPE_TAIL);
    } else if tag != WAVE_FORMAT_PCM {
        fmt.extend_from_slice(&0u16.to_le_bytes());
    }

    out.write_all(b"RIFF")?;
    out.write_all(&0u32.to_le_bytes())?;
    out.write_all(b"WAVE")?;
    out.write_all(b"fmt ")?;
    out.write_all(&(fmt.len() as u32).to_le_bytes())?;
    out.write_all(&fmt)?;
    out.write_all(b"data")?;
    let data_size_offset = out.stream_position()?;
    out.write_all(&0u32.to_le_bytes())?;

    Ok(data_size_offset)
}
