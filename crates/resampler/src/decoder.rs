use crate::error::{ResampleError, ResampleResult};
use log::{debug, warn};
use pcmflow_core::{AudioFrame, ChannelLayout, SampleFormat, TimeBase, Timestamp};
use std::path::Path;
use symphonia::core::audio::{Channels, SampleBuffer};
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Reads the default track of a media file as packed `f32` frames.
///
/// Each frame carries the packet timestamp in the track time base.
pub struct AudioDecoder {
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    layout: ChannelLayout,
    sample_rate: u32,
    time_base: TimeBase,
    total_samples: Option<u64>,
    sample_buf: Option<SampleBuffer<f32>>,
}

impl AudioDecoder {
    pub fn open(path: &Path) -> ResampleResult<Self> {
        let file = std::fs::File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(extension);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| ResampleError::Decode(format!("Failed to probe format: {}", e)))?;

        let reader = probed.format;

        let track = reader
            .default_track()
            .ok_or_else(|| ResampleError::Decode("No audio track found".to_string()))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let sample_rate = codec_params
            .sample_rate
            .ok_or_else(|| ResampleError::Decode("Track has no sample rate".to_string()))?;
        let channels = codec_params
            .channels
            .ok_or_else(|| ResampleError::Decode("Track has no channel layout".to_string()))?;
        let layout = layout_for(channels)?;

        let time_base = codec_params
            .time_base
            .map(|tb| TimeBase::new(tb.numer, tb.denom))
            .filter(TimeBase::is_valid)
            .unwrap_or_else(|| TimeBase::for_sample_rate(sample_rate));

        let decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| ResampleError::Decode(format!("Failed to create decoder: {}", e)))?;

        debug!(
            "Opened {}: {} {}Hz, time base {}",
            path.display(),
            layout,
            sample_rate,
            time_base
        );

        Ok(Self {
            reader,
            decoder,
            track_id,
            layout,
            sample_rate,
            time_base,
            total_samples: codec_params.n_frames,
            sample_buf: None,
        })
    }

    /// Decodes the next packet, or returns `None` at end of stream.
    /// Corrupt packets are skipped.
    pub fn next_frame(&mut self) -> ResampleResult<Option<AudioFrame>> {
        loop {
            let packet = match self.reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(None);
                }
                Err(SymphoniaError::ResetRequired) => {
                    debug!("Stream reset requested, treating as end of stream");
                    return Ok(None);
                }
                Err(e) => {
                    return Err(ResampleError::Decode(format!(
                        "Failed to read packet: {}",
                        e
                    )));
                }
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("Decode error, skipping packet: {}", e);
                    continue;
                }
                Err(e) => {
                    return Err(ResampleError::Decode(format!(
                        "Failed to decode packet: {}",
                        e
                    )));
                }
            };

            let spec = *decoded.spec();
            if decoded.frames() == 0 {
                continue;
            }

            let needed = decoded.capacity() * spec.channels.count();
            let needs_buffer = self
                .sample_buf
                .as_ref()
                .map_or(true, |buf| buf.capacity() < needed);
            if needs_buffer {
                self.sample_buf = Some(SampleBuffer::<f32>::new(decoded.capacity() as u64, spec));
            }

            let Some(buf) = self.sample_buf.as_mut() else {
                continue;
            };
            buf.copy_interleaved_ref(decoded);

            let layout = layout_for(spec.channels)?;
            let frame = AudioFrame::from_f32(layout, SampleFormat::F32, spec.rate, buf.samples())?
                .with_pts(Timestamp::new(packet.ts() as i64, self.time_base));

            return Ok(Some(frame));
        }
    }

    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    /// Always packed `f32`
    pub fn sample_format(&self) -> SampleFormat {
        SampleFormat::F32
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Time base of frame timestamps
    pub fn time_base(&self) -> TimeBase {
        self.time_base
    }

    /// Samples per channel in the track, if the container records it
    pub fn total_samples(&self) -> Option<u64> {
        self.total_samples
    }
}

/// Symphonia numbers its positions the same way as [`ChannelLayout`] for the
/// first eleven bits. A lone channel is always treated as mono, whatever
/// position the container gave it.
fn layout_for(channels: Channels) -> ResampleResult<ChannelLayout> {
    if channels.count() == 1 {
        return Ok(ChannelLayout::MONO);
    }

    ChannelLayout::from_mask(channels.bits() as u64)
        .or_else(|_| ChannelLayout::default_for(channels.count()))
        .map_err(|e| ResampleError::Decode(format!("Unsupported channel layout: {}", e)))
}
