//! Sample formats and the scalar sample codec
//!
//! All formats store samples little-endian. Packed formats interleave every
//! channel in plane 0; planar formats keep one plane per channel.

use crate::error::MediaError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Storage format of a single sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SampleFormat {
    U8,
    S16,
    S32,
    F32,
    F64,
    U8Planar,
    S16Planar,
    S32Planar,
    F32Planar,
    F64Planar,
}

impl SampleFormat {
    pub const ALL: [SampleFormat; 10] = [
        SampleFormat::U8,
        SampleFormat::S16,
        SampleFormat::S32,
        SampleFormat::F32,
        SampleFormat::F64,
        SampleFormat::U8Planar,
        SampleFormat::S16Planar,
        SampleFormat::S32Planar,
        SampleFormat::F32Planar,
        SampleFormat::F64Planar,
    ];

    /// Bytes used by one sample of one channel
    pub const fn bytes_per_sample(&self) -> usize {
        match self {
            Self::U8 | Self::U8Planar => 1,
            Self::S16 | Self::S16Planar => 2,
            Self::S32 | Self::S32Planar | Self::F32 | Self::F32Planar => 4,
            Self::F64 | Self::F64Planar => 8,
        }
    }

    pub const fn is_planar(&self) -> bool {
        matches!(
            self,
            Self::U8Planar | Self::S16Planar | Self::S32Planar | Self::F32Planar | Self::F64Planar
        )
    }

    pub const fn is_float(&self) -> bool {
        matches!(
            self,
            Self::F32 | Self::F32Planar | Self::F64 | Self::F64Planar
        )
    }

    /// Interleaved variant of this format
    pub const fn packed(&self) -> Self {
        match self {
            Self::U8 | Self::U8Planar => Self::U8,
            Self::S16 | Self::S16Planar => Self::S16,
            Self::S32 | Self::S32Planar => Self::S32,
            Self::F32 | Self::F32Planar => Self::F32,
            Self::F64 | Self::F64Planar => Self::F64,
        }
    }

    /// Planar variant of this format
    pub const fn planar(&self) -> Self {
        match self {
            Self::U8 | Self::U8Planar => Self::U8Planar,
            Self::S16 | Self::S16Planar => Self::S16Planar,
            Self::S32 | Self::S32Planar => Self::S32Planar,
            Self::F32 | Self::F32Planar => Self::F32Planar,
            Self::F64 | Self::F64Planar => Self::F64Planar,
        }
    }

    /// Short FFmpeg-style name, e.g. `s16` or `fltp`
    pub const fn name(&self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::S16 => "s16",
            Self::S32 => "s32",
            Self::F32 => "flt",
            Self::F64 => "dbl",
            Self::U8Planar => "u8p",
            Self::S16Planar => "s16p",
            Self::S32Planar => "s32p",
            Self::F32Planar => "fltp",
            Self::F64Planar => "dblp",
        }
    }

    /// Decodes one sample into the nominal `[-1.0, 1.0]` range.
    ///
    /// `bytes` must hold at least [`bytes_per_sample`](Self::bytes_per_sample) bytes.
    #[inline]
    pub fn read_f32(&self, bytes: &[u8]) -> f32 {
        match self.packed() {
            Self::U8 => (bytes[0] as f32 - 128.0) / 128.0,
            Self::S16 => i16::from_le_bytes([bytes[0], bytes[1]]) as f32 / 32_768.0,
            Self::S32 => {
                let v = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                (v as f64 / 2_147_483_648.0) as f32
            }
            Self::F32 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            _ => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&bytes[..8]);
                f64::from_le_bytes(raw) as f32
            }
        }
    }

    /// Encodes one sample, clipping integer formats to their range
    #[inline]
    pub fn write_f32(&self, bytes: &mut [u8], value: f32) {
        match self.packed() {
            Self::U8 => {
                bytes[0] = (value * 128.0 + 128.0).round().clamp(0.0, 255.0) as u8;
            }
            Self::S16 => {
                let v = (value * 32_768.0).round().clamp(-32_768.0, 32_767.0) as i16;
                bytes[..2].copy_from_slice(&v.to_le_bytes());
            }
            Self::S32 => {
                let v = (value as f64 * 2_147_483_648.0)
                    .round()
                    .clamp(-2_147_483_648.0, 2_147_483_647.0) as i32;
                bytes[..4].copy_from_slice(&v.to_le_bytes());
            }
            Self::F32 => bytes[..4].copy_from_slice(&value.to_le_bytes()),
            _ => bytes[..8].copy_from_slice(&(value as f64).to_le_bytes()),
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SampleFormat {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();

        let format = match name.as_str() {
            "f32" => Some(Self::F32),
            "f64" => Some(Self::F64),
            "f32p" => Some(Self::F32Planar),
            "f64p" => Some(Self::F64Planar),
            other => Self::ALL.into_iter().find(|format| format.name() == other),
        };

        format.ok_or_else(|| MediaError::invalid_argument("sample_format", format!("unknown format '{}'", s)))
    }
}

impl TryFrom<String> for SampleFormat {
    type Error = MediaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SampleFormat> for String {
    fn from(format: SampleFormat) -> Self {
        format.name().to_string()
    }
}
