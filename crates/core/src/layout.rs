//! Speaker positions and channel layouts
//!
//! A layout is a bit mask over speaker positions. Bit assignment follows the
//! WAVE_FORMAT_EXTENSIBLE channel mask, so masks read from files can be used
//! unchanged. Interleaved samples are stored in ascending bit order.

use crate::error::{MediaError, MediaResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single speaker position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    FrontLeft,
    FrontRight,
    FrontCenter,
    LowFrequency,
    BackLeft,
    BackRight,
    FrontLeftOfCenter,
    FrontRightOfCenter,
    BackCenter,
    SideLeft,
    SideRight,
}

impl Channel {
    /// All positions in mask order
    pub const ALL: [Channel; 11] = [
        Channel::FrontLeft,
        Channel::FrontRight,
        Channel::FrontCenter,
        Channel::LowFrequency,
        Channel::BackLeft,
        Channel::BackRight,
        Channel::FrontLeftOfCenter,
        Channel::FrontRightOfCenter,
        Channel::BackCenter,
        Channel::SideLeft,
        Channel::SideRight,
    ];

    /// Returns the mask bit for this position
    pub const fn bit(self) -> u64 {
        1 << (self as u32)
    }

    /// Short label, e.g. `FL`
    pub const fn label(self) -> &'static str {
        match self {
            Channel::FrontLeft => "FL",
            Channel::FrontRight => "FR",
            Channel::FrontCenter => "FC",
            Channel::LowFrequency => "LFE",
            Channel::BackLeft => "BL",
            Channel::BackRight => "BR",
            Channel::FrontLeftOfCenter => "FLC",
            Channel::FrontRightOfCenter => "FRC",
            Channel::BackCenter => "BC",
            Channel::SideLeft => "SL",
            Channel::SideRight => "SR",
        }
    }
}

const KNOWN_MASK: u64 = (1 << Channel::ALL.len()) - 1;

/// A set of speaker positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChannelLayout {
    mask: u64,
}

impl ChannelLayout {
    pub const MONO: Self = Self::from_channels(&[Channel::FrontCenter]);
    pub const STEREO: Self = Self::from_channels(&[Channel::FrontLeft, Channel::FrontRight]);
    pub const STEREO_2_1: Self = Self::STEREO.with(Channel::LowFrequency);
    pub const SURROUND: Self = Self::STEREO.with(Channel::FrontCenter);
    pub const QUAD: Self = Self::STEREO.with(Channel::BackLeft).with(Channel::BackRight);
    pub const LAYOUT_5_0: Self = Self::SURROUND
        .with(Channel::SideLeft)
        .with(Channel::SideRight);
    pub const LAYOUT_5_1: Self = Self::LAYOUT_5_0.with(Channel::LowFrequency);
    pub const LAYOUT_6_1: Self = Self::LAYOUT_5_1.with(Channel::BackCenter);
    pub const LAYOUT_7_1: Self = Self::LAYOUT_5_1
        .with(Channel::BackLeft)
        .with(Channel::BackRight);

    const NAMED: [(&'static str, ChannelLayout); 9] = [
        ("mono", Self::MONO),
        ("stereo", Self::STEREO),
        ("2.1", Self::STEREO_2_1),
        ("3.0", Self::SURROUND),
        ("quad", Self::QUAD),
        ("5.0", Self::LAYOUT_5_0),
        ("5.1", Self::LAYOUT_5_1),
        ("6.1", Self::LAYOUT_6_1),
        ("7.1", Self::LAYOUT_7_1),
    ];

    const fn from_channels(channels: &[Channel]) -> Self {
        let mut mask = 0;
        let mut i = 0;
        while i < channels.len() {
            mask |= channels[i].bit();
            i += 1;
        }
        Self { mask }
    }

    const fn with(self, channel: Channel) -> Self {
        Self {
            mask: self.mask | channel.bit(),
        }
    }

    /// Creates a layout from a raw mask, rejecting empty or unknown masks
    pub fn from_mask(mask: u64) -> MediaResult<Self> {
        if mask == 0 || mask & !KNOWN_MASK != 0 {
            return Err(MediaError::UnsupportedLayout {
                layout: format!("{:#x}", mask),
            });
        }

        Ok(Self { mask })
    }

    /// Returns the conventional layout for a channel count
    pub fn default_for(channels: usize) -> MediaResult<Self> {
        let layout = match channels {
            1 => Self::MONO,
            2 => Self::STEREO,
            3 => Self::SURROUND,
            4 => Self::QUAD,
            5 => Self::LAYOUT_5_0,
            6 => Self::LAYOUT_5_1,
            7 => Self::LAYOUT_6_1,
            8 => Self::LAYOUT_7_1,
            n if n > 8 && n <= Channel::ALL.len() => Self {
                mask: (1 << n) - 1,
            },
            n => {
                return Err(MediaError::UnsupportedLayout {
                    layout: format!("{} channels", n),
                })
            }
        };

        Ok(layout)
    }

    /// Returns the raw mask
    pub const fn mask(&self) -> u64 {
        self.mask
    }

    /// Number of channels in the layout
    pub const fn channels(&self) -> usize {
        self.mask.count_ones() as usize
    }

    /// Returns true if the layout contains the position
    pub const fn contains(&self, channel: Channel) -> bool {
        self.mask & channel.bit() != 0
    }

    /// Iterates the positions in storage order
    pub fn positions(&self) -> impl Iterator<Item = Channel> + '_ {
        Channel::ALL
            .into_iter()
            .filter(move |channel| self.contains(*channel))
    }

    /// Storage index of a position, if present
    pub fn index_of(&self, channel: Channel) -> Option<usize> {
        if !self.contains(channel) {
            return None;
        }

        Some((self.mask & (channel.bit() - 1)).count_ones() as usize)
    }
}

impl fmt::Display for ChannelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Self::NAMED.iter().find(|(_, layout)| layout == self) {
            Some((name, _)) => write!(f, "{}", name),
            None => write!(f, "{:#x}", self.mask),
        }
    }
}

impl FromStr for ChannelLayout {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();

        if let Some((_, layout)) = Self::NAMED.iter().find(|(n, _)| *n == name) {
            return Ok(*layout);
        }

        if let Some(hex) = name.strip_prefix("0x") {
            let mask = u64::from_str_radix(hex, 16).map_err(|_| MediaError::UnsupportedLayout {
                layout: s.to_string(),
            })?;
            return Self::from_mask(mask);
        }

        if let Some(count) = name.strip_suffix('c') {
            if let Ok(count) = count.parse::<usize>() {
                return Self::default_for(count);
            }
        }

        Err(MediaError::UnsupportedLayout {
            layout: s.to_string(),
        })
    }
}

impl TryFrom<String> for ChannelLayout {
    type Error = MediaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ChannelLayout> for String {
    fn from(layout: ChannelLayout) -> Self {
        layout.to_string()
    }
}
