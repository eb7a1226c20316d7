//! Channel remixing between layouts

use pcmflow_core::{Channel, ChannelLayout};
use std::f32::consts::FRAC_1_SQRT_2;

/// Linear mix from one layout to another.
///
/// `matrix[out][in]` is the gain applied to input channel `in` when forming
/// output channel `out`, both indexed in storage order.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMixer {
    source: ChannelLayout,
    target: ChannelLayout,
    matrix: Vec<Vec<f32>>,
}

impl ChannelMixer {
    /// Builds the mix matrix.
    ///
    /// Shared positions pass through at unity. The centre is split into the
    /// front pair at -3 dB (and vice versa); side and back pairs fold into
    /// whichever pair the target has, else into the front at -3 dB. LFE is
    /// dropped when the target has no LFE. If any output row would exceed
    /// unity gain the whole matrix is scaled down.
    pub fn new(source: ChannelLayout, target: ChannelLayout) -> Self {
        let mut gains = [[0.0f32; 11]; 11];

        for channel in source.positions() {
            let i = channel as usize;
            if target.contains(channel) {
                gains[i][i] = 1.0;
                continue;
            }

            for (out, gain) in fold(channel, target) {
                gains[out as usize][i] += gain;
            }
        }

        let mut matrix: Vec<Vec<f32>> = target
            .positions()
            .map(|out| {
                source
                    .positions()
                    .map(|input| gains[out as usize][input as usize])
                    .collect()
            })
            .collect();

        let peak = matrix
            .iter()
            .map(|row| row.iter().map(|g| g.abs()).sum::<f32>())
            .fold(0.0f32, f32::max);
        if peak > 1.0 {
            for gain in matrix.iter_mut().flatten() {
                *gain /= peak;
            }
        }

        Self {
            source,
            target,
            matrix,
        }
    }

    pub fn source(&self) -> ChannelLayout {
        self.source
    }

    pub fn target(&self) -> ChannelLayout {
        self.target
    }

    /// Gain from input storage index `input` to output storage index `output`
    pub fn gain(&self, output: usize, input: usize) -> f32 {
        self.matrix
            .get(output)
            .and_then(|row| row.get(input))
            .copied()
            .unwrap_or(0.0)
    }

    /// Mixes planar input (one `Vec` per source channel) into planar output
    pub fn apply(&self, input: &[Vec<f32>]) -> Vec<Vec<f32>> {
        let frames = input.first().map_or(0, Vec::len);

        self.matrix
            .iter()
            .map(|row| {
                let mut out = vec![0.0f32; frames];
                for (channel, gain) in input.iter().zip(row) {
                    if *gain == 0.0 {
                        continue;
                    }
                    for (o, s) in out.iter_mut().zip(channel) {
                        *o += s * gain;
                    }
                }
                out
            })
            .collect()
    }
}

/// Destinations for a source position the target lacks
fn fold(channel: Channel, target: ChannelLayout) -> Vec<(Channel, f32)> {
    use Channel::*;

    let has_front = target.contains(FrontLeft) && target.contains(FrontRight);
    let pair = |left: Channel, right: Channel, is_left: bool, gain: f32| {
        vec![(if is_left { left } else { right }, gain)]
    };

    match channel {
        FrontCenter if has_front => vec![(FrontLeft, FRAC_1_SQRT_2), (FrontRight, FRAC_1_SQRT_2)],
        FrontLeft | FrontRight if target.contains(FrontCenter) => {
            vec![(FrontCenter, FRAC_1_SQRT_2)]
        }
        FrontLeftOfCenter | FrontRightOfCenter if has_front => {
            pair(FrontLeft, FrontRight, channel == FrontLeftOfCenter, 1.0)
        }
        FrontLeftOfCenter | FrontRightOfCenter if target.contains(FrontCenter) => {
            vec![(FrontCenter, FRAC_1_SQRT_2)]
        }
        SideLeft | SideRight | BackLeft | BackRight => {
            let is_left = matches!(channel, SideLeft | BackLeft);
            if target.contains(SideLeft) && target.contains(SideRight) {
                pair(SideLeft, SideRight, is_left, 1.0)
            } else if target.contains(BackLeft) && target.contains(BackRight) {
                pair(BackLeft, BackRight, is_left, 1.0)
            } else if has_front {
                pair(FrontLeft, FrontRight, is_left, FRAC_1_SQRT_2)
            } else if target.contains(FrontCenter) {
                vec![(FrontCenter, FRAC_1_SQRT_2)]
            } else {
                Vec::new()
            }
        }
        BackCenter => {
            if target.contains(BackLeft) && target.contains(BackRight) {
                vec![(BackLeft, FRAC_1_SQRT_2), (BackRight, FRAC_1_SQRT_2)]
            } else if target.contains(SideLeft) && target.contains(SideRight) {
                vec![(SideLeft, FRAC_1_SQRT_2), (SideRight, FRAC_1_SQRT_2)]
            } else if has_front {
                vec![(FrontLeft, 0.5), (FrontRight, 0.5)]
            } else if target.contains(FrontCenter) {
                vec![(FrontCenter, FRAC_1_SQRT_2)]
            } else {
                Vec::new()
            }
        }
        _ => Vec::new(),
    }
}
