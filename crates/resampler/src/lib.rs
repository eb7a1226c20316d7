//! Audio resampler - push/pull conversion of PCM frames between sample
//! rates, channel layouts and sample formats

mod decoder;
pub mod engine;
mod error;
mod resampler;
mod settings;
mod stats;

pub use decoder::AudioDecoder;
pub use engine::{ChannelMixer, ResampleEngine, SampleConverter};
pub use error::{ResampleError, ResampleResult};
pub use resampler::{FlushState, PushStatus, Resampler};
pub use settings::{ResamplerBuilder, ResamplerConfig, MAX_FRAME_SAMPLES};
pub use stats::ResamplerStats;

pub use pcmflow_core::{
    AudioFrame, ChannelLayout, ResampleQuality, SampleFormat, TimeBase, Timestamp,
};

pub type Result<T> = std::result::Result<T, ResampleError>;
