//! Core audio types shared by the pcmflow crates
//!
//! Time bases and overflow-safe rescaling, channel layouts, sample formats and
//! the reference-counted [`AudioFrame`].

pub mod error;
pub mod format;
pub mod frame;
pub mod layout;
pub mod quality;
pub mod time;

// Re-export commonly used types
pub use error::{ErrorSeverity, MediaError, MediaResult};
pub use format::SampleFormat;
pub use frame::AudioFrame;
pub use layout::{Channel, ChannelLayout};
pub use quality::ResampleQuality;
pub use time::{rescale, rescale_raw, rounded_div, Rounding, TimeBase, Timestamp};
