//! Audio subsystem: channel abstraction, sample conversion and the
//! chunked transfer engine

pub mod channel;
pub mod convert;
pub mod device;
pub mod engine;

pub use channel::AudioChannel;
pub use convert::{fan_out_stereo, narrow_sample, pcm32_to_pcm16};
pub use device::{CpalChannel, SampleWidth};
pub use engine::{SharedEngine, TransferEngine, TransferParams};
