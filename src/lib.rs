//! # Button Audio Streamer
//!
//! Button-triggered PCM capture, playback and live TCP streaming.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                          CAPTURE SIDE                              │
//! │  ┌─────────┐  falling edge   ┌───────────────┐                     │
//! │  │ Buttons │ ───────────────▶│ ISR handle    │ try_send (never     │
//! │  └─────────┘                 │ (non-blocking)│  blocks, may drop)  │
//! │                              └──────┬────────┘                     │
//! │                                     ▼ bounded(10)                  │
//! │                              ┌───────────────┐                     │
//! │                              │ Dispatcher    │ debounce + re-check │
//! │                              │ task          │ then run action     │
//! │                              └──────┬────────┘                     │
//! │              ┌──────────────────────┼──────────────────────┐       │
//! │              ▼                      ▼                      ▼       │
//! │        record/play            record + WAV           stream toggle │
//! │        self-test              frame + publish              │       │
//! │              │                      │                      ▼       │
//! │        ┌───────────────────────────────────┐      ┌──────────────┐ │
//! │        │  Transfer engine (chunked, timed) │◀────▶│ Stream task  │ │
//! │        └───────────────┬───────────────────┘      └──────┬───────┘ │
//! │                        ▼                                 │         │
//! │              ┌──────────────────┐                        │         │
//! │              │ Audio channel    │     capture → convert → send     │
//! │              │ (mic / speaker)  │                        │         │
//! │              └──────────────────┘                        ▼         │
//! │                                                 ┌──────────────┐   │
//! │                                                 │ TCP socket   │   │
//! │                                                 └──────┬───────┘   │
//! └────────────────────────────────────────────────────────┼───────────┘
//!                                                          │ LAN
//!                                                          ▼
//!                                                  ┌──────────────┐
//!                                                  │  receiver    │
//!                                                  └──────────────┘
//! ```

pub mod app;
pub mod audio;
pub mod buttons;
pub mod config;
pub mod error;
pub mod net;
pub mod stream;
pub mod wav;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Capture and playback sample rate in Hz
    pub const SAMPLE_RATE: u32 = 16_000;

    /// Channel count of the framed WAV output (mono capture)
    pub const WAV_CHANNELS: u16 = 1;

    /// Bits per narrow PCM sample
    pub const PCM16_BITS: u16 = 16;

    /// Largest single hardware transfer request, in samples
    pub const CHUNK_SAMPLES: usize = 1024;

    /// Default whole-transfer size in samples (2 s of mono at 16 kHz)
    pub const DEFAULT_SAMPLES: usize = 32_768;

    /// Right shift applied when narrowing a wide capture word to PCM16.
    /// The mic delivers 24 significant bits left-justified in a 32-bit
    /// word; shifting by 14 instead of 16 adds fixed digital gain, and
    /// the converter clamps whatever overshoots the 16-bit range.
    pub const PCM_SHIFT_BITS: u32 = 14;

    /// Timeout for a whole-buffer hardware transfer
    pub const TRANSFER_TIMEOUT_MS: u64 = 1000;

    /// Per-chunk timeout for chunked "safe" transfers
    pub const CHUNK_TIMEOUT_MS: u64 = 500;

    /// Number of button sources
    pub const BUTTON_COUNT: usize = 3;

    /// Capacity of the interrupt-to-task event queue
    pub const BUTTON_QUEUE_DEPTH: usize = 10;

    /// Debounce window in milliseconds
    pub const DEBOUNCE_MS: u64 = 50;

    /// Default peer address for streaming
    pub const DEFAULT_HOST: &str = "192.168.0.242";

    /// Default TCP port on both ends
    pub const DEFAULT_PORT: u16 = 8888;

    /// Receiver-side cap on a single incoming stream (one default WAV
    /// file plus slack)
    pub const MAX_STREAM_BYTES: usize = 130_000;
}
