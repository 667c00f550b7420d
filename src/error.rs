//! Error types for the capture/streaming application

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Button error: {0}")]
    Button(#[from] ButtonError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("WAV error: {0}")]
    Wav(#[from] WavError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Audio channel and transfer errors
#[derive(Error, Debug)]
pub enum AudioError {
    /// Enabling or disabling the hardware channel failed. There is no
    /// recovery path at the driver level; binaries treat this as fatal.
    #[error("Channel unavailable: {0}")]
    ChannelUnavailable(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// A whole-buffer transfer returned fewer samples than requested
    /// within the timeout.
    #[error("Short transfer: expected {expected} samples, got {actual}")]
    ShortTransfer { expected: usize, actual: usize },

    /// A chunked transfer stalled before reaching the target count.
    /// Samples up to `transferred` are valid.
    #[error("Partial transfer: {transferred} of {requested} samples")]
    PartialTransfer { requested: usize, transferred: usize },

    /// The transfer engine is held by another action or a running
    /// streaming session.
    #[error("Audio channel is busy")]
    Busy,
}

/// Button dispatch errors
#[derive(Error, Debug)]
pub enum ButtonError {
    #[error("Invalid button index: {0}")]
    InvalidIndex(usize),

    #[error("Dispatch task spawn failed: {0}")]
    TaskSpawn(String),
}

/// Network errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    /// The peer accepted fewer bytes than offered.
    #[error("Send incomplete: {accepted} of {offered} bytes accepted")]
    SendIncomplete { offered: usize, accepted: usize },

    #[error("Socket is not connected")]
    NotConnected,
}

/// Streaming session failures. Any of these terminates the current
/// session only; button dispatch is unaffected.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Read stalled: got {got} of {requested} samples")]
    ReadStall { requested: usize, got: usize },

    #[error("Send incomplete: {accepted} of {offered} bytes accepted")]
    SendIncomplete { offered: usize, accepted: usize },

    #[error("Socket error: {0}")]
    Socket(String),

    #[error("Capture channel unavailable: {0}")]
    Channel(String),

    #[error("Session task spawn failed: {0}")]
    TaskSpawn(String),
}

/// WAV header validation errors
#[derive(Error, Debug)]
pub enum WavError {
    #[error("Header too short: {0} bytes")]
    TooShort(usize),

    #[error("Bad {0} tag")]
    BadTag(&'static str),

    #[error("Unsupported format code: {0}")]
    UnsupportedFormat(u16),

    #[error("Inconsistent header field: {0}")]
    Inconsistent(&'static str),
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;
