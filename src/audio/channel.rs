//! Hardware audio channel interface
//!
//! A channel is a fixed-rate byte pipe with a small internal buffer.
//! Reads and writes may legitimately return short counts without error;
//! the transfer engine decides what a short count means.

use std::time::Duration;

use crate::error::AudioError;

/// One direction of a hardware audio channel.
///
/// `enable`/`disable` bracket every transfer; a failure there means the
/// underlying driver is in an unrecoverable state.
pub trait AudioChannel: Send {
    /// Start the channel clocking data.
    fn enable(&mut self) -> Result<(), AudioError>;

    /// Stop the channel. Idempotent.
    fn disable(&mut self) -> Result<(), AudioError>;

    /// Read up to `buf.len()` bytes, waiting at most `timeout`.
    /// Returns the number of bytes actually read; a short count is not
    /// an error at this layer.
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, AudioError>;

    /// Write up to `buf.len()` bytes, waiting at most `timeout`.
    /// Returns the number of bytes actually accepted.
    fn write(&mut self, buf: &[u8], timeout: Duration) -> Result<usize, AudioError>;
}
