//! Chunked, timeout-bounded audio transfer engine
//!
//! Whole-buffer operations issue a single hardware request and fail on a
//! short count. The "safe" variants aggregate many hardware-sized chunks
//! into the caller's buffer, bounding worst-case blocking to
//! `chunks x per-chunk timeout` and keeping whatever arrived before a
//! stall.
//!
//! The engine is shared behind a mutex; button actions and the streaming
//! session `try_lock` it so a direct record/play can never overlap a
//! running stream.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::audio::channel::AudioChannel;
use crate::audio::convert::{
    decode_pcm16_le, decode_pcm32_le, encode_pcm16_le, encode_pcm32_le, fan_out_stereo,
};
use crate::config::AudioConfig;
use crate::constants::{CHUNK_SAMPLES, CHUNK_TIMEOUT_MS, TRANSFER_TIMEOUT_MS};
use crate::error::AudioError;

/// Transfer sizing and timeouts
#[derive(Debug, Clone, Copy)]
pub struct TransferParams {
    /// Largest single hardware request, in samples
    pub chunk_samples: usize,
    /// Timeout for one whole-buffer request
    pub transfer_timeout: Duration,
    /// Timeout for one chunk of a safe transfer
    pub chunk_timeout: Duration,
    /// Pause between the phases of the loopback self-test
    pub loopback_pause: Duration,
}

impl Default for TransferParams {
    fn default() -> Self {
        Self {
            chunk_samples: CHUNK_SAMPLES,
            transfer_timeout: Duration::from_millis(TRANSFER_TIMEOUT_MS),
            chunk_timeout: Duration::from_millis(CHUNK_TIMEOUT_MS),
            loopback_pause: Duration::from_millis(1000),
        }
    }
}

impl From<&AudioConfig> for TransferParams {
    fn from(config: &AudioConfig) -> Self {
        Self {
            chunk_samples: config.chunk_samples,
            transfer_timeout: Duration::from_millis(config.transfer_timeout_ms),
            chunk_timeout: Duration::from_millis(config.chunk_timeout_ms),
            ..Self::default()
        }
    }
}

/// Transfer engine over one capture and one playback channel.
pub struct TransferEngine<R, W> {
    rx: R,
    tx: W,
    params: TransferParams,
}

/// Shared handle to the engine. Exactly one holder at a time; contenders
/// see [`AudioError::Busy`] through `try_lock`.
pub type SharedEngine<R, W> = Arc<Mutex<TransferEngine<R, W>>>;

impl<R: AudioChannel, W: AudioChannel> TransferEngine<R, W> {
    pub fn new(rx: R, tx: W) -> Self {
        Self::with_params(rx, tx, TransferParams::default())
    }

    pub fn with_params(rx: R, tx: W, params: TransferParams) -> Self {
        Self { rx, tx, params }
    }

    pub fn into_shared(self) -> SharedEngine<R, W> {
        Arc::new(Mutex::new(self))
    }

    pub fn params(&self) -> TransferParams {
        self.params
    }

    /// Split the engine back into its channels.
    pub fn into_parts(self) -> (R, W) {
        (self.rx, self.tx)
    }

    // --- session-level access -------------------------------------------
    //
    // The streaming task enables the capture channel once for the whole
    // session, reads many blocks, and disables it on the way out.

    pub fn enable_capture(&mut self) -> Result<(), AudioError> {
        self.rx.enable()
    }

    pub fn disable_capture(&mut self) -> Result<(), AudioError> {
        self.rx.disable()
    }

    /// Chunked read of one block of wide words, without touching channel
    /// enable state. Returns the sample count actually read.
    pub fn read_block_pcm32(&mut self, buf: &mut [i32]) -> Result<usize, AudioError> {
        let mut raw = vec![0u8; buf.len() * 4];
        let got = Self::chunked_read(&mut self.rx, &mut raw, 4, self.params)?;
        decode_pcm32_le(&raw[..got], buf);
        Ok(got / 4)
    }

    // --- whole-buffer transfers -----------------------------------------

    /// Read `buf.len()` narrow samples in one request.
    pub fn read_pcm16(&mut self, buf: &mut [i16]) -> Result<(), AudioError> {
        let mut raw = vec![0u8; buf.len() * 2];
        self.rx.enable()?;
        let res = self.rx.read(&mut raw, self.params.transfer_timeout);
        self.rx.disable()?;
        let got = res?;
        decode_pcm16_le(&raw[..got], buf);
        Self::check_whole(buf.len(), got / 2)
    }

    /// Read `buf.len()` wide words in one request.
    pub fn read_pcm32(&mut self, buf: &mut [i32]) -> Result<(), AudioError> {
        let mut raw = vec![0u8; buf.len() * 4];
        self.rx.enable()?;
        let res = self.rx.read(&mut raw, self.params.transfer_timeout);
        self.rx.disable()?;
        let got = res?;
        decode_pcm32_le(&raw[..got], buf);
        Self::check_whole(buf.len(), got / 4)
    }

    /// Play `buf.len()` narrow samples in one request.
    pub fn play_pcm16(&mut self, buf: &[i16]) -> Result<(), AudioError> {
        let raw = encode_pcm16_le(buf);
        self.tx.enable()?;
        let res = self.tx.write(&raw, self.params.transfer_timeout);
        self.tx.disable()?;
        Self::check_whole(buf.len(), res? / 2)
    }

    /// Play `buf.len()` wide words in one request.
    pub fn play_pcm32(&mut self, buf: &[i32]) -> Result<(), AudioError> {
        let raw = encode_pcm32_le(buf);
        self.tx.enable()?;
        let res = self.tx.write(&raw, self.params.transfer_timeout);
        self.tx.disable()?;
        Self::check_whole(buf.len(), res? / 4)
    }

    // --- safe chunked transfers -----------------------------------------

    /// Chunked read of `buf.len()` narrow samples. On a stall the samples
    /// received so far are left in `buf` and the partial count reported.
    pub fn read_pcm16_safe(&mut self, buf: &mut [i16]) -> Result<(), AudioError> {
        let mut raw = vec![0u8; buf.len() * 2];
        self.rx.enable()?;
        let res = Self::chunked_read(&mut self.rx, &mut raw, 2, self.params);
        // Disabled exactly once, whether the loop completed or stalled.
        self.rx.disable()?;
        let got = res?;
        decode_pcm16_le(&raw[..got], buf);
        Self::check_safe(buf.len(), got / 2)
    }

    /// Chunked read of `buf.len()` wide words.
    pub fn read_pcm32_safe(&mut self, buf: &mut [i32]) -> Result<(), AudioError> {
        let mut raw = vec![0u8; buf.len() * 4];
        self.rx.enable()?;
        let res = Self::chunked_read(&mut self.rx, &mut raw, 4, self.params);
        self.rx.disable()?;
        let got = res?;
        decode_pcm32_le(&raw[..got], buf);
        Self::check_safe(buf.len(), got / 4)
    }

    /// Chunked playback of `buf.len()` narrow samples.
    pub fn play_pcm16_safe(&mut self, buf: &[i16]) -> Result<(), AudioError> {
        let raw = encode_pcm16_le(buf);
        self.tx.enable()?;
        let res = Self::chunked_write(&mut self.tx, &raw, 2, self.params);
        self.tx.disable()?;
        Self::check_safe(buf.len(), res? / 2)
    }

    /// Chunked playback of `buf.len()` wide words.
    pub fn play_pcm32_safe(&mut self, buf: &[i32]) -> Result<(), AudioError> {
        let raw = encode_pcm32_le(buf);
        self.tx.enable()?;
        let res = Self::chunked_write(&mut self.tx, &raw, 4, self.params);
        self.tx.disable()?;
        Self::check_safe(buf.len(), res? / 4)
    }

    // --- self-tests ------------------------------------------------------

    /// Record, widen to stereo shape, play back. Narrow variant.
    pub fn loopback_test_pcm16(&mut self, buf: &mut [i16]) -> Result<(), AudioError> {
        tracing::info!("Recording...");
        self.read_pcm16_safe(buf)?;
        std::thread::sleep(self.params.loopback_pause);
        tracing::info!("Processing...");
        fan_out_stereo(buf);
        std::thread::sleep(self.params.loopback_pause);
        tracing::info!("Playing...");
        self.play_pcm16_safe(buf)
    }

    /// Record, widen to stereo shape, play back. Wide variant.
    pub fn loopback_test_pcm32(&mut self, buf: &mut [i32]) -> Result<(), AudioError> {
        tracing::info!("Recording...");
        self.read_pcm32_safe(buf)?;
        std::thread::sleep(self.params.loopback_pause);
        tracing::info!("Processing...");
        fan_out_stereo(buf);
        std::thread::sleep(self.params.loopback_pause);
        tracing::info!("Playing...");
        self.play_pcm32_safe(buf)
    }

    // --- internals -------------------------------------------------------

    /// Loop bounded sub-requests until `buf` is full or one comes back
    /// short, which signals a stall. Returns total bytes transferred.
    fn chunked_read(
        rx: &mut R,
        buf: &mut [u8],
        bytes_per_sample: usize,
        params: TransferParams,
    ) -> Result<usize, AudioError> {
        let chunk_bytes = params.chunk_samples * bytes_per_sample;
        let mut total = 0;
        while total < buf.len() {
            let end = (total + chunk_bytes).min(buf.len());
            let want = end - total;
            let got = rx.read(&mut buf[total..end], params.chunk_timeout)?;
            total += got;
            if got < want {
                break;
            }
        }
        Ok(total)
    }

    fn chunked_write(
        tx: &mut W,
        buf: &[u8],
        bytes_per_sample: usize,
        params: TransferParams,
    ) -> Result<usize, AudioError> {
        let chunk_bytes = params.chunk_samples * bytes_per_sample;
        let mut total = 0;
        while total < buf.len() {
            let end = (total + chunk_bytes).min(buf.len());
            let want = end - total;
            let accepted = tx.write(&buf[total..end], params.chunk_timeout)?;
            total += accepted;
            if accepted < want {
                break;
            }
        }
        Ok(total)
    }

    fn check_whole(expected: usize, actual: usize) -> Result<(), AudioError> {
        if actual != expected {
            tracing::warn!("Transfer short: expected {} samples, got {}", expected, actual);
            return Err(AudioError::ShortTransfer { expected, actual });
        }
        Ok(())
    }

    fn check_safe(requested: usize, transferred: usize) -> Result<(), AudioError> {
        if transferred != requested {
            tracing::warn!(
                "Chunked transfer stalled at {} of {} samples",
                transferred,
                requested
            );
            return Err(AudioError::PartialTransfer {
                requested,
                transferred,
            });
        }
        Ok(())
    }
}
