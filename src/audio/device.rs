//! cpal-backed audio channel
//!
//! Adapts a callback-driven cpal stream to the pull-style
//! [`AudioChannel`] interface. Each enabled channel runs a dedicated
//! thread that owns the cpal stream (streams are not `Send`); the
//! callbacks exchange bytes with `read`/`write` through a small
//! lock-free ring whose capacity plays the role of the hardware FIFO.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};
use crossbeam::queue::ArrayQueue;
use crossbeam_channel::bounded;

use crate::audio::channel::AudioChannel;
use crate::error::AudioError;

/// Width of one sample word on the wire side of the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleWidth {
    /// Narrow 16-bit linear PCM
    Pcm16,
    /// Wide 32-bit capture word, 24 significant bits left-justified
    Pcm32,
}

impl SampleWidth {
    pub fn bytes(self) -> usize {
        match self {
            SampleWidth::Pcm16 => 2,
            SampleWidth::Pcm32 => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Capture,
    Playback,
}

/// Ring capacity in bytes: four hardware chunks of wide words. Much
/// smaller than a whole transfer, so sustained reads must be chunked.
const RING_BYTES: usize = 4 * 1024 * 4;

/// One direction of the host audio device, exposed as a byte channel.
pub struct CpalChannel {
    direction: Direction,
    width: SampleWidth,
    sample_rate: u32,
    ring: Arc<ArrayQueue<u8>>,
    running: Arc<AtomicBool>,
    overflow: Arc<AtomicUsize>,
    thread: Option<JoinHandle<()>>,
}

impl CpalChannel {
    pub fn capture(width: SampleWidth, sample_rate: u32) -> Self {
        Self::new(Direction::Capture, width, sample_rate)
    }

    pub fn playback(width: SampleWidth, sample_rate: u32) -> Self {
        Self::new(Direction::Playback, width, sample_rate)
    }

    fn new(direction: Direction, width: SampleWidth, sample_rate: u32) -> Self {
        Self {
            direction,
            width,
            sample_rate,
            ring: Arc::new(ArrayQueue::new(RING_BYTES)),
            running: Arc::new(AtomicBool::new(false)),
            overflow: Arc::new(AtomicUsize::new(0)),
            thread: None,
        }
    }

    /// Samples dropped because the ring was full while the channel was
    /// enabled but nobody was reading.
    pub fn overflow_count(&self) -> usize {
        self.overflow.load(Ordering::Relaxed)
    }

    fn spawn_stream_thread(&mut self) -> Result<(), AudioError> {
        let direction = self.direction;
        let width = self.width;
        let ring = self.ring.clone();
        let running = self.running.clone();
        let running_for_loop = self.running.clone();
        let overflow = self.overflow.clone();
        let config = StreamConfig {
            channels: 1,
            sample_rate: SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let (ready_tx, ready_rx) = bounded::<Result<(), AudioError>>(1);

        let name = match direction {
            Direction::Capture => "audio-capture",
            Direction::Playback => "audio-playback",
        };
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let host = cpal::default_host();
                let device = match direction {
                    Direction::Capture => host.default_input_device(),
                    Direction::Playback => host.default_output_device(),
                };
                let Some(device) = device else {
                    let _ = ready_tx.send(Err(AudioError::DeviceNotFound(
                        "no default audio device".to_string(),
                    )));
                    return;
                };

                let err_fn = |err: cpal::StreamError| {
                    tracing::error!("Audio stream error: {}", err);
                };

                let stream = match direction {
                    Direction::Capture => device.build_input_stream(
                        &config,
                        move |data: &[f32], _: &cpal::InputCallbackInfo| {
                            if !running.load(Ordering::Relaxed) {
                                return;
                            }
                            for &sample in data {
                                let (word, len) = encode_sample(sample, width);
                                let mut dropped = false;
                                for &byte in &word[..len] {
                                    if ring.push(byte).is_err() {
                                        dropped = true;
                                    }
                                }
                                if dropped {
                                    overflow.fetch_add(1, Ordering::Relaxed);
                                }
                            }
                        },
                        err_fn,
                        None,
                    ),
                    Direction::Playback => device.build_output_stream(
                        &config,
                        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                            for slot in data.iter_mut() {
                                // Underruns play silence.
                                *slot = pop_sample(&ring, width).unwrap_or(0.0);
                            }
                        },
                        err_fn,
                        None,
                    ),
                };

                match stream {
                    Ok(stream) => {
                        if let Err(e) = stream.play() {
                            let _ = ready_tx
                                .send(Err(AudioError::ChannelUnavailable(e.to_string())));
                            return;
                        }
                        let _ = ready_tx.send(Ok(()));
                        while running_for_loop.load(Ordering::Relaxed) {
                            thread::sleep(Duration::from_millis(10));
                        }
                        // Stream is dropped here, stopping the device.
                    }
                    Err(e) => {
                        let _ =
                            ready_tx.send(Err(AudioError::ChannelUnavailable(e.to_string())));
                    }
                }
            })
            .map_err(|e| AudioError::ChannelUnavailable(e.to_string()))?;

        self.thread = Some(handle);

        match ready_rx.recv_timeout(Duration::from_secs(2)) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                self.running.store(false, Ordering::SeqCst);
                Err(e)
            }
            Err(_) => {
                self.running.store(false, Ordering::SeqCst);
                Err(AudioError::ChannelUnavailable(
                    "stream thread did not come up".to_string(),
                ))
            }
        }
    }

    fn drain_ring(&self) {
        while self.ring.pop().is_some() {}
    }
}

impl AudioChannel for CpalChannel {
    fn enable(&mut self) -> Result<(), AudioError> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }
        // Stale samples from a previous enablement would skew the next
        // transfer's timing.
        self.drain_ring();
        self.running.store(true, Ordering::SeqCst);
        self.spawn_stream_thread()
    }

    fn disable(&mut self) -> Result<(), AudioError> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, AudioError> {
        if self.direction != Direction::Capture {
            return Err(AudioError::ChannelUnavailable(
                "not a capture channel".to_string(),
            ));
        }
        // Whole words only.
        let want = buf.len() - buf.len() % self.width.bytes();
        let deadline = Instant::now() + timeout;
        let mut got = 0;
        while got < want {
            match self.ring.pop() {
                Some(byte) => {
                    buf[got] = byte;
                    got += 1;
                }
                None => {
                    if Instant::now() >= deadline {
                        break;
                    }
                    thread::sleep(Duration::from_millis(1));
                }
            }
        }
        Ok(got)
    }

    fn write(&mut self, buf: &[u8], timeout: Duration) -> Result<usize, AudioError> {
        if self.direction != Direction::Playback {
            return Err(AudioError::ChannelUnavailable(
                "not a playback channel".to_string(),
            ));
        }
        let deadline = Instant::now() + timeout;
        let mut accepted = 0;
        while accepted < buf.len() {
            if self.ring.push(buf[accepted]).is_ok() {
                accepted += 1;
            } else if Instant::now() >= deadline {
                break;
            } else {
                thread::sleep(Duration::from_millis(1));
            }
        }
        Ok(accepted)
    }
}

impl Drop for CpalChannel {
    fn drop(&mut self) {
        let _ = self.disable();
    }
}

/// Encode one f32 callback sample as a little-endian channel word.
fn encode_sample(sample: f32, width: SampleWidth) -> ([u8; 4], usize) {
    let clamped = sample.clamp(-1.0, 1.0);
    match width {
        SampleWidth::Pcm16 => {
            let v = (clamped * i16::MAX as f32) as i16;
            let le = v.to_le_bytes();
            ([le[0], le[1], 0, 0], 2)
        }
        SampleWidth::Pcm32 => {
            // 24 significant bits, left-justified like an I2S MSB slot.
            let v = ((clamped * 8_388_607.0) as i32) << 8;
            (v.to_le_bytes(), 4)
        }
    }
}

/// Pop one channel word from the ring and decode it to f32, or None if
/// a whole word is not available.
fn pop_sample(ring: &ArrayQueue<u8>, width: SampleWidth) -> Option<f32> {
    let bytes = width.bytes();
    if ring.len() < bytes {
        return None;
    }
    let mut word = [0u8; 4];
    for slot in word.iter_mut().take(bytes) {
        *slot = ring.pop()?;
    }
    Some(match width {
        SampleWidth::Pcm16 => i16::from_le_bytes([word[0], word[1]]) as f32 / 32768.0,
        SampleWidth::Pcm32 => (i32::from_le_bytes(word) >> 8) as f32 / 8_388_608.0,
    })
}
