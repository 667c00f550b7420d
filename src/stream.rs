//! Continuous capture -> convert -> send streaming session
//!
//! A session is one long-lived task that owns the capture channel and a
//! socket for its lifetime: STOPPED -> STARTING (connect + enable) ->
//! RUNNING (loop) -> STOPPED (disable + close). Any failure inside the
//! loop tears the session down directly; the stop flag is polled once
//! per iteration, so cancellation can lag by one read + one send.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::audio::channel::AudioChannel;
use crate::audio::convert::{encode_pcm16_le, encode_pcm32_le, pcm32_to_pcm16};
use crate::audio::engine::SharedEngine;
use crate::config::NetworkConfig;
use crate::error::StreamError;
use crate::net::SocketChannel;

/// Output format a session is started in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFormat {
    /// Wide capture words, sent as-is
    RawPcm32,
    /// Narrowed to PCM16 before sending
    Pcm16,
}

/// Controller for the streaming task. One session at a time; the same
/// control action boots the session and, invoked again, tears it down.
pub struct AudioStreamer<R, W> {
    engine: SharedEngine<R, W>,
    peer: SocketAddr,
    connect_timeout: Duration,
    send_timeout: Duration,
    failure: Arc<Mutex<Option<StreamError>>>,
    session: Option<StreamSession>,
}

struct StreamSession {
    running: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl StreamSession {
    fn stop(mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl<R, W> AudioStreamer<R, W>
where
    R: AudioChannel + 'static,
    W: AudioChannel + 'static,
{
    pub fn new(engine: SharedEngine<R, W>, peer: SocketAddr, network: &NetworkConfig) -> Self {
        Self {
            engine,
            peer,
            connect_timeout: Duration::from_millis(network.connect_timeout_ms),
            send_timeout: Duration::from_millis(network.send_timeout_ms),
            failure: Arc::new(Mutex::new(None)),
            session: None,
        }
    }

    /// Start a session, or request a stop if one is already running.
    pub fn toggle(&mut self, format: StreamFormat) {
        if let Some(session) = self.session.take() {
            if session.running.load(Ordering::Acquire) {
                tracing::info!("Stop requested for running stream session");
                session.stop();
                return;
            }
            // The session already tore itself down on a failure; reap
            // the thread and start fresh.
            session.stop();
        }
        self.start(format);
    }

    /// Unconditionally stop any session.
    pub fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            session.stop();
        }
    }

    pub fn is_running(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.running.load(Ordering::Acquire))
    }

    /// Why the last session died, if it died on its own.
    pub fn take_failure(&self) -> Option<StreamError> {
        self.failure.lock().take()
    }

    fn start(&mut self, format: StreamFormat) {
        let running = Arc::new(AtomicBool::new(true));
        let engine = self.engine.clone();
        let failure = self.failure.clone();
        *failure.lock() = None;
        let socket = SocketChannel::new(self.peer, self.connect_timeout, self.send_timeout);

        let running_for_task = running.clone();
        let spawned = thread::Builder::new()
            .name("stream-task".to_string())
            .spawn(move || {
                run_session(engine, socket, format, running_for_task, failure);
            });
        let join = match spawned {
            Ok(join) => join,
            Err(e) => {
                tracing::error!("Stream task spawn failed: {}", e);
                *self.failure.lock() = Some(StreamError::TaskSpawn(e.to_string()));
                running.store(false, Ordering::Release);
                return;
            }
        };

        tracing::info!("Stream session starting ({:?})", format);
        self.session = Some(StreamSession {
            running,
            join: Some(join),
        });
    }
}

impl<R, W> Drop for AudioStreamer<R, W> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.stop();
        }
    }
}

fn run_session<R, W>(
    engine: SharedEngine<R, W>,
    mut socket: SocketChannel,
    format: StreamFormat,
    running: Arc<AtomicBool>,
    failure: Arc<Mutex<Option<StreamError>>>,
) where
    R: AudioChannel,
    W: AudioChannel,
{
    // STARTING: take exclusive ownership of the engine, connect, enable.
    let Some(mut engine) = engine.try_lock() else {
        tracing::warn!("Audio engine busy, stream session aborted");
        running.store(false, Ordering::Release);
        return;
    };

    if let Err(e) = socket.connect() {
        tracing::error!("Stream session connect failed: {}", e);
        *failure.lock() = Some(StreamError::Socket(e.to_string()));
        running.store(false, Ordering::Release);
        return;
    }

    if let Err(e) = engine.enable_capture() {
        tracing::error!("Capture enable failed: {}", e);
        *failure.lock() = Some(StreamError::Channel(e.to_string()));
        socket.close();
        running.store(false, Ordering::Release);
        return;
    }

    tracing::info!("Stream session running");

    let block = engine.params().chunk_samples;
    let mut wide = vec![0i32; block];
    let mut narrow = vec![0i16; block];

    // RUNNING: one block per iteration, stop flag checked between them.
    while running.load(Ordering::Acquire) {
        let got = match engine.read_block_pcm32(&mut wide) {
            Ok(got) => got,
            Err(e) => {
                tracing::error!("Capture read failed: {}", e);
                *failure.lock() = Some(StreamError::Channel(e.to_string()));
                break;
            }
        };
        if got < wide.len() {
            let err = StreamError::ReadStall {
                requested: wide.len(),
                got,
            };
            tracing::error!("{}", err);
            *failure.lock() = Some(err);
            break;
        }

        let payload: Bytes = match format {
            StreamFormat::RawPcm32 => encode_pcm32_le(&wide),
            StreamFormat::Pcm16 => {
                pcm32_to_pcm16(&wide, &mut narrow);
                encode_pcm16_le(&narrow)
            }
        };

        match socket.send(&payload) {
            Ok(sent) if sent == payload.len() => {}
            Ok(sent) => {
                let err = StreamError::SendIncomplete {
                    offered: payload.len(),
                    accepted: sent,
                };
                tracing::error!("{}", err);
                *failure.lock() = Some(err);
                break;
            }
            Err(e) => {
                tracing::error!("Stream send failed: {}", e);
                *failure.lock() = Some(StreamError::Socket(e.to_string()));
                break;
            }
        }
    }

    // STOPPED: the same cleanup runs whether the loop was told to stop
    // or failed out.
    if let Err(e) = engine.disable_capture() {
        tracing::error!("Capture disable failed: {}", e);
    }
    socket.close();
    running.store(false, Ordering::Release);
    tracing::info!("Stream session stopped");
}
