//! Button-to-action wiring
//!
//! Binds the three control-surface buttons to their pipelines: a
//! record/play self-test, a record-and-publish WAV transfer, and the
//! streaming session toggle. Actions run on the dispatcher task, so
//! anything long-lived (the stream) is started there, never awaited.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::audio::channel::AudioChannel;
use crate::audio::convert::pcm32_to_pcm16;
use crate::audio::engine::SharedEngine;
use crate::buttons::dispatcher::ButtonDispatcher;
use crate::config::AppConfig;
use crate::error::{AudioError, Result};
use crate::net::SocketChannel;
use crate::stream::{AudioStreamer, StreamFormat};
use crate::wav;

/// Record then play back through the speaker
pub const BUTTON_RECORD_PLAY: usize = 0;
/// Record, frame as WAV, publish to the peer
pub const BUTTON_SEND_WAV: usize = 1;
/// Start/stop the live stream
pub const BUTTON_STREAM_TOGGLE: usize = 2;

/// Bind all three button actions.
pub fn wire_buttons<R, W>(
    dispatcher: &mut ButtonDispatcher,
    engine: SharedEngine<R, W>,
    streamer: Arc<Mutex<AudioStreamer<R, W>>>,
    config: &AppConfig,
) -> Result<()>
where
    R: AudioChannel + 'static,
    W: AudioChannel + 'static,
{
    let samples = config.audio.default_samples;
    let peer = config.network.peer_addr()?;
    let connect_timeout = Duration::from_millis(config.network.connect_timeout_ms);
    let send_timeout = Duration::from_millis(config.network.send_timeout_ms);

    let engine_for_test = engine.clone();
    dispatcher.set_action(
        BUTTON_RECORD_PLAY,
        Box::new(move |source| {
            tracing::info!(">>> Button (source {}): record/play self-test", source);
            let Some(mut engine) = engine_for_test.try_lock() else {
                tracing::warn!("{}", AudioError::Busy);
                return;
            };
            let mut buf = vec![0i32; samples];
            if let Err(e) = engine.loopback_test_pcm32(&mut buf) {
                tracing::error!("Self-test failed: {}", e);
            }
        }),
    )?;

    let engine_for_send = engine;
    dispatcher.set_action(
        BUTTON_SEND_WAV,
        Box::new(move |source| {
            tracing::info!(">>> Button (source {}): record and publish WAV", source);
            let mut wide = vec![0i32; samples];
            {
                let Some(mut engine) = engine_for_send.try_lock() else {
                    tracing::warn!("{}", AudioError::Busy);
                    return;
                };
                if let Err(e) = engine.read_pcm32_safe(&mut wide) {
                    tracing::error!("Recording failed: {}", e);
                    return;
                }
                // Engine released before the network transfer so a
                // stream toggle is not blocked on the socket.
            }
            let mut narrow = vec![0i16; samples];
            pcm32_to_pcm16(&wide, &mut narrow);
            let framed = wav::frame_pcm16(&narrow);
            let mut socket = SocketChannel::new(peer, connect_timeout, send_timeout);
            match socket.publish(&framed) {
                Ok(()) => tracing::info!("Published {} bytes to {}", framed.len(), peer),
                Err(e) => tracing::error!("Publish failed: {}", e),
            }
        }),
    )?;

    dispatcher.set_action(
        BUTTON_STREAM_TOGGLE,
        Box::new(move |source| {
            tracing::info!(">>> Button (source {}): stream toggle", source);
            streamer.lock().toggle(StreamFormat::Pcm16);
        }),
    )?;

    Ok(())
}
