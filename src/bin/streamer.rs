//! Button Audio Streamer
//!
//! Interactive control surface over the default audio device: three
//! virtual buttons trigger a record/play self-test, a one-shot WAV
//! publish, and the live stream toggle.

use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use button_audio_streamer::{
    app,
    audio::{AudioChannel, CpalChannel, SampleWidth, TransferEngine, TransferParams},
    buttons::{ButtonDispatcher, ButtonLine, InputPin, VirtualPin},
    config::AppConfig,
    stream::AudioStreamer,
};

/// Hardware-style source ids carried by the button events.
const BUTTON_SOURCES: [u8; 3] = [0, 38, 39];

/// How long a keyboard "press" latches the virtual pin. Long enough to
/// survive the debounce re-check.
const PIN_HOLD: Duration = Duration::from_millis(200);

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Button Audio Streamer");

    let config = AppConfig::load()?;
    let peer = config.network.peer_addr()?;
    tracing::info!("Stream peer: {}", peer);

    // Both directions carry wide words; narrowing happens in software.
    let mut capture = CpalChannel::capture(SampleWidth::Pcm32, config.audio.sample_rate);
    let playback = CpalChannel::playback(SampleWidth::Pcm32, config.audio.sample_rate);

    // A device that cannot come up now will not come up later either.
    capture
        .enable()
        .context("audio capture unavailable")?;
    capture
        .disable()
        .context("audio capture unavailable")?;
    tracing::info!("Audio device ready ({} Hz)", config.audio.sample_rate);

    let engine = TransferEngine::with_params(
        capture,
        playback,
        TransferParams::from(&config.audio),
    )
    .into_shared();
    let streamer = Arc::new(Mutex::new(AudioStreamer::new(
        engine.clone(),
        peer,
        &config.network,
    )));

    let pins: Vec<Arc<VirtualPin>> = BUTTON_SOURCES
        .iter()
        .map(|_| Arc::new(VirtualPin::new(PIN_HOLD)))
        .collect();
    let lines = BUTTON_SOURCES
        .iter()
        .zip(&pins)
        .map(|(&source, pin)| ButtonLine {
            source,
            pin: pin.clone() as Arc<dyn InputPin>,
        })
        .collect();

    let mut dispatcher = ButtonDispatcher::new(lines, &config.buttons);
    app::wire_buttons(&mut dispatcher, engine, streamer.clone(), &config)?;
    let handle = dispatcher.start()?;
    let isr = handle.isr_handle();

    println!();
    println!("  1  record then play back (self-test)");
    println!("  2  record, frame as WAV, send to {}", peer);
    println!("  3  start/stop live stream");
    println!("  q  quit");
    println!();

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let index = match line.trim() {
            "1" => 0,
            "2" => 1,
            "3" => 2,
            "q" | "quit" => break,
            "" => continue,
            other => {
                println!("Unknown command: {}", other);
                continue;
            }
        };
        // A keypress is a falling edge on the matching pin.
        pins[index].press();
        isr.on_falling_edge(BUTTON_SOURCES[index]);

        if let Some(failure) = streamer.lock().take_failure() {
            tracing::warn!("Last stream session ended with: {}", failure);
        }
    }

    tracing::info!("Shutting down");
    streamer.lock().stop();
    drop(handle);
    Ok(())
}
