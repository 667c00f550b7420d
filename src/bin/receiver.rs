//! Stream receiver
//!
//! Accepts one connection at a time, drains the incoming stream up to a
//! fixed cap, and reports what arrived. A 44-byte WAV header at the
//! front is decoded and sanity-checked; raw streams are just counted.

use std::io::Read;
use std::net::{TcpListener, TcpStream};

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use button_audio_streamer::config::AppConfig;
use button_audio_streamer::constants::MAX_STREAM_BYTES;
use button_audio_streamer::wav::{WavHeader, HEADER_SIZE};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;
    let bind = format!("0.0.0.0:{}", config.network.port);
    let listener = TcpListener::bind(&bind).with_context(|| format!("cannot bind {}", bind))?;
    tracing::info!("Listening on {}", bind);

    loop {
        let (conn, peer) = listener.accept().context("accept failed")?;
        tracing::info!("Connection from {}", peer);
        match drain_stream(conn) {
            Ok(received) => report(&received),
            Err(e) => tracing::error!("Receive failed: {}", e),
        }
    }
}

/// Read until the sender closes or the cap is hit.
fn drain_stream(mut conn: TcpStream) -> Result<Vec<u8>> {
    let mut received = Vec::new();
    let mut buf = [0u8; 4096];
    while received.len() < MAX_STREAM_BYTES {
        let room = MAX_STREAM_BYTES - received.len();
        let want = room.min(buf.len());
        let n = conn.read(&mut buf[..want])?;
        if n == 0 {
            break;
        }
        received.extend_from_slice(&buf[..n]);
    }
    if received.len() >= MAX_STREAM_BYTES {
        tracing::warn!("Stream cap of {} bytes reached, closing", MAX_STREAM_BYTES);
    }
    Ok(received)
}

fn report(received: &[u8]) {
    tracing::info!("Received {} bytes", received.len());
    if received.len() < HEADER_SIZE {
        return;
    }
    match WavHeader::parse(received) {
        Ok(header) => {
            let payload = received.len() - HEADER_SIZE;
            tracing::info!(
                "WAV: {} ch, {} Hz, {} bit, {} data bytes declared, {} present",
                header.channels,
                header.sample_rate,
                header.bits_per_sample,
                header.data_size,
                payload
            );
            if payload as u32 != header.data_size {
                tracing::warn!(
                    "Payload does not match header: declared {}, got {}",
                    header.data_size,
                    payload
                );
            }
        }
        Err(e) => {
            tracing::info!("Not a WAV stream ({}), treating as raw PCM", e);
        }
    }
}
