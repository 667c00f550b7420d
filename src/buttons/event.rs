//! Interrupt-side button event capture
//!
//! The ISR handle is the only code that runs in the interrupt context.
//! It re-reads the pin, stamps the time and does a non-blocking enqueue;
//! it never locks, never allocates and never touches the audio engine.
//! A full queue drops the event rather than blocking.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::Sender;

use crate::buttons::dispatcher::ButtonLine;

/// One confirmed falling edge, stamped at enqueue time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    /// Source identifier of the line that fired (not the table index)
    pub source: u8,
    /// Milliseconds since dispatcher start
    pub pressed_at_ms: u64,
}

/// Cloneable producer handle for the interrupt context.
#[derive(Clone)]
pub struct IsrHandle {
    tx: Sender<ButtonEvent>,
    lines: Arc<Vec<ButtonLine>>,
    epoch: Instant,
    dropped: Arc<AtomicUsize>,
}

impl IsrHandle {
    pub(crate) fn new(
        tx: Sender<ButtonEvent>,
        lines: Arc<Vec<ButtonLine>>,
        epoch: Instant,
        dropped: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            tx,
            lines,
            epoch,
            dropped,
        }
    }

    /// Handle a falling-edge transition on `source`.
    ///
    /// Confirms the line still reads pressed, then enqueues. Unknown
    /// sources and released lines are ignored; a full queue drops the
    /// event silently (counted).
    pub fn on_falling_edge(&self, source: u8) {
        let Some(line) = self.lines.iter().find(|l| l.source == source) else {
            return;
        };
        if !line.pin.is_pressed() {
            return;
        }
        let event = ButtonEvent {
            source,
            pressed_at_ms: self.epoch.elapsed().as_millis() as u64,
        };
        if self.tx.try_send(event).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Events dropped on queue overflow since start.
    pub fn dropped_count(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}
