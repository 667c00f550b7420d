//! Input pin abstraction
//!
//! A pin reports its instantaneous level; the dispatcher reads it twice
//! per press, once in the interrupt path and once after the debounce
//! window.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// An active-low momentary input, read as "pressed or not".
pub trait InputPin: Send + Sync {
    fn is_pressed(&self) -> bool;
}

/// Host-side stand-in for a physical button: a press latches the pin in
/// the pressed state for a short hold window, long enough to survive
/// the debounce re-check. Also used by the dispatcher tests.
pub struct VirtualPin {
    pressed_until: Mutex<Option<Instant>>,
    hold: Duration,
}

impl VirtualPin {
    pub fn new(hold: Duration) -> Self {
        Self {
            pressed_until: Mutex::new(None),
            hold,
        }
    }

    /// Latch the pin pressed for the hold window.
    pub fn press(&self) {
        *self.pressed_until.lock() = Some(Instant::now() + self.hold);
    }

    /// Clear the latch immediately.
    pub fn release(&self) {
        *self.pressed_until.lock() = None;
    }
}

impl InputPin for VirtualPin {
    fn is_pressed(&self) -> bool {
        matches!(*self.pressed_until.lock(), Some(until) if Instant::now() < until)
    }
}
