//! Software debounce state
//!
//! One last-accepted timestamp per button. The gate compares the
//! event's enqueue timestamp against the last accepted press; the
//! comparison is strict, so two presses exactly one window apart still
//! count as one.

/// Per-button debounce bookkeeping, owned by the dispatcher task.
#[derive(Debug)]
pub struct DebounceGate {
    last_accepted_ms: Vec<u64>,
    window_ms: u64,
}

impl DebounceGate {
    pub fn new(buttons: usize, window_ms: u64) -> Self {
        Self {
            last_accepted_ms: vec![0; buttons],
            window_ms,
        }
    }

    /// Whether an event enqueued at `pressed_at_ms` may fire.
    ///
    /// Saturating: an event stamped before the last confirmation (the
    /// dispatcher lagged) is treated as zero elapsed and rejected.
    pub fn permits(&self, index: usize, pressed_at_ms: u64) -> bool {
        pressed_at_ms.saturating_sub(self.last_accepted_ms[index]) > self.window_ms
    }

    /// Record a fired press, stamped at confirmation time.
    pub fn accept(&mut self, index: usize, confirmed_at_ms: u64) {
        self.last_accepted_ms[index] = confirmed_at_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presses_within_window_are_rejected() {
        let mut gate = DebounceGate::new(3, 50);
        assert!(gate.permits(0, 100));
        gate.accept(0, 100);
        // 49 ms later: rejected
        assert!(!gate.permits(0, 149));
        // Exactly at the window boundary: still rejected (strict)
        assert!(!gate.permits(0, 150));
        // 51 ms later: accepted
        assert!(gate.permits(0, 151));
    }

    #[test]
    fn buttons_are_independent() {
        let mut gate = DebounceGate::new(3, 50);
        gate.accept(0, 100);
        assert!(!gate.permits(0, 120));
        assert!(gate.permits(1, 120));
    }

    #[test]
    fn late_dispatch_does_not_underflow() {
        let mut gate = DebounceGate::new(1, 50);
        // Confirmation happened after the next event was enqueued.
        gate.accept(0, 200);
        assert!(!gate.permits(0, 180));
    }
}
