//! Button event dispatch task
//!
//! A single consumer drains the bounded event queue, applies the
//! debounce gate against the enqueue timestamp, re-reads the pin to
//! confirm the press survived the window, and only then runs the bound
//! action synchronously. A long-running action therefore delays later
//! button events; actions that need to keep running (the streaming
//! session) are started here, not awaited.

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::buttons::debounce::DebounceGate;
use crate::buttons::event::{ButtonEvent, IsrHandle};
use crate::buttons::pin::InputPin;
use crate::config::ButtonConfig;
use crate::error::ButtonError;

/// One monitored button: a source identifier plus its pin.
pub struct ButtonLine {
    pub source: u8,
    pub pin: Arc<dyn InputPin>,
}

/// A no-argument action bound to one button; receives the source id.
pub type ButtonAction = Box<dyn FnMut(u8) + Send>;

/// Dispatcher under construction: bind actions, then [`start`] it.
///
/// [`start`]: ButtonDispatcher::start
pub struct ButtonDispatcher {
    lines: Arc<Vec<ButtonLine>>,
    actions: Vec<ButtonAction>,
    tx: Sender<ButtonEvent>,
    rx: Receiver<ButtonEvent>,
    epoch: Instant,
    dropped: Arc<AtomicUsize>,
    gate: DebounceGate,
}

impl ButtonDispatcher {
    pub fn new(lines: Vec<ButtonLine>, config: &ButtonConfig) -> Self {
        let (tx, rx) = bounded(config.queue_depth);
        let actions = (0..lines.len())
            .map(|index| {
                Box::new(move |source: u8| {
                    tracing::warn!(
                        ">>> Button {} (source {}) pressed - no action bound",
                        index,
                        source
                    );
                }) as ButtonAction
            })
            .collect();
        Self {
            gate: DebounceGate::new(lines.len(), config.debounce_ms),
            lines: Arc::new(lines),
            actions,
            tx,
            rx,
            epoch: Instant::now(),
            dropped: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Bind `action` to the button at `index`.
    pub fn set_action(&mut self, index: usize, action: ButtonAction) -> Result<(), ButtonError> {
        let slot = self
            .actions
            .get_mut(index)
            .ok_or(ButtonError::InvalidIndex(index))?;
        *slot = action;
        Ok(())
    }

    /// Producer handle for the interrupt context.
    pub fn isr_handle(&self) -> IsrHandle {
        IsrHandle::new(
            self.tx.clone(),
            self.lines.clone(),
            self.epoch,
            self.dropped.clone(),
        )
    }

    /// Spawn the dispatch task and hand back its controller.
    pub fn start(mut self) -> Result<DispatcherHandle, ButtonError> {
        let isr = self.isr_handle();
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let join = thread::Builder::new()
            .name("button-task".to_string())
            .spawn(move || {
                tracing::info!("Button processing task started");
                loop {
                    crossbeam_channel::select! {
                        recv(self.rx) -> msg => match msg {
                            Ok(event) => self.dispatch(event),
                            Err(_) => break,
                        },
                        recv(shutdown_rx) -> _ => break,
                    }
                }
                tracing::info!("Button processing task stopped");
            })
            .map_err(|e| ButtonError::TaskSpawn(e.to_string()))?;

        Ok(DispatcherHandle {
            shutdown_tx,
            join: Some(join),
            isr,
        })
    }

    fn dispatch(&mut self, event: ButtonEvent) {
        let now_ms = self.epoch.elapsed().as_millis() as u64;
        self.dispatch_at(event, now_ms);
    }

    /// Dispatch with an explicit "now", so the debounce path is
    /// deterministic under test.
    fn dispatch_at(&mut self, event: ButtonEvent, now_ms: u64) {
        let Some(index) = self.lines.iter().position(|l| l.source == event.source) else {
            tracing::debug!("Discarding event from unknown source {}", event.source);
            return;
        };
        if !self.gate.permits(index, event.pressed_at_ms) {
            tracing::trace!("Button {} debounced", index);
            return;
        }
        // The press must still be live after the window; a real edge
        // whose cause already cleared is rejected here.
        if !self.lines[index].pin.is_pressed() {
            tracing::trace!("Button {} released before confirmation", index);
            return;
        }
        self.gate.accept(index, now_ms);
        tracing::debug!("Button {} (source {}) fired", index, event.source);
        (self.actions[index])(event.source);
    }
}

/// Controller for a running dispatch task. Dropping it stops the task.
pub struct DispatcherHandle {
    shutdown_tx: Sender<()>,
    join: Option<JoinHandle<()>>,
    isr: IsrHandle,
}

impl DispatcherHandle {
    pub fn isr_handle(&self) -> IsrHandle {
        self.isr.clone()
    }
}

impl Drop for DispatcherHandle {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.try_send(());
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buttons::pin::VirtualPin;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn lines_with_pins(sources: &[u8], hold: Duration) -> (Vec<ButtonLine>, Vec<Arc<VirtualPin>>) {
        let pins: Vec<Arc<VirtualPin>> =
            sources.iter().map(|_| Arc::new(VirtualPin::new(hold))).collect();
        let lines = sources
            .iter()
            .zip(&pins)
            .map(|(&source, pin)| ButtonLine {
                source,
                pin: pin.clone() as Arc<dyn InputPin>,
            })
            .collect();
        (lines, pins)
    }

    fn counting_action(counter: Arc<AtomicUsize>) -> ButtonAction {
        Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn set_action_rejects_out_of_range_index() {
        let (lines, _pins) = lines_with_pins(&[0, 38, 39], Duration::from_secs(1));
        let mut dispatcher = ButtonDispatcher::new(lines, &ButtonConfig::default());
        assert!(matches!(
            dispatcher.set_action(3, Box::new(|_| {})),
            Err(ButtonError::InvalidIndex(3))
        ));
        assert!(dispatcher.set_action(2, Box::new(|_| {})).is_ok());
    }

    #[test]
    fn presses_49ms_apart_fire_once_51ms_apart_fire_twice() {
        let (lines, pins) = lines_with_pins(&[0], Duration::from_secs(10));
        let mut dispatcher = ButtonDispatcher::new(lines, &ButtonConfig::default());
        let fired = Arc::new(AtomicUsize::new(0));
        dispatcher.set_action(0, counting_action(fired.clone())).unwrap();
        pins[0].press();

        let event = |ms| ButtonEvent {
            source: 0,
            pressed_at_ms: ms,
        };

        dispatcher.dispatch_at(event(100), 100);
        dispatcher.dispatch_at(event(149), 149);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        dispatcher.dispatch_at(event(151), 151);
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn release_before_confirmation_rejects_event() {
        let (lines, pins) = lines_with_pins(&[0], Duration::from_secs(10));
        let mut dispatcher = ButtonDispatcher::new(lines, &ButtonConfig::default());
        let fired = Arc::new(AtomicUsize::new(0));
        dispatcher.set_action(0, counting_action(fired.clone())).unwrap();

        // The edge was real but the contact cleared before dispatch.
        pins[0].release();
        dispatcher.dispatch_at(
            ButtonEvent {
                source: 0,
                pressed_at_ms: 100,
            },
            100,
        );
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        // A rejected event leaves the debounce state untouched, so the
        // next live press fires immediately.
        pins[0].press();
        dispatcher.dispatch_at(
            ButtonEvent {
                source: 0,
                pressed_at_ms: 110,
            },
            110,
        );
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unknown_source_is_discarded() {
        let (lines, pins) = lines_with_pins(&[0, 38], Duration::from_secs(10));
        let mut dispatcher = ButtonDispatcher::new(lines, &ButtonConfig::default());
        let fired = Arc::new(AtomicUsize::new(0));
        dispatcher.set_action(0, counting_action(fired.clone())).unwrap();
        dispatcher.set_action(1, counting_action(fired.clone())).unwrap();
        pins[0].press();
        pins[1].press();

        dispatcher.dispatch_at(
            ButtonEvent {
                source: 99,
                pressed_at_ms: 100,
            },
            100,
        );
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn queue_overflow_drops_events_without_blocking() {
        let (lines, pins) = lines_with_pins(&[0], Duration::from_secs(10));
        let config = ButtonConfig {
            queue_depth: 2,
            ..ButtonConfig::default()
        };
        let dispatcher = ButtonDispatcher::new(lines, &config);
        let isr = dispatcher.isr_handle();
        pins[0].press();

        for _ in 0..5 {
            isr.on_falling_edge(0);
        }
        assert_eq!(isr.dropped_count(), 3);
    }

    #[test]
    fn isr_ignores_released_pin() {
        let (lines, _pins) = lines_with_pins(&[0], Duration::from_secs(10));
        let dispatcher = ButtonDispatcher::new(lines, &ButtonConfig::default());
        let isr = dispatcher.isr_handle();

        // Pin never pressed: the edge was noise, nothing is queued.
        isr.on_falling_edge(0);
        assert_eq!(isr.dropped_count(), 0);
        assert!(dispatcher.rx.is_empty());
    }

    #[test]
    fn full_pipeline_fires_bound_action() {
        let (lines, pins) = lines_with_pins(&[0, 38, 39], Duration::from_millis(500));
        let mut dispatcher = ButtonDispatcher::new(lines, &ButtonConfig::default());
        let fired = Arc::new(AtomicUsize::new(0));
        dispatcher.set_action(1, counting_action(fired.clone())).unwrap();

        let handle = dispatcher.start().unwrap();
        let isr = handle.isr_handle();

        // Get past the boot-time debounce floor before pressing.
        std::thread::sleep(Duration::from_millis(60));
        pins[1].press();
        isr.on_falling_edge(38);

        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        drop(handle);
    }
}
