//! Button event capture, debounce and dispatch

pub mod debounce;
pub mod dispatcher;
pub mod event;
pub mod pin;

pub use debounce::DebounceGate;
pub use dispatcher::{ButtonDispatcher, ButtonLine, DispatcherHandle};
pub use event::{ButtonEvent, IsrHandle};
pub use pin::{InputPin, VirtualPin};
