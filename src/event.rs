//! Application events for the tao event loop.

use keyward_core::TriggerEvent;

/// Events for the tao event loop.
#[derive(Debug, Clone)]
pub enum KeywardEvent {
    /// A claimed shortcut was pressed
    Triggered(TriggerEvent),
    /// The process was asked to terminate
    Shutdown,
}
