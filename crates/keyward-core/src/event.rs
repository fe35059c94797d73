//! Events published when a claimed shortcut fires.
//!
//! These are plain values so they can cross threads and be handed to any
//! number of listeners without depending on a UI framework.

use std::time::SystemTime;

use crate::Accelerator;

/// A `shortcut-triggered` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerEvent {
    pub id: String,
    pub action: String,
    pub accelerator: Accelerator,
    /// When the backend reported the press
    pub timestamp: SystemTime,
}

impl TriggerEvent {
    /// Creates an event stamped with the current time.
    pub fn now(id: impl Into<String>, action: impl Into<String>, accelerator: Accelerator) -> Self {
        Self {
            id: id.into(),
            action: action.into(),
            accelerator,
            timestamp: SystemTime::now(),
        }
    }
}
