//! Fan-out of trigger events.
//!
//! Backends call into the hub from their own threads. The hub only touches
//! the stats lock and the listener list, never the binding map, so a press
//! cannot stall behind a registry operation.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};

use keyward_core::TriggerEvent;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error};

use crate::stats::RegistryStats;

/// Callback registered with [`ShortcutRegistry::on_trigger`](crate::ShortcutRegistry::on_trigger).
pub type Listener = Arc<dyn Fn(&TriggerEvent) + Send + Sync>;

/// Handle for removing a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub(crate) struct TriggerHub {
    stats: Mutex<RegistryStats>,
    listeners: RwLock<Vec<(ListenerId, Listener)>>,
    subscribers: Mutex<Vec<Sender<TriggerEvent>>>,
    next_id: AtomicU64,
}

impl TriggerHub {
    pub(crate) fn add_listener(&self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, listener));
        id
    }

    pub(crate) fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub(crate) fn subscribe(&self) -> Receiver<TriggerEvent> {
        let (sender, receiver) = mpsc::channel();
        self.subscribers.lock().push(sender);
        receiver
    }

    pub(crate) fn record_claim(&self) {
        self.stats.lock().record_claim();
    }

    pub(crate) fn stats(&self) -> RegistryStats {
        self.stats.lock().clone()
    }

    pub(crate) fn reset_stats(&self) {
        *self.stats.lock() = RegistryStats::default();
    }

    /// Count the event, then hand it to every listener and subscriber.
    pub(crate) fn publish(&self, event: TriggerEvent) {
        self.stats.lock().record_trigger(&event);

        debug!(id = %event.id, action = %event.action, "shortcut-triggered");

        // Snapshot so listeners may add or remove listeners themselves.
        let listeners = self.listeners.read().clone();
        for (listener_id, listener) in listeners {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener(&event)));
            if outcome.is_err() {
                error!(
                    listener = listener_id.0,
                    id = %event.id,
                    "trigger listener panicked"
                );
            }
        }

        self.subscribers
            .lock()
            .retain(|sender| sender.send(event.clone()).is_ok());
    }
}
