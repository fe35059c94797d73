//! In-memory backend.
//!
//! Behaves like an OS hotkey service that is fully under the caller's
//! control: combinations can be reserved as if another process held them,
//! claims can be made to fail, and presses are simulated with
//! [`MemoryBackend::trigger`]. The handle is cheap to clone and every clone
//! shares the same state, so a test can keep one while the registry owns
//! another.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use keyward_core::Accelerator;
use parking_lot::Mutex;
use tracing::debug;

use crate::{BackendError, HotkeyBackend, Result, TriggerFn};

#[derive(Default)]
struct MemoryState {
    claimed: HashMap<Accelerator, TriggerFn>,
    /// Held by "another process"
    reserved: HashSet<Accelerator>,
    /// Become reserved the moment we release them
    hijack_on_release: HashSet<Accelerator>,
    reject_all: bool,
    failing: bool,
    claim_attempts: Vec<Accelerator>,
}

impl MemoryState {
    fn release(&mut self, accelerator: &Accelerator) {
        if self.claimed.remove(accelerator).is_some()
            && self.hijack_on_release.remove(accelerator)
        {
            self.reserved.insert(accelerator.clone());
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    /// A backend that accepts every claim not otherwise reserved.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `accelerator` as held by some other process.
    pub fn reserve(&self, accelerator: &Accelerator) {
        self.state.lock().reserved.insert(accelerator.clone());
    }

    /// Undo [`reserve`](Self::reserve).
    pub fn unreserve(&self, accelerator: &Accelerator) {
        self.state.lock().reserved.remove(accelerator);
    }

    /// Once we release `accelerator`, another process grabs it.
    pub fn hijack_on_release(&self, accelerator: &Accelerator) {
        self.state
            .lock()
            .hijack_on_release
            .insert(accelerator.clone());
    }

    /// Refuse every claim while set.
    pub fn set_reject_all(&self, reject: bool) {
        self.state.lock().reject_all = reject;
    }

    /// Make every backend call return an adapter error while set.
    pub fn set_failing(&self, failing: bool) {
        self.state.lock().failing = failing;
    }

    /// Accelerators currently claimed, sorted by their string form.
    pub fn claimed(&self) -> Vec<Accelerator> {
        let mut claimed: Vec<_> = self.state.lock().claimed.keys().cloned().collect();
        claimed.sort_by_key(|a| a.to_string());
        claimed
    }

    pub fn is_claimed(&self, accelerator: &Accelerator) -> bool {
        self.state.lock().claimed.contains_key(accelerator)
    }

    /// Every accelerator passed to `try_claim`, in call order.
    pub fn claim_attempts(&self) -> Vec<Accelerator> {
        self.state.lock().claim_attempts.clone()
    }

    /// Simulate the user pressing `accelerator`. Returns false when nothing
    /// is claimed for it.
    pub fn trigger(&self, accelerator: &Accelerator) -> bool {
        // Clone the callback out so it runs without our lock held.
        let callback = self.state.lock().claimed.get(accelerator).cloned();
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }
}

impl HotkeyBackend for MemoryBackend {
    fn try_claim(&mut self, accelerator: &Accelerator, on_trigger: TriggerFn) -> Result<bool> {
        let mut state = self.state.lock();
        state.claim_attempts.push(accelerator.clone());

        if state.failing {
            return Err(BackendError::Platform("simulated backend failure".into()));
        }
        if state.reject_all
            || state.reserved.contains(accelerator)
            || state.claimed.contains_key(accelerator)
        {
            debug!(%accelerator, "memory backend refused claim");
            return Ok(false);
        }

        state.claimed.insert(accelerator.clone(), on_trigger);
        Ok(true)
    }

    fn release(&mut self, accelerator: &Accelerator) -> Result<()> {
        let mut state = self.state.lock();
        if state.failing {
            return Err(BackendError::Platform("simulated backend failure".into()));
        }
        state.release(accelerator);
        Ok(())
    }

    fn release_all(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        if state.failing {
            return Err(BackendError::Platform("simulated backend failure".into()));
        }
        let claimed: Vec<_> = state.claimed.keys().cloned().collect();
        for accelerator in &claimed {
            state.release(accelerator);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn accel(s: &str) -> Accelerator {
        s.parse().unwrap()
    }

    fn noop() -> TriggerFn {
        Arc::new(|| {})
    }

    #[test]
    fn test_claim_and_release() {
        let mut backend = MemoryBackend::new();
        assert!(backend.try_claim(&accel("Mod+A"), noop()).unwrap());
        assert!(backend.is_claimed(&accel("Mod+A")));

        // A second claim of the same combination is refused.
        assert!(!backend.try_claim(&accel("Mod+A"), noop()).unwrap());

        backend.release(&accel("Mod+A")).unwrap();
        assert!(backend.claimed().is_empty());

        // Releasing again is fine.
        backend.release(&accel("Mod+A")).unwrap();
    }

    #[test]
    fn test_reserved_is_refused() {
        let mut backend = MemoryBackend::new();
        backend.reserve(&accel("Mod+Q"));
        assert!(!backend.try_claim(&accel("Mod+Q"), noop()).unwrap());

        backend.unreserve(&accel("Mod+Q"));
        assert!(backend.try_claim(&accel("Mod+Q"), noop()).unwrap());
    }

    #[test]
    fn test_reject_all() {
        let mut backend = MemoryBackend::new();
        backend.set_reject_all(true);
        assert!(!backend.try_claim(&accel("Mod+A"), noop()).unwrap());

        backend.set_reject_all(false);
        assert!(backend.try_claim(&accel("Mod+A"), noop()).unwrap());
        assert_eq!(backend.claim_attempts().len(), 2);
    }

    #[test]
    fn test_hijack_on_release() {
        let mut backend = MemoryBackend::new();
        backend.hijack_on_release(&accel("Mod+H"));
        assert!(backend.try_claim(&accel("Mod+H"), noop()).unwrap());
        backend.release(&accel("Mod+H")).unwrap();
        assert!(!backend.try_claim(&accel("Mod+H"), noop()).unwrap());
    }

    #[test]
    fn test_trigger_calls_callback() {
        let mut backend = MemoryBackend::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        backend
            .try_claim(
                &accel("Mod+T"),
                Arc::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        assert!(backend.trigger(&accel("Mod+T")));
        assert!(backend.trigger(&accel("Mod+T")));
        assert!(!backend.trigger(&accel("Mod+U")));
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        backend.release_all().unwrap();
        assert!(!backend.trigger(&accel("Mod+T")));
    }

    #[test]
    fn test_failing_backend() {
        let mut backend = MemoryBackend::new();
        backend.set_failing(true);
        assert!(backend.try_claim(&accel("Mod+F"), noop()).is_err());
        assert!(backend.release_all().is_err());
        assert_eq!(backend.claim_attempts(), vec![accel("Mod+F")]);
    }
}
