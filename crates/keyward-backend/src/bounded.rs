//! Time-bounded backend wrapper.
//!
//! The wrapped backend lives on its own parked thread and we talk to it over
//! a channel, waiting at most `timeout` for each answer. A claim that finishes
//! after its caller stopped waiting is released straight away on the worker
//! so it cannot leak.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use keyward_core::Accelerator;
use tracing::{debug, error, warn};

use crate::{BackendError, HotkeyBackend, Result, TriggerFn};

const PENDING: u8 = 0;
const ANSWERED: u8 = 1;
const ABANDONED: u8 = 2;

enum Request {
    Claim {
        accelerator: Accelerator,
        on_trigger: TriggerFn,
        /// Decides whether the reply or a cleanup release wins
        outcome: Arc<AtomicU8>,
        reply: Sender<Result<bool>>,
    },
    Release {
        accelerator: Accelerator,
        reply: Sender<Result<()>>,
    },
    ReleaseAll {
        reply: Sender<Result<()>>,
    },
}

pub struct BoundedBackend {
    requests: Sender<Request>,
    timeout: Duration,
    name: String,
}

impl BoundedBackend {
    /// Starts a worker thread, builds the backend on it with `make` and
    /// bounds every later call by `timeout`.
    ///
    /// The backend is constructed on the worker so it does not need to be
    /// `Send`.
    pub fn spawn<B, F>(make: F, timeout: Duration) -> Result<Self>
    where
        B: HotkeyBackend + 'static,
        F: FnOnce() -> Result<B> + Send + 'static,
    {
        let (requests, receiver) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        thread::Builder::new()
            .name("keyward-backend".into())
            .spawn(move || match make() {
                Ok(backend) => {
                    ready_tx.send(Ok(backend.name().to_string())).ok();
                    run_worker(backend, receiver);
                }
                Err(e) => {
                    ready_tx.send(Err(e)).ok();
                }
            })
            .map_err(|e| BackendError::Platform(e.to_string()))?;

        let name = ready_rx.recv().map_err(|_| BackendError::Unavailable)??;
        debug!(backend = %name, ?timeout, "bounded backend ready");

        Ok(Self {
            requests,
            timeout,
            name: format!("bounded({})", name),
        })
    }

    fn send(&self, request: Request) -> Result<()> {
        self.requests
            .send(request)
            .map_err(|_| BackendError::Unavailable)
    }

    fn wait<T>(&self, reply: &Receiver<Result<T>>) -> Result<T> {
        match reply.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(BackendError::Timeout(self.timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(BackendError::Unavailable),
        }
    }
}

impl HotkeyBackend for BoundedBackend {
    fn try_claim(&mut self, accelerator: &Accelerator, on_trigger: TriggerFn) -> Result<bool> {
        let (reply, answer) = mpsc::channel();
        let outcome = Arc::new(AtomicU8::new(PENDING));
        self.send(Request::Claim {
            accelerator: accelerator.clone(),
            on_trigger,
            outcome: outcome.clone(),
            reply,
        })?;

        match self.wait(&answer) {
            Err(BackendError::Timeout(timeout)) => {
                if outcome
                    .compare_exchange(PENDING, ABANDONED, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    warn!(%accelerator, ?timeout, "claim timed out");
                    return Err(BackendError::Timeout(timeout));
                }
                // The worker answered between the timeout and the swap; the
                // reply is already on its way.
                answer.recv().map_err(|_| BackendError::Unavailable)?
            }
            other => other,
        }
    }

    fn release(&mut self, accelerator: &Accelerator) -> Result<()> {
        let (reply, answer) = mpsc::channel();
        self.send(Request::Release {
            accelerator: accelerator.clone(),
            reply,
        })?;
        self.wait(&answer)
    }

    fn release_all(&mut self) -> Result<()> {
        let (reply, answer) = mpsc::channel();
        self.send(Request::ReleaseAll { reply })?;
        self.wait(&answer)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn run_worker<B: HotkeyBackend>(mut backend: B, requests: Receiver<Request>) {
    while let Ok(request) = requests.recv() {
        match request {
            Request::Claim {
                accelerator,
                on_trigger,
                outcome,
                reply,
            } => {
                let result = backend.try_claim(&accelerator, on_trigger);
                let answered = outcome
                    .compare_exchange(PENDING, ANSWERED, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok();
                if answered {
                    reply.send(result).ok();
                } else if let Ok(true) = result {
                    warn!(%accelerator, "late claim, releasing");
                    if let Err(e) = backend.release(&accelerator) {
                        error!(%accelerator, error = %e, "failed to release late claim");
                    }
                }
            }
            Request::Release { accelerator, reply } => {
                reply.send(backend.release(&accelerator)).ok();
            }
            Request::ReleaseAll { reply } => {
                reply.send(backend.release_all()).ok();
            }
        }
    }

    debug!(backend = backend.name(), "bounded backend worker stopped");
    if let Err(e) = backend.release_all() {
        error!(error = %e, "failed to release hotkeys on shutdown");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::MemoryBackend;

    /// Delegates to a memory backend after sleeping.
    struct SlowBackend {
        inner: MemoryBackend,
        delay: Duration,
    }

    impl HotkeyBackend for SlowBackend {
        fn try_claim(&mut self, accelerator: &Accelerator, on_trigger: TriggerFn) -> Result<bool> {
            thread::sleep(self.delay);
            self.inner.try_claim(accelerator, on_trigger)
        }

        fn release(&mut self, accelerator: &Accelerator) -> Result<()> {
            self.inner.release(accelerator)
        }

        fn release_all(&mut self) -> Result<()> {
            self.inner.release_all()
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    fn accel(s: &str) -> Accelerator {
        s.parse().unwrap()
    }

    fn slow(inner: &MemoryBackend, delay: Duration, timeout: Duration) -> BoundedBackend {
        let inner = inner.clone();
        BoundedBackend::spawn(move || Ok(SlowBackend { inner, delay }), timeout).unwrap()
    }

    #[test]
    fn test_fast_backend_passes_through() {
        let memory = MemoryBackend::new();
        let mut backend = slow(&memory, Duration::ZERO, Duration::from_secs(5));
        assert_eq!(backend.name(), "bounded(slow)");

        assert!(backend.try_claim(&accel("Mod+A"), Arc::new(|| {})).unwrap());
        assert!(memory.is_claimed(&accel("Mod+A")));

        memory.reserve(&accel("Mod+B"));
        assert!(!backend.try_claim(&accel("Mod+B"), Arc::new(|| {})).unwrap());

        backend.release(&accel("Mod+A")).unwrap();
        assert!(memory.claimed().is_empty());
    }

    #[test]
    fn test_slow_claim_times_out_and_is_released() {
        let memory = MemoryBackend::new();
        let mut backend = slow(&memory, Duration::from_millis(200), Duration::from_millis(20));

        let started = Instant::now();
        let result = backend.try_claim(&accel("Mod+S"), Arc::new(|| {}));
        assert!(matches!(result, Err(BackendError::Timeout(_))));
        assert!(started.elapsed() < Duration::from_millis(200));

        // The worker finishes the claim later and then gives it back.
        let deadline = Instant::now() + Duration::from_secs(5);
        while memory.claim_attempts().is_empty() || memory.is_claimed(&accel("Mod+S")) {
            assert!(Instant::now() < deadline, "late claim was never released");
            thread::sleep(Duration::from_millis(10));
        }
        assert!(memory.claimed().is_empty());
    }

    #[test]
    fn test_factory_error_is_returned() {
        let result = BoundedBackend::spawn(
            || -> Result<MemoryBackend> { Err(BackendError::Platform("no display".into())) },
            Duration::from_secs(1),
        );
        assert!(matches!(result, Err(BackendError::Platform(_))));
    }

    #[test]
    fn test_drop_releases_everything() {
        let memory = MemoryBackend::new();
        let mut backend = slow(&memory, Duration::ZERO, Duration::from_secs(5));
        backend.try_claim(&accel("Mod+D"), Arc::new(|| {})).unwrap();
        drop(backend);

        let deadline = Instant::now() + Duration::from_secs(5);
        while !memory.claimed().is_empty() {
            assert!(Instant::now() < deadline, "worker did not release on shutdown");
            thread::sleep(Duration::from_millis(10));
        }
    }
}
