//! OS hotkey backends for keyward.
//!
//! The registry talks to the operating system only through [`HotkeyBackend`].
//! [`GlobalHotkeyBackend`] is the real implementation on top of the
//! `global-hotkey` crate, [`MemoryBackend`] is a deterministic in-process fake,
//! and [`BoundedBackend`] puts a time limit on a backend that may block.

mod bounded;
mod global;
mod memory;

use std::sync::Arc;
use std::time::Duration;

pub use bounded::BoundedBackend;
pub use global::GlobalHotkeyBackend;
use keyward_core::Accelerator;
pub use memory::MemoryBackend;
use thiserror::Error;

/// Errors raised by a backend adapter itself, as opposed to the OS refusing a
/// claim (which is `Ok(false)` from [`HotkeyBackend::try_claim`]).
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend did not answer within {0:?}")]
    Timeout(Duration),

    #[error("backend is no longer running")]
    Unavailable,

    #[error("accelerator {0} cannot be expressed on this platform")]
    Unsupported(Accelerator),

    #[error("platform error: {0}")]
    Platform(String),
}

/// Result type for backend operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Callback invoked every time a claimed accelerator is pressed. Backends may
/// call it from any thread.
pub type TriggerFn = Arc<dyn Fn() + Send + Sync>;

/// Platform service that owns system-wide key combinations.
pub trait HotkeyBackend {
    /// Try to take exclusive ownership of `accelerator`.
    ///
    /// Returns `Ok(false)` when the OS refuses, either because another process
    /// holds the combination or because it is reserved. On `Ok(true)` the
    /// backend calls `on_trigger` on every press until the accelerator is
    /// released.
    fn try_claim(&mut self, accelerator: &Accelerator, on_trigger: TriggerFn) -> Result<bool>;

    /// Give up a claimed accelerator. Releasing something that is not claimed
    /// is a no-op.
    fn release(&mut self, accelerator: &Accelerator) -> Result<()>;

    /// Give up everything this process claimed through the backend.
    fn release_all(&mut self) -> Result<()>;

    /// Returns the name of this backend for logging/debugging.
    fn name(&self) -> &str;
}

impl<B: HotkeyBackend + ?Sized> HotkeyBackend for Box<B> {
    fn try_claim(&mut self, accelerator: &Accelerator, on_trigger: TriggerFn) -> Result<bool> {
        (**self).try_claim(accelerator, on_trigger)
    }

    fn release(&mut self, accelerator: &Accelerator) -> Result<()> {
        (**self).release(accelerator)
    }

    fn release_all(&mut self) -> Result<()> {
        (**self).release_all()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
