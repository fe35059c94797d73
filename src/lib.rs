// Re-export from sub-crates
pub use keyward_backend::{
    BackendError, BoundedBackend, GlobalHotkeyBackend, HotkeyBackend, MemoryBackend, TriggerFn,
};
pub use keyward_core::{
    APP_NAME, APP_NAME_PRETTY, Accelerator, AcceleratorError, Binding, Config, ConfigManager,
    DEFAULT_LOG_LEVEL, LOG_ENV, ShortcutConfig, ShortcutMap, TriggerEvent, default_shortcuts,
    validate,
};

mod error;
pub mod event;
pub mod notify;
mod registry;
mod shutdown;
mod stats;
mod trigger;

pub use error::{RegistryError, Result, Rollback};
pub use registry::{Availability, ConflictWith, ImportReport, ShortcutRegistry, Updated};
pub use shutdown::shutdown;
pub use stats::{RegistryStats, StatsSnapshot};
pub use trigger::{Listener, ListenerId};

// Version from this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
