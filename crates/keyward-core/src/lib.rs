//! Core types and configuration for keyward.
//!
//! This crate holds the accelerator grammar and the platform-agnostic records
//! shared by the backend and registry crates.

pub mod accelerator;
mod binding;
mod config;
mod event;

pub use accelerator::{Accelerator, AcceleratorError, Key, Modifier, NamedKey, validate};
pub use binding::{Binding, ShortcutConfig, ShortcutMap, default_shortcuts};
pub use config::{Config, ConfigManager};
pub use event::TriggerEvent;

/// Application name
pub const APP_NAME: &str = "keyward";

/// Pretty application name for display
pub const APP_NAME_PRETTY: &str = "Keyward";

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "KEYWARD_LOG";
