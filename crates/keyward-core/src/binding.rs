//! Binding records and their serialized configuration form.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Accelerator;

/// Snapshot of a single binding held by the registry.
///
/// Values of this type are copies; mutating one has no effect on the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Caller-chosen key, fixed for the life of the binding
    pub id: String,
    pub accelerator: Accelerator,
    /// Opaque tag interpreted by whoever listens for triggers
    pub action: String,
    pub description: String,
    /// What the caller asked for
    pub enabled: bool,
    /// Whether the OS backend currently holds the accelerator for us
    pub claimed: bool,
}

impl Binding {
    /// The configuration entry this binding exports as.
    pub fn to_config(&self) -> ShortcutConfig {
        ShortcutConfig {
            accelerator: self.accelerator.to_string(),
            action: self.action.clone(),
            description: self.description.clone(),
            enabled: self.enabled,
        }
    }
}

/// One entry of an exported or imported shortcut set.
///
/// The accelerator is kept as written so one bad entry does not spoil the
/// rest of a file; it is parsed when the entry is imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcutConfig {
    pub accelerator: String,
    pub action: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default = "default_enabled", skip_serializing_if = "is_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

fn is_enabled(v: &bool) -> bool {
    *v
}

impl ShortcutConfig {
    pub fn new(accelerator: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            accelerator: accelerator.into(),
            action: action.into(),
            description: String::new(),
            enabled: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Shortcut set keyed by binding id. Ordered so exports are stable.
pub type ShortcutMap = BTreeMap<String, ShortcutConfig>;

/// The built-in shortcut set used on first run and by reset-to-defaults.
pub fn default_shortcuts() -> ShortcutMap {
    // (id, accelerator, action, description, enabled)
    let defaults = [
        (
            "showHide",
            "Mod+Alt+E",
            "show-hide-window",
            "Show or hide the main window",
            true,
        ),
        (
            "clipboardHistory",
            "Mod+Shift+V",
            "show-clipboard-history",
            "Open clipboard history",
            true,
        ),
        (
            "quickNote",
            "Mod+Alt+N",
            "new-quick-note",
            "Create a quick note",
            true,
        ),
        (
            "screenshot",
            "Mod+Shift+5",
            "capture-screenshot",
            "Capture a screenshot",
            false,
        ),
    ];

    defaults
        .into_iter()
        .map(|(id, accelerator, action, description, enabled)| {
            let mut config = ShortcutConfig::new(accelerator, action).with_description(description);
            config.enabled = enabled;
            (id.to_string(), config)
        })
        .collect()
}
