//! Configuration management for keyward.
//!
//! The configuration file is the daemon's persisted shortcut set plus a few
//! runtime knobs. The registry itself never touches the file; it only exports
//! and imports [`ShortcutMap`] values.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{APP_NAME, ShortcutMap, default_shortcuts, validate};

/// Configuration structure for the application.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Show desktop notifications for warnings and errors
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub notifications: bool,

    /// Upper bound on a single claim or release call against the OS, in
    /// milliseconds. Zero means calls are made directly without a bound.
    #[serde(
        default = "default_claim_timeout_ms",
        skip_serializing_if = "is_default_claim_timeout_ms"
    )]
    pub claim_timeout_ms: u64,

    /// Shortcut set, keyed by binding id
    #[serde(default = "default_shortcuts")]
    pub shortcuts: ShortcutMap,
}

fn default_true() -> bool {
    true
}

fn is_true(v: &bool) -> bool {
    *v
}

fn default_claim_timeout_ms() -> u64 {
    500
}

fn is_default_claim_timeout_ms(v: &u64) -> bool {
    *v == default_claim_timeout_ms()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            notifications: true,
            claim_timeout_ms: default_claim_timeout_ms(),
            shortcuts: default_shortcuts(),
        }
    }
}

impl Config {
    /// Claim timeout, or `None` when unbounded.
    pub fn claim_timeout(&self) -> Option<Duration> {
        (self.claim_timeout_ms > 0).then(|| Duration::from_millis(self.claim_timeout_ms))
    }
}

/// Manages loading and saving configuration files.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Creates a new ConfigManager with the default configuration directory.
    pub fn new() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Ok(Self { config_path })
    }

    /// Creates a new ConfigManager with a specified configuration directory.
    pub fn with_config_dir<P: AsRef<std::path::Path>>(dir: P) -> Self {
        let config_path = dir.as_ref().join(format!("{}.toml", APP_NAME));
        Self { config_path }
    }

    /// Returns the default path to the configuration file.
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to retrieve configuration directory")?;
        Ok(config_dir.join(APP_NAME).join(format!("{}.toml", APP_NAME)))
    }

    /// Loads the configuration from the config file or returns default.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            debug!(path = ?self.config_path, "no config file, using defaults");
            return Ok(Config::default());
        }

        let config_content = fs::read_to_string(&self.config_path)
            .with_context(|| format!("Failed to read config file at {:?}", self.config_path))?;

        let config: Config = toml::from_str(&config_content)
            .with_context(|| format!("Failed to parse config file at {:?}", self.config_path))?;

        if config.shortcuts.is_empty() {
            warn!("No shortcuts configured. Nothing will be registered.");
        }
        for (id, shortcut) in &config.shortcuts {
            if !validate(&shortcut.accelerator) {
                warn!(%id, accelerator = %shortcut.accelerator, "invalid accelerator in config");
            }
        }

        Ok(config)
    }

    /// Reloads the configuration and returns `true` if there are changes.
    pub fn reload(&self, current_config: &mut Config) -> Result<bool> {
        let old_config = current_config.clone();
        *current_config = self.load()?;
        Ok(*current_config != old_config)
    }

    /// Saves the configuration to the config file.
    pub fn save(&self, config: &Config) -> Result<()> {
        let config_dir = self
            .config_path
            .parent()
            .with_context(|| format!("Failed to get parent directory of {:?}", self.config_path))?;

        fs::create_dir_all(config_dir)
            .with_context(|| format!("Failed to create config directory at {:?}", config_dir))?;

        let serialized =
            toml::to_string_pretty(&config).context("Failed to serialize configuration")?;

        fs::write(&self.config_path, serialized)
            .with_context(|| format!("Failed to write config file at {:?}", self.config_path))?;

        Ok(())
    }

    /// Returns the path to the configuration file.
    pub fn config_path(&self) -> &std::path::Path {
        &self.config_path
    }
}
