//! Orderly exit for the daemon.

use anyhow::{Context, Result};
use keyward_backend::HotkeyBackend;
use keyward_core::{Config, ConfigManager};
use tracing::info;

use crate::ShortcutRegistry;

/// Write the current shortcut set back to the config file and release every
/// claim.
///
/// Entries the registry never stored (an accelerator that did not parse, a
/// duplicate) are kept as written so the user can still fix them. Claims are
/// released even when saving fails.
pub fn shutdown<B: HotkeyBackend>(
    registry: &ShortcutRegistry<B>,
    config_manager: &ConfigManager,
    config: &mut Config,
) -> Result<()> {
    let stats = registry.stats();
    info!(
        triggered = stats.total_triggered,
        claimed = stats.claimed_count,
        "Shutting down"
    );

    let mut shortcuts = registry.export();
    for (id, shortcut) in std::mem::take(&mut config.shortcuts) {
        shortcuts.entry(id).or_insert(shortcut);
    }
    config.shortcuts = shortcuts;

    let saved = config_manager
        .save(config)
        .context("Failed to save shortcuts on exit");
    registry.unregister_all();
    saved
}

#[cfg(test)]
mod tests {
    use keyward_backend::MemoryBackend;
    use keyward_core::{ShortcutConfig, ShortcutMap};
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_shutdown_saves_and_releases() {
        let temp = tempdir().expect("Failed to create temp dir");
        let manager = ConfigManager::with_config_dir(temp.path());
        let backend = MemoryBackend::new();
        let registry = ShortcutRegistry::new(backend.clone());

        let mut shortcuts = ShortcutMap::new();
        shortcuts.insert("good".into(), ShortcutConfig::new("alt+mod+g", "go"));
        shortcuts.insert("bad".into(), ShortcutConfig::new("Q", "quit"));
        let mut config = Config {
            shortcuts,
            ..Default::default()
        };
        registry.import(config.shortcuts.clone());
        registry.update("good", "Mod+Alt+H").unwrap();

        shutdown(&registry, &manager, &mut config).unwrap();

        assert!(backend.claimed().is_empty());
        assert!(registry.get_all().iter().all(|b| !b.claimed));

        let saved = manager.load().unwrap();
        assert_eq!(saved, config);
        assert_eq!(saved.shortcuts["good"].accelerator, "Mod+Alt+H");
        // Enabled state is written before the claims are dropped.
        assert!(saved.shortcuts["good"].enabled);
        assert_eq!(saved.shortcuts["bad"].accelerator, "Q");
    }

    #[test]
    fn test_shutdown_releases_when_save_fails() {
        let temp = tempdir().expect("Failed to create temp dir");
        // A file where the config directory should be makes saving fail.
        let blocker = temp.path().join("blocked");
        std::fs::write(&blocker, "").unwrap();
        let manager = ConfigManager::with_config_dir(&blocker);
        let backend = MemoryBackend::new();
        let registry = ShortcutRegistry::new(backend.clone());
        registry.reset_to_defaults();
        assert!(!backend.claimed().is_empty());

        let mut config = Config::default();
        assert!(shutdown(&registry, &manager, &mut config).is_err());
        assert!(backend.claimed().is_empty());
    }
}
