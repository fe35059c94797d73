//! The shortcut registry.
//!
//! Each binding is `Disabled` (stored, not enabled, not claimed) or `Active`
//! (enabled and claimed from the backend). A binding can also be enabled but
//! unclaimed when an import could not claim it. Bindings are never removed by
//! unregistering; only import and reset replace the set.
//!
//! Accelerator uniqueness across stored bindings is checked before the backend
//! is asked for anything, so a duplicate request never reaches the OS.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;

use keyward_backend::{HotkeyBackend, TriggerFn};
use keyward_core::{Accelerator, Binding, ShortcutMap, TriggerEvent, default_shortcuts};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::{Result, RegistryError, Rollback, parse_accelerator};
use crate::stats::StatsSnapshot;
use crate::trigger::{ListenerId, TriggerHub};

/// Outcome of a successful [`ShortcutRegistry::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Updated {
    pub id: String,
    pub old_accelerator: Accelerator,
    pub new_accelerator: Accelerator,
}

/// Who stands in the way of an accelerator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictWith {
    /// Another binding in this registry
    Binding(String),
    /// Another process or the OS itself
    System,
}

impl fmt::Display for ConflictWith {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binding(id) => f.write_str(id),
            Self::System => f.write_str("system"),
        }
    }
}

/// Result of [`ShortcutRegistry::check_availability`]. Advisory only: another
/// process may take the accelerator right after the check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Availability {
    pub accelerator: Accelerator,
    pub conflict_with: Option<ConflictWith>,
}

impl Availability {
    pub fn available(&self) -> bool {
        self.conflict_with.is_none()
    }

    pub fn conflict(&self) -> bool {
        self.conflict_with.is_some()
    }

    /// Human-readable summary.
    pub fn message(&self) -> String {
        match &self.conflict_with {
            None => format!("{} is available", self.accelerator),
            Some(ConflictWith::Binding(id)) => {
                format!("{} is already used by `{}`", self.accelerator, id)
            }
            Some(ConflictWith::System) => format!(
                "{} is in use by another application or reserved by the system",
                self.accelerator
            ),
        }
    }
}

/// Summary of an import or reset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Bindings stored
    pub count: usize,
    /// Stored and enabled, but the backend refused the claim
    pub unclaimed: Vec<String>,
    /// Not stored at all
    pub skipped: Vec<(String, RegistryError)>,
}

struct Entry {
    binding: Binding,
    /// Present while claimed. Cleared before the backend release so a late
    /// press for a released accelerator is dropped.
    live: Option<Arc<AtomicBool>>,
}

impl Entry {
    fn set_live(&mut self, live: Option<Arc<AtomicBool>>) {
        self.binding.claimed = live.is_some();
        if live.is_some() {
            self.binding.enabled = true;
        }
        self.live = live;
    }
}

struct Inner<B> {
    backend: B,
    bindings: HashMap<String, Entry>,
    /// accelerator -> id, for every stored binding
    index: HashMap<Accelerator, String>,
}

impl<B: HotkeyBackend> Inner<B> {
    fn holder(&self, accelerator: &Accelerator) -> Option<&str> {
        self.index.get(accelerator).map(String::as_str)
    }

    fn snapshot(&self, id: &str) -> Option<Binding> {
        self.bindings.get(id).map(|entry| entry.binding.clone())
    }

    fn insert(&mut self, binding: Binding, live: Option<Arc<AtomicBool>>) {
        self.index.insert(binding.accelerator.clone(), binding.id.clone());
        let mut entry = Entry {
            binding,
            live: None,
        };
        entry.set_live(live);
        self.bindings.insert(entry.binding.id.clone(), entry);
    }

    /// Point `id` at a new accelerator, keeping the index in step.
    fn reindex(&mut self, id: &str, accelerator: Accelerator) {
        if let Some(entry) = self.bindings.get_mut(id) {
            self.index.remove(&entry.binding.accelerator);
            self.index.insert(accelerator.clone(), id.to_string());
            entry.binding.accelerator = accelerator;
        }
    }

    /// Ask the backend for `binding.accelerator`, wiring presses to `hub`.
    /// Returns the liveness flag on success. Adapter errors count as a
    /// refusal.
    fn activate(&mut self, hub: &Arc<TriggerHub>, binding: &Binding) -> Option<Arc<AtomicBool>> {
        let live = Arc::new(AtomicBool::new(true));
        let on_trigger: TriggerFn = {
            let hub = hub.clone();
            let live = live.clone();
            let id = binding.id.clone();
            let action = binding.action.clone();
            let accelerator = binding.accelerator.clone();
            Arc::new(move || {
                if live.load(Ordering::Acquire) {
                    hub.publish(TriggerEvent::now(&id, &action, accelerator.clone()));
                }
            })
        };

        match self.backend.try_claim(&binding.accelerator, on_trigger) {
            Ok(true) => {
                hub.record_claim();
                Some(live)
            }
            Ok(false) => {
                warn!(
                    id = %binding.id,
                    accelerator = %binding.accelerator,
                    "shortcut refused by the system"
                );
                None
            }
            Err(e) => {
                error!(
                    id = %binding.id,
                    accelerator = %binding.accelerator,
                    backend = self.backend.name(),
                    error = %e,
                    "backend failed to claim shortcut"
                );
                None
            }
        }
    }

    /// Release `id`'s claim if it has one. The binding's `enabled` flag is
    /// left alone.
    fn deactivate(&mut self, id: &str) {
        let Some(entry) = self.bindings.get_mut(id) else {
            return;
        };
        let Some(live) = entry.live.take() else {
            return;
        };
        live.store(false, Ordering::Release);
        entry.binding.claimed = false;

        let accelerator = entry.binding.accelerator.clone();
        if let Err(e) = self.backend.release(&accelerator) {
            warn!(%id, %accelerator, error = %e, "failed to release shortcut");
        }
    }

    /// Claim `id`'s stored accelerator unless it is already held.
    fn enable(&mut self, hub: &Arc<TriggerHub>, id: &str) -> Result<bool> {
        let binding = self
            .snapshot(id)
            .ok_or_else(|| RegistryError::NotFound { id: id.to_string() })?;
        if binding.claimed {
            return Ok(true);
        }

        match self.activate(hub, &binding) {
            Some(live) => {
                if let Some(entry) = self.bindings.get_mut(id) {
                    entry.set_live(Some(live));
                }
                info!(%id, accelerator = %binding.accelerator, "shortcut enabled");
                Ok(true)
            }
            None => Err(RegistryError::SystemConflict {
                accelerator: binding.accelerator,
                rollback: None,
            }),
        }
    }

    /// Release `id` and mark it disabled. A binding that is already disabled
    /// is not registered any more and reports `NotFound`.
    fn disable(&mut self, id: &str) -> Result<()> {
        let registered = self
            .bindings
            .get(id)
            .is_some_and(|entry| entry.binding.enabled);
        if !registered {
            return Err(RegistryError::NotFound { id: id.to_string() });
        }

        self.deactivate(id);
        if let Some(entry) = self.bindings.get_mut(id) {
            entry.binding.enabled = false;
        }
        info!(%id, "shortcut unregistered");
        Ok(())
    }

    /// Try once to claim `id`'s stored accelerator again after a refused
    /// change. On failure the binding ends up disabled.
    fn reclaim(&mut self, hub: &Arc<TriggerHub>, id: &str) -> Rollback {
        let Some(binding) = self.snapshot(id) else {
            return Rollback::Disabled;
        };
        let live = self.activate(hub, &binding);
        let restored = live.is_some();
        if let Some(entry) = self.bindings.get_mut(id) {
            entry.set_live(live);
            if !restored {
                entry.binding.enabled = false;
            }
        }

        if restored {
            info!(%id, accelerator = %binding.accelerator, "previous shortcut restored");
            Rollback::Restored
        } else {
            warn!(
                %id,
                accelerator = %binding.accelerator,
                "previous shortcut could not be restored, binding disabled"
            );
            Rollback::Disabled
        }
    }

    fn release_all(&mut self) {
        for entry in self.bindings.values_mut() {
            if let Some(live) = entry.live.take() {
                live.store(false, Ordering::Release);
            }
            entry.binding.claimed = false;
        }
        if let Err(e) = self.backend.release_all() {
            warn!(backend = self.backend.name(), error = %e, "failed to release all shortcuts");
        }
    }

    fn import(&mut self, hub: &Arc<TriggerHub>, shortcuts: ShortcutMap) -> ImportReport {
        self.release_all();
        self.bindings.clear();
        self.index.clear();

        let mut report = ImportReport::default();
        for (id, config) in shortcuts {
            let accelerator = match parse_accelerator(&config.accelerator) {
                Ok(accelerator) => accelerator,
                Err(err) => {
                    warn!(%id, error = %err, "skipping imported shortcut");
                    report.skipped.push((id, err));
                    continue;
                }
            };
            if let Some(holder) = self.holder(&accelerator) {
                let err = RegistryError::DuplicateAccelerator {
                    holder: holder.to_string(),
                    accelerator,
                };
                warn!(%id, error = %err, "skipping imported shortcut");
                report.skipped.push((id, err));
                continue;
            }

            let binding = Binding {
                id,
                accelerator,
                action: config.action,
                description: config.description,
                enabled: config.enabled,
                claimed: false,
            };
            let live = if binding.enabled {
                let live = self.activate(hub, &binding);
                if live.is_none() {
                    report.unclaimed.push(binding.id.clone());
                }
                live
            } else {
                None
            };
            self.insert(binding, live);
            report.count += 1;
        }
        report
    }
}

/// Owns the binding set and mediates every claim and release against the
/// backend.
///
/// All mutating operations are serialized on one lock. Presses reported by
/// the backend go through a separate, lighter path that only updates the
/// counters and notifies listeners.
pub struct ShortcutRegistry<B> {
    inner: Mutex<Inner<B>>,
    hub: Arc<TriggerHub>,
    defaults: ShortcutMap,
}

impl<B: HotkeyBackend> ShortcutRegistry<B> {
    /// Creates an empty registry that resets to the built-in default set.
    pub fn new(backend: B) -> Self {
        Self::with_defaults(backend, default_shortcuts())
    }

    /// Creates an empty registry that resets to `defaults`.
    pub fn with_defaults(backend: B, defaults: ShortcutMap) -> Self {
        debug!(backend = backend.name(), "creating shortcut registry");
        Self {
            inner: Mutex::new(Inner {
                backend,
                bindings: HashMap::new(),
                index: HashMap::new(),
            }),
            hub: Arc::default(),
            defaults,
        }
    }

    /// Register `id` on `accelerator` and claim it.
    ///
    /// Registering an id that already exists re-binds it: the old claim is
    /// released first and, if the new claim is refused, re-taken once. A
    /// refused re-bind of a binding that held no claim leaves it untouched.
    pub fn register(
        &self,
        id: &str,
        accelerator: &str,
        action: &str,
        description: &str,
    ) -> Result<Binding> {
        let accelerator = parse_accelerator(accelerator)?;
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        if let Some(holder) = inner.holder(&accelerator).filter(|holder| *holder != id) {
            return Err(RegistryError::DuplicateAccelerator {
                accelerator,
                holder: holder.to_string(),
            });
        }

        let binding = Binding {
            id: id.to_string(),
            accelerator,
            action: action.to_string(),
            description: description.to_string(),
            enabled: true,
            claimed: false,
        };

        let previous = inner.snapshot(id);
        if previous.is_some() {
            inner.deactivate(id);
        }

        match inner.activate(&self.hub, &binding) {
            Some(live) => {
                if let Some(previous) = &previous {
                    inner.index.remove(&previous.accelerator);
                }
                info!(
                    %id,
                    accelerator = %binding.accelerator,
                    action = %binding.action,
                    "shortcut registered"
                );
                inner.insert(binding, Some(live));
                inner
                    .snapshot(id)
                    .ok_or_else(|| RegistryError::NotFound { id: id.to_string() })
            }
            None => {
                let rollback = match previous {
                    Some(previous) if previous.claimed => Some(inner.reclaim(&self.hub, id)),
                    _ => None,
                };
                Err(RegistryError::SystemConflict {
                    accelerator: binding.accelerator,
                    rollback,
                })
            }
        }
    }

    /// Release `id`'s accelerator and mark it disabled. The binding stays in
    /// the registry, but a second unregister reports
    /// [`RegistryError::NotFound`] since nothing is registered under `id`.
    pub fn unregister(&self, id: &str) -> Result<()> {
        self.inner.lock().disable(id)
    }

    /// Release everything and mark every binding disabled. Safe to call any
    /// number of times.
    pub fn unregister_all(&self) {
        let mut inner = self.inner.lock();
        inner.release_all();
        for entry in inner.bindings.values_mut() {
            entry.binding.enabled = false;
        }
        info!("all shortcuts unregistered");
    }

    /// Move `id` to `new_accelerator`.
    ///
    /// For an enabled binding the old accelerator is released before the new
    /// one is claimed. If the new claim is refused the old accelerator is
    /// claimed again, once; [`RegistryError::SystemConflict`] reports whether
    /// that worked. If it did not, the binding is left disabled on its old
    /// accelerator. An enabled binding without a claim has nothing to restore
    /// and is left as it was. A disabled binding just changes accelerator.
    pub fn update(&self, id: &str, new_accelerator: &str) -> Result<Updated> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let current = inner
            .snapshot(id)
            .ok_or_else(|| RegistryError::NotFound { id: id.to_string() })?;
        let new_accelerator = parse_accelerator(new_accelerator)?;
        let updated = Updated {
            id: id.to_string(),
            old_accelerator: current.accelerator.clone(),
            new_accelerator: new_accelerator.clone(),
        };

        if new_accelerator == current.accelerator {
            debug!(%id, accelerator = %new_accelerator, "update to same accelerator");
            return Ok(updated);
        }
        if let Some(holder) = inner.holder(&new_accelerator) {
            return Err(RegistryError::DuplicateAccelerator {
                accelerator: new_accelerator,
                holder: holder.to_string(),
            });
        }

        if !current.enabled {
            inner.reindex(id, new_accelerator);
            info!(
                %id,
                old = %updated.old_accelerator,
                new = %updated.new_accelerator,
                "disabled shortcut updated"
            );
            return Ok(updated);
        }

        let was_claimed = current.claimed;
        inner.deactivate(id);
        let candidate = Binding {
            accelerator: new_accelerator.clone(),
            ..current
        };
        match inner.activate(&self.hub, &candidate) {
            Some(live) => {
                inner.reindex(id, new_accelerator);
                if let Some(entry) = inner.bindings.get_mut(id) {
                    entry.set_live(Some(live));
                }
                info!(
                    %id,
                    old = %updated.old_accelerator,
                    new = %updated.new_accelerator,
                    "shortcut updated"
                );
                Ok(updated)
            }
            None => {
                let rollback = was_claimed.then(|| inner.reclaim(&self.hub, id));
                Err(RegistryError::SystemConflict {
                    accelerator: new_accelerator,
                    rollback,
                })
            }
        }
    }

    /// Claim `id`'s stored accelerator. Already active is a no-op. A refused
    /// claim leaves the binding as it was.
    pub fn enable(&self, id: &str) -> Result<bool> {
        self.inner.lock().enable(&self.hub, id)
    }

    /// Same effect as [`unregister`](Self::unregister); returns the new
    /// `enabled` state.
    pub fn disable(&self, id: &str) -> Result<bool> {
        self.unregister(id)?;
        Ok(false)
    }

    /// Disable when active, otherwise enable. Returns the resulting `enabled`.
    pub fn toggle(&self, id: &str) -> Result<bool> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let active = inner
            .snapshot(id)
            .ok_or_else(|| RegistryError::NotFound { id: id.to_string() })?
            .claimed;
        if active {
            inner.disable(id).map(|()| false)
        } else {
            inner.enable(&self.hub, id)
        }
    }

    /// Snapshot of every binding, ordered by id.
    pub fn get_all(&self) -> Vec<Binding> {
        let inner = self.inner.lock();
        let mut bindings: Vec<_> = inner
            .bindings
            .values()
            .map(|entry| entry.binding.clone())
            .collect();
        bindings.sort_by(|a, b| a.id.cmp(&b.id));
        bindings
    }

    pub fn get(&self, id: &str) -> Option<Binding> {
        self.inner.lock().snapshot(id)
    }

    /// Check whether `accelerator` could be registered right now.
    ///
    /// If no binding holds it, the backend is probed with a claim that is
    /// released straight away.
    pub fn check_availability(&self, accelerator: &str) -> Result<Availability> {
        let accelerator = parse_accelerator(accelerator)?;
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        if let Some(holder) = inner.holder(&accelerator) {
            return Ok(Availability {
                conflict_with: Some(ConflictWith::Binding(holder.to_string())),
                accelerator,
            });
        }

        let probe = inner.backend.try_claim(&accelerator, Arc::new(|| {}));
        let conflict_with = match probe {
            Ok(true) => {
                if let Err(e) = inner.backend.release(&accelerator) {
                    warn!(%accelerator, error = %e, "failed to release probe claim");
                }
                None
            }
            Ok(false) => Some(ConflictWith::System),
            Err(e) => {
                error!(%accelerator, error = %e, "backend failed during availability probe");
                Some(ConflictWith::System)
            }
        };
        debug!(%accelerator, available = conflict_with.is_none(), "availability probe");

        Ok(Availability {
            accelerator,
            conflict_with,
        })
    }

    /// Replace everything with the default set and zero the counters.
    pub fn reset_to_defaults(&self) -> Vec<Binding> {
        {
            let mut inner = self.inner.lock();
            self.hub.reset_stats();
            let report = inner.import(&self.hub, self.defaults.clone());
            info!(count = report.count, "shortcuts reset to defaults");
        }
        self.get_all()
    }

    /// The binding set in its configuration form.
    pub fn export(&self) -> ShortcutMap {
        self.inner
            .lock()
            .bindings
            .iter()
            .map(|(id, entry)| (id.clone(), entry.binding.to_config()))
            .collect()
    }

    /// Replace the binding set with `shortcuts`. Not a merge.
    ///
    /// Enabled entries are claimed; an entry the backend refuses is still
    /// stored (enabled, unclaimed) and listed in
    /// [`ImportReport::unclaimed`]. Entries whose accelerator does not parse
    /// or repeats an earlier entry are skipped.
    pub fn import(&self, shortcuts: ShortcutMap) -> ImportReport {
        let report = self.inner.lock().import(&self.hub, shortcuts);
        info!(
            count = report.count,
            unclaimed = report.unclaimed.len(),
            skipped = report.skipped.len(),
            "shortcuts imported"
        );
        report
    }

    pub fn stats(&self) -> StatsSnapshot {
        let (total_bindings, enabled_count, claimed_count) = {
            let inner = self.inner.lock();
            let bindings = inner.bindings.values().map(|entry| &entry.binding);
            let enabled = bindings.clone().filter(|b| b.enabled).count();
            let claimed = bindings.filter(|b| b.claimed).count();
            (inner.bindings.len(), enabled, claimed)
        };
        let stats = self.hub.stats();

        StatsSnapshot {
            total_registered: stats.total_registered,
            total_triggered: stats.total_triggered,
            last_triggered: stats.last_triggered,
            total_bindings,
            enabled_count,
            disabled_count: total_bindings - enabled_count,
            claimed_count,
        }
    }

    /// Call `listener` for every `shortcut-triggered` event. A panicking
    /// listener is logged and skipped.
    pub fn on_trigger<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&TriggerEvent) + Send + Sync + 'static,
    {
        self.hub.add_listener(Arc::new(listener))
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.hub.remove_listener(id)
    }

    /// Receive `shortcut-triggered` events over a channel. Dropping the
    /// receiver unsubscribes.
    pub fn subscribe(&self) -> Receiver<TriggerEvent> {
        self.hub.subscribe()
    }
}
