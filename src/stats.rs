//! Registry counters.

use keyward_core::TriggerEvent;

/// Process-wide counters kept alongside the registry.
///
/// Only the claim and trigger paths write to these; callers get copies
/// through [`StatsSnapshot`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Successful claims ever made (probe claims excluded)
    pub total_registered: u64,
    /// Trigger callbacks ever observed
    pub total_triggered: u64,
    pub last_triggered: Option<TriggerEvent>,
}

impl RegistryStats {
    pub(crate) fn record_claim(&mut self) {
        self.total_registered += 1;
    }

    pub(crate) fn record_trigger(&mut self, event: &TriggerEvent) {
        self.total_triggered += 1;
        self.last_triggered = Some(event.clone());
    }
}

/// Counters plus a summary of the binding set at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub total_registered: u64,
    pub total_triggered: u64,
    pub last_triggered: Option<TriggerEvent>,
    pub total_bindings: usize,
    pub enabled_count: usize,
    pub disabled_count: usize,
    pub claimed_count: usize,
}
