//! # Exchange Triggers
//!
//! Decides whether elapsed ignition cycles or calendar days have crossed
//! the limits configured in the policy table. The cache owns the counters
//! and answers with the remaining amount; a remaining count of zero means
//! the trigger fired. The kilometer trigger lives in the orchestrator's
//! `kms_changed` entry point because it schedules and exchanges in one
//! step.

use hup_cache::PolicyCache;
use hup_core::temporal;

use crate::status::UpdateStatusManager;

/// Whether enough ignition cycles have passed since the last exchange.
pub fn exceeded_ignition_cycles(cache: &dyn PolicyCache) -> bool {
    cache.ignition_cycles_before_exchange() == 0
}

/// Whether enough calendar days have passed since the last exchange.
pub fn exceeded_days(cache: &dyn PolicyCache) -> bool {
    cache.days_before_exchange(temporal::days_since_epoch()) == 0
}

/// Evaluate the ignition and day triggers, scheduling an update when
/// either fired. Idempotent: the status tracker coalesces repeated
/// schedule requests.
pub fn check_triggers(cache: &dyn PolicyCache, status: &UpdateStatusManager) {
    let exceeded_ignition = exceeded_ignition_cycles(cache);
    let exceeded_days = exceeded_days(cache);

    tracing::debug!(
        ignition_cycles_exceeded = exceeded_ignition,
        days_exceeded = exceeded_days,
        "exchange triggers evaluated"
    );

    if exceeded_ignition || exceeded_days {
        status.schedule_update();
    }
}
