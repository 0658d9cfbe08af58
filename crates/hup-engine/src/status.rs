//! # Update Status
//!
//! Long-lived state machine over the policy-table exchange: whether an
//! update is required, whether one is in flight, and whether the
//! application search of the connected device is still running. Driven by
//! commands from the orchestrator, queried through predicates, reported
//! upstream as one of three status strings.
//!
//! A `schedule_update` issued while an exchange is in flight is *not*
//! erased when that exchange completes — the orchestrator checks
//! `is_update_required` after applying an update and immediately chains
//! into the next exchange.

use std::sync::Mutex;

use crate::lock;

/// Status string reported when no update is required or in flight.
pub const STATUS_UP_TO_DATE: &str = "UP_TO_DATE";
/// Status string reported while an update is required but not yet in flight.
pub const STATUS_UPDATE_NEEDED: &str = "UPDATE_NEEDED";
/// Status string reported while an exchange is in flight.
pub const STATUS_UPDATING: &str = "UPDATING";

#[derive(Debug, Default)]
struct StatusState {
    /// An update has been scheduled and not yet satisfied.
    update_required: bool,
    /// An update request has been sent out and no reply processed yet.
    update_pending: bool,
    /// The last in-flight request timed out.
    timed_out: bool,
    /// The device's application search is still running.
    apps_search_in_progress: bool,
    /// Response timeout of the in-flight request, seconds.
    last_update_timeout: u32,
}

/// Thread-safe update-status tracker.
#[derive(Debug, Default)]
pub struct UpdateStatusManager {
    state: Mutex<StatusState>,
}

impl UpdateStatusManager {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Commands ───────────────────────────────────────────────────

    /// Record that an update is required. Repeated calls coalesce.
    pub fn schedule_update(&self) {
        let mut state = lock(&self.state);
        if !state.update_required {
            tracing::debug!("policy table update scheduled");
        }
        state.update_required = true;
    }

    /// Restore the initial status from the persisted update-required flag.
    pub fn on_policy_init(&self, update_required: bool) {
        let mut state = lock(&self.state);
        state.update_required = update_required;
        state.update_pending = false;
        state.timed_out = false;
    }

    /// An update request left the device with the given response timeout.
    pub fn on_update_sent_out(&self, timeout_seconds: u32) {
        let mut state = lock(&self.state);
        state.update_pending = true;
        state.timed_out = false;
        state.last_update_timeout = timeout_seconds;
    }

    /// A valid update was received and applied. Clears the in-flight and
    /// timed-out conditions only; a schedule request issued during the
    /// exchange survives.
    pub fn on_valid_update_received(&self) {
        let mut state = lock(&self.state);
        state.update_pending = false;
        state.timed_out = false;
    }

    /// The received payload was malformed or invalid; an update is still
    /// required.
    pub fn on_wrong_update_received(&self) {
        let mut state = lock(&self.state);
        state.update_pending = false;
        state.update_required = true;
    }

    /// The transport reported that the in-flight request timed out.
    pub fn on_update_timeout_occurs(&self) {
        let mut state = lock(&self.state);
        state.update_pending = false;
        state.update_required = true;
        state.timed_out = true;
    }

    /// All currently registered applications were covered by a snapshot
    /// request; nothing outstanding requires an update anymore.
    pub fn reset_update_schedule(&self) {
        let mut state = lock(&self.state);
        state.update_required = false;
    }

    /// The retry sequence restarted from attempt zero.
    pub fn on_reset_retry_sequence(&self) {
        let mut state = lock(&self.state);
        state.timed_out = false;
    }

    /// A never-before-seen application registered; its permissions are
    /// not covered by the current table.
    pub fn on_new_application_added(&self) {
        self.schedule_update();
    }

    pub fn on_apps_search_started(&self) {
        lock(&self.state).apps_search_in_progress = true;
    }

    pub fn on_apps_search_completed(&self) {
        lock(&self.state).apps_search_in_progress = false;
    }

    // ─── Predicates ─────────────────────────────────────────────────

    pub fn is_update_required(&self) -> bool {
        lock(&self.state).update_required
    }

    pub fn is_update_pending(&self) -> bool {
        lock(&self.state).update_pending
    }

    pub fn is_apps_search_in_progress(&self) -> bool {
        lock(&self.state).apps_search_in_progress
    }

    /// Response timeout of the most recent in-flight request, seconds.
    pub fn last_update_timeout(&self) -> u32 {
        lock(&self.state).last_update_timeout
    }

    /// Status string for external reporting. A timed-out exchange reports
    /// as `UPDATE_NEEDED`; the distinction stays internal.
    pub fn stringified_update_status(&self) -> String {
        let state = lock(&self.state);
        let status = if state.update_pending {
            STATUS_UPDATING
        } else if state.update_required || state.timed_out {
            STATUS_UPDATE_NEEDED
        } else {
            STATUS_UP_TO_DATE
        };
        status.to_string()
    }
}
