//! # Pending Permission Changes
//!
//! Per-application records of permission changes that the surrounding
//! system has not consumed yet, behind their own lock. A record exists
//! only after the update diff observed a divergence; it disappears when
//! the caller explicitly acknowledges it.

use std::collections::HashMap;
use std::sync::Mutex;

use hup_core::{AppId, AppPermissions, ConsentState, FunctionalGroupPermission, PermissionConsent};

use crate::lock;

/// Pending-diff map keyed by application id.
#[derive(Debug, Default)]
pub struct PendingPermissions {
    records: Mutex<HashMap<AppId, AppPermissions>>,
}

impl PendingPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the pending record of an application.
    pub fn upsert(&self, record: AppPermissions) {
        let mut records = lock(&self.records);
        records.insert(record.application_id.clone(), record);
    }

    /// The pending record of an application, if a change is outstanding.
    pub fn get(&self, app_id: &AppId) -> Option<AppPermissions> {
        lock(&self.records).get(app_id).cloned()
    }

    /// Acknowledge and drop the pending record of an application.
    pub fn remove(&self, app_id: &AppId) {
        lock(&self.records).remove(app_id);
    }

    /// Drop all pending records (table reset).
    pub fn clear(&self) {
        lock(&self.records).clear();
    }

    /// Re-evaluate the consent-needed flag of a pending record from the
    /// application's current permissions. Without a pending record this
    /// is a no-op; with one, any group still in the `Undefined` consent
    /// state sets the flag, and a fully resolved set clears it.
    pub fn check_pending_changes(
        &self,
        app_id: &AppId,
        current_permissions: &[FunctionalGroupPermission],
    ) {
        let mut records = lock(&self.records);
        let Some(record) = records.get_mut(app_id) else {
            tracing::warn!(app = %app_id, "no pending permission changes for application");
            return;
        };

        for permission in current_permissions {
            if permission.state == ConsentState::Undefined {
                tracing::debug!(app = %app_id, group = %permission.group_name,
                    "unconsented group still present");
                record.consent_needed = true;
                return;
            }
        }

        tracing::debug!(app = %app_id, "no unconsented groups remain");
        record.consent_needed = false;
    }
}

/// Intersect a proposed consent set with the application's currently
/// valid consent candidates, by (alias, id) identity. Stale or renamed
/// groups are silently dropped.
pub fn ensure_correct_permission_consent(
    proposed: &PermissionConsent,
    currently_valid: &[FunctionalGroupPermission],
) -> PermissionConsent {
    let group_permissions = proposed
        .group_permissions
        .iter()
        .filter(|candidate| {
            currently_valid.iter().any(|valid| {
                valid.group_alias == candidate.group_alias && valid.group_id == candidate.group_id
            })
        })
        .cloned()
        .collect();

    PermissionConsent {
        device_id: proposed.device_id.clone(),
        policy_app_id: proposed.policy_app_id.clone(),
        consent_source: proposed.consent_source.clone(),
        group_permissions,
    }
}
