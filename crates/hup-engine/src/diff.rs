//! # Update Diffing
//!
//! Compares a validated update candidate against the pre-update snapshot,
//! per application. Runs *before* the update is applied: groups revoked
//! by the update are about to vanish from the table, and their names and
//! ids must be captured while they are still resolvable.

use hup_core::{
    AppId, AppPermissions, ConsentState, FunctionalGroupId, FunctionalGroupPermission,
};
use hup_table::{unwrap_app_policies, AppPolicies, AppPolicyEntry, PolicyTable};

/// Compute per-application pending-permission records for every app whose
/// permissions diverge between the update and the snapshot. Predefined
/// sections are compared only through the apps referencing them.
pub fn check_permissions_changes(
    update: &PolicyTable,
    snapshot: &PolicyTable,
) -> Vec<AppPermissions> {
    // Resolve "app": "default"-style references to actual group sets on
    // both sides, so the comparison sees real memberships.
    let mut update_apps = update.policy_table.app_policies.clone();
    unwrap_app_policies(&mut update_apps);
    let mut snapshot_apps = snapshot.policy_table.app_policies.clone();
    unwrap_app_policies(&mut snapshot_apps);

    let mut changes = Vec::new();

    for (app, entry) in &update_apps {
        let app_id = AppId::new(app.as_str());
        if app_id.is_reserved() {
            continue;
        }

        match entry {
            AppPolicyEntry::Revoked => {
                let previous = concrete_groups(&snapshot_apps, app);
                let mut record = AppPermissions::new(app_id);
                record.revoked = true;
                record.group_permissions =
                    consent_bearing_permissions(snapshot, &previous, ConsentState::Undefined);
                tracing::info!(app = %app, "application revoked by policy update");
                changes.push(record);
            }
            AppPolicyEntry::Policy(policy) => {
                let previous = concrete_groups(&snapshot_apps, app);
                let is_new = !snapshot_apps.contains_key(app.as_str());

                let added: Vec<&String> = policy
                    .groups
                    .iter()
                    .filter(|g| !previous.contains(*g))
                    .collect();
                let revoked: Vec<String> = previous
                    .iter()
                    .filter(|g| !policy.groups.contains(*g))
                    .cloned()
                    .collect();

                let previous_priority = snapshot_apps
                    .get(app.as_str())
                    .and_then(AppPolicyEntry::as_policy)
                    .map(|p| p.priority);
                let priority_changed =
                    !is_new && previous_priority.map_or(true, |p| p != policy.priority);

                if added.is_empty() && revoked.is_empty() && !priority_changed && !is_new {
                    continue;
                }

                // A newly granted group with a consent prompt means the
                // user has an outstanding decision.
                let consent_needed = added.iter().any(|name| {
                    update
                        .policy_table
                        .functional_groupings
                        .get(name.as_str())
                        .map_or(false, |g| !g.is_auto_allowed())
                });

                let mut record = AppPermissions::new(app_id);
                record.consent_needed = consent_needed;
                record.priority = Some(policy.priority);
                record.group_permissions =
                    consent_bearing_permissions(snapshot, &revoked, ConsentState::Undefined);

                tracing::debug!(
                    app = %app,
                    added = added.len(),
                    revoked = revoked.len(),
                    priority_changed,
                    "application permissions diverged"
                );
                changes.push(record);
            }
            // A reference that survived unwrapping dangles; validation
            // reports those, the diff just skips them.
            AppPolicyEntry::Reference(_) => {}
        }
    }

    changes
}

/// Group names of a concrete (post-unwrap) app entry; empty when the app
/// is absent or revoked.
fn concrete_groups(apps: &AppPolicies, app: &str) -> Vec<String> {
    apps.get(app)
        .and_then(AppPolicyEntry::as_policy)
        .map(|policy| policy.groups.clone())
        .unwrap_or_default()
}

/// Permission records for the consent-bearing subset of the named groups,
/// resolved against the given table's groupings.
fn consent_bearing_permissions(
    table: &PolicyTable,
    group_names: &[String],
    state: ConsentState,
) -> Vec<FunctionalGroupPermission> {
    group_names
        .iter()
        .filter_map(|name| {
            let grouping = table.policy_table.functional_groupings.get(name.as_str())?;
            if grouping.is_auto_allowed() {
                return None;
            }
            Some(FunctionalGroupPermission {
                group_name: name.clone(),
                group_alias: grouping.user_consent_prompt.clone(),
                group_id: FunctionalGroupId::from_name(name),
                state,
            })
        })
        .collect()
}
