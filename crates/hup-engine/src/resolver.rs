//! # Permission Resolution
//!
//! Maps an application's classification to its effective functional-group
//! permissions.
//!
//! ## Tiers
//!
//! The cache answers a permission query with group ids partitioned into
//! `general` (the app's own membership), `default`, and
//! `pre_data_consented`. Resolution first classifies the app:
//!
//! - assigned the `default` policy → every `default`-tier group is
//!   allowed outright;
//! - assigned `pre_DataConsent`, or the device lacks consent → every
//!   `pre_data_consented`-tier group is allowed outright;
//! - otherwise (specific app) → every `general`-tier group is allowed
//!   (single-OEM deployment: no per-group exclusion).
//!
//! ## Consent eligibility
//!
//! [`user_consent_for_app`] surfaces only the groups a user could be
//! asked about: groups with a consent prompt (`no_auto`), minus the tier
//! granted by the app's classification. Auto-allowed groups never appear.
//!
//! Both entry points degrade to an empty result when the cache cannot
//! answer; resolution failures are never fatal.

use hup_cache::PolicyCache;
use hup_core::{
    AppId, ConsentState, DeviceConsent, DeviceId, FunctionalGroupId, FunctionalGroupNames,
    FunctionalGroupPermission, GroupType,
};

/// Set difference by group identity, preserving the first operand's order.
pub fn exclude_same(
    first: &[FunctionalGroupId],
    second: &[FunctionalGroupId],
) -> Vec<FunctionalGroupId> {
    first
        .iter()
        .filter(|id| !second.contains(*id))
        .copied()
        .collect()
}

/// Materialize group ids into permission records with the given state.
/// Ids missing from the catalogue are skipped.
pub fn fill_group_permissions(
    ids: &[FunctionalGroupId],
    names: &FunctionalGroupNames,
    state: ConsentState,
) -> Vec<FunctionalGroupPermission> {
    ids.iter()
        .filter_map(|id| {
            names.get(id).map(|group| FunctionalGroupPermission {
                group_name: group.name.clone(),
                group_alias: group.alias.clone(),
                group_id: *id,
                state,
            })
        })
        .collect()
}

/// Effective permissions of one application on one device.
pub fn permissions_for_app(
    cache: &dyn PolicyCache,
    device_consent: DeviceConsent,
    device_id: &DeviceId,
    app_id: &AppId,
) -> Vec<FunctionalGroupPermission> {
    let (lookup_id, granted_tier) = if cache.is_default_policy(app_id) {
        (AppId::default_policy(), Some(GroupType::Default))
    } else if cache.is_predata_policy(app_id) || device_consent != DeviceConsent::Allowed {
        (AppId::pre_data_consent(), Some(GroupType::PreDataConsented))
    } else {
        (app_id.clone(), None)
    };

    let Some(group_types) = cache.get_permissions_for_app(device_id, &lookup_id) else {
        tracing::warn!(app = %app_id, "can't get permissions for application");
        return Vec::new();
    };
    let Some(group_names) = cache.get_functional_group_names() else {
        tracing::warn!("can't get functional group names");
        return Vec::new();
    };

    match granted_tier {
        // Coerced to a predefined section: the whole tier is allowed.
        Some(tier) => {
            fill_group_permissions(group_types.for_type(tier), &group_names, ConsentState::Allowed)
        }
        // Specific application: all of its own groups are allowed.
        None => fill_group_permissions(&group_types.general, &group_names, ConsentState::Allowed),
    }
}

/// Groups of one application that are eligible for an explicit user
/// consent decision.
pub fn user_consent_for_app(
    cache: &dyn PolicyCache,
    device_id: &DeviceId,
    app_id: &AppId,
) -> Vec<FunctionalGroupPermission> {
    let Some(group_types) = cache.get_permissions_for_app(device_id, app_id) else {
        tracing::warn!(app = %app_id, "can't get user permissions for application");
        return Vec::new();
    };
    let Some(group_names) = cache.get_functional_group_names() else {
        tracing::warn!("can't get functional group names");
        return Vec::new();
    };

    // Groups without a consent prompt are granted automatically and can
    // never be offered for consent.
    let auto_allowed: Vec<FunctionalGroupId> = group_names
        .iter()
        .filter(|(_, group)| group.is_auto_allowed())
        .map(|(id, _)| *id)
        .collect();

    let no_auto = exclude_same(&group_types.general, &auto_allowed);

    let eligible = if cache.is_default_policy(app_id) {
        exclude_same(&no_auto, &group_types.default_policy)
    } else if cache.is_predata_policy(app_id) {
        exclude_same(&no_auto, &group_types.pre_data_consented)
    } else {
        // Specific applications take their groups from the table itself;
        // consent eligibility is derived from the predefined tiers only.
        Vec::new()
    };

    fill_group_permissions(&eligible, &group_names, ConsentState::Allowed)
}
