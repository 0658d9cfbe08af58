//! # Consent and Permission Value Types
//!
//! The records exchanged between the policy engine, its cache, and the
//! listener boundary: per-group consent states, the transient
//! `FunctionalGroupPermission` produced by permission resolution, and the
//! pending-diff record (`AppPermissions`) kept until the surrounding
//! system acknowledges a permission change.

use serde::{Deserialize, Serialize};

use crate::identity::{AppId, DeviceId, FunctionalGroupId};

/// User consent state of a single functional group for one application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsentState {
    /// The user granted the group, or it is granted by classification.
    Allowed,
    /// The user explicitly revoked the group.
    Disallowed,
    /// The user has not decided yet.
    Undefined,
}

/// User consent state of a device as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceConsent {
    /// Data exchange with the device is allowed.
    Allowed,
    /// Data exchange with the device is disallowed.
    Disallowed,
    /// The user has not been asked yet.
    NoConsent,
}

/// Notification priority class of an application policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Emergency,
    Navigation,
    Voicecom,
    Communication,
    Normal,
    None,
}

/// One functional group as seen by an application, with its consent state.
///
/// Produced transiently by permission resolution; never persisted. A group
/// without an alias has no user-facing consent prompt and is therefore
/// auto-allowed and non-revocable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionalGroupPermission {
    /// Group name as it appears in the functional groupings table.
    pub group_name: String,
    /// User-facing alias (the consent prompt). Empty/absent ⇒ auto-allowed.
    pub group_alias: Option<String>,
    /// Stable group id derived from the name.
    pub group_id: FunctionalGroupId,
    /// Current consent state.
    pub state: ConsentState,
}

impl FunctionalGroupPermission {
    /// Whether this group is granted unconditionally (no consent prompt).
    pub fn is_auto_allowed(&self) -> bool {
        self.group_alias.as_deref().map_or(true, str::is_empty)
    }
}

/// Pending permission-change record for one application.
///
/// Presence of this record in the engine's pending map means a permission
/// change was observed (by the update diff) and has not been consumed by
/// the surrounding system yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppPermissions {
    /// The application the change applies to.
    pub application_id: AppId,
    /// Unconsented groups remain; the user must be prompted.
    pub consent_needed: bool,
    /// The application itself was revoked by the update.
    pub revoked: bool,
    /// Priority after the change, when known.
    pub priority: Option<Priority>,
    /// Groups affected by the change (revoked consent-bearing groups).
    pub group_permissions: Vec<FunctionalGroupPermission>,
}

impl AppPermissions {
    /// An empty record for an application with no observed changes.
    pub fn new(application_id: AppId) -> Self {
        Self {
            application_id,
            consent_needed: false,
            revoked: false,
            priority: None,
            group_permissions: Vec::new(),
        }
    }
}

/// A user consent decision set proposed for one (device, application) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionConsent {
    pub device_id: DeviceId,
    pub policy_app_id: AppId,
    /// Where the decision came from (e.g. `"GUI"` or `"VUI"`).
    pub consent_source: String,
    pub group_permissions: Vec<FunctionalGroupPermission>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perm(alias: Option<&str>) -> FunctionalGroupPermission {
        FunctionalGroupPermission {
            group_name: "Base-4".to_string(),
            group_alias: alias.map(str::to_string),
            group_id: FunctionalGroupId::from_name("Base-4"),
            state: ConsentState::Undefined,
        }
    }

    #[test]
    fn test_missing_alias_is_auto_allowed() {
        assert!(perm(None).is_auto_allowed());
    }

    #[test]
    fn test_empty_alias_is_auto_allowed() {
        assert!(perm(Some("")).is_auto_allowed());
    }

    #[test]
    fn test_alias_disables_auto_allow() {
        assert!(!perm(Some("Location")).is_auto_allowed());
    }

    #[test]
    fn test_priority_serializes_screaming() {
        let json = serde_json::to_string(&Priority::Voicecom).unwrap();
        assert_eq!(json, "\"VOICECOM\"");
    }

    #[test]
    fn test_new_app_permissions_is_clean() {
        let rec = AppPermissions::new(AppId::new("1234"));
        assert!(!rec.consent_needed);
        assert!(!rec.revoked);
        assert!(rec.group_permissions.is_empty());
    }
}
