//! # Application Policies
//!
//! Per-application policy entries. An entry is either a concrete policy,
//! a string reference to one of the predefined sections (`"1234":
//! "default"` assigns the default policy to app 1234), or `null` for an
//! application revoked by the policy server.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use hup_core::Priority;

use crate::groupings::HmiLevel;

/// Concrete policy of one application (or predefined section).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppPolicy {
    /// Functional groups the application is a member of.
    pub groups: Vec<String>,
    /// Notification priority class.
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nicknames: Option<Vec<String>>,
    #[serde(default, rename = "AppHMIType", skip_serializing_if = "Option::is_none")]
    pub app_hmi_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_hmi: Option<HmiLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_context: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steal_focus: Option<bool>,
    #[serde(default, rename = "RequestType", skip_serializing_if = "Option::is_none")]
    pub request_types: Option<Vec<String>>,
}

/// One entry of the app-policies section.
///
/// Serialized untagged: a JSON string is a reference to a predefined
/// section, an object is a concrete policy, `null` marks the application
/// revoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AppPolicyEntry {
    /// `"<app>": "default"` — use the named predefined section.
    Reference(String),
    /// Full policy object.
    Policy(AppPolicy),
    /// `null` — the application is revoked.
    Revoked,
}

impl AppPolicyEntry {
    /// The concrete policy, if this entry carries one.
    pub fn as_policy(&self) -> Option<&AppPolicy> {
        match self {
            AppPolicyEntry::Policy(policy) => Some(policy),
            _ => None,
        }
    }

    pub fn is_revoked(&self) -> bool {
        matches!(self, AppPolicyEntry::Revoked)
    }

    /// Whether this entry references the given predefined section.
    pub fn references(&self, section: &str) -> bool {
        matches!(self, AppPolicyEntry::Reference(target) if target == section)
    }
}

/// App id (or predefined section name) → policy entry.
pub type AppPolicies = BTreeMap<String, AppPolicyEntry>;

/// Replace string-reference entries with the content of their target
/// section, so later comparisons see actual group sets instead of
/// indirections. Entries whose target is missing or not concrete are left
/// untouched; validation reports those separately.
pub fn unwrap_app_policies(apps: &mut AppPolicies) {
    let sections: BTreeMap<String, AppPolicy> = apps
        .iter()
        .filter_map(|(name, entry)| entry.as_policy().map(|p| (name.clone(), p.clone())))
        .collect();

    for entry in apps.values_mut() {
        if let AppPolicyEntry::Reference(target) = entry {
            if let Some(section) = sections.get(target.as_str()) {
                *entry = AppPolicyEntry::Policy(section.clone());
            }
        }
    }
}
