//! # Type-Tagged Validation
//!
//! Structural rules a table must satisfy before the engine accepts it.
//! Which rules apply depends on the table's type tag: an update from the
//! server must not claim to be preloaded, a preloaded file must, and a
//! snapshot only has to be internally consistent.

use thiserror::Error;

use hup_core::{DEFAULT_POLICY_ID, DEVICE_POLICY_ID, PRE_DATA_CONSENT_ID};

use crate::app_policies::AppPolicyEntry;
use crate::table::{PolicyTable, PolicyTableType};

/// Structural violation found in a policy table.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// An app-policy entry names a functional group that does not exist.
    #[error("app policy {app:?} references unknown functional group {group:?}")]
    UnknownGroupReference {
        /// The offending app-policy entry.
        app: String,
        /// The missing group name.
        group: String,
    },

    /// A string-reference entry points at a missing or non-concrete section.
    #[error("app policy {app:?} references section {target:?} which is not a concrete policy")]
    UnresolvedReference { app: String, target: String },

    /// A string-reference entry points at something other than a
    /// predefined section.
    #[error("app policy {app:?} may only reference predefined sections, not {target:?}")]
    ForbiddenReference { app: String, target: String },

    /// The `default` section is missing or not a concrete policy.
    #[error("app policies must contain a concrete `default` section")]
    MissingDefaultEntry,

    /// An update from the server claims to be a preloaded table.
    #[error("update table carries preloaded_pt = true")]
    PreloadedFlagOnUpdate,

    /// A preloaded file does not identify itself as preloaded.
    #[error("preloaded table must carry preloaded_pt = true")]
    PreloadedFlagMissing,
}

/// Validate a table against the rules of its type tag.
pub fn validate(table: &PolicyTable) -> Result<(), ValidationError> {
    let data = &table.policy_table;

    match table.table_type() {
        PolicyTableType::Update => {
            if data.module_config.preloaded_pt == Some(true) {
                return Err(ValidationError::PreloadedFlagOnUpdate);
            }
        }
        PolicyTableType::Preloaded => {
            if data.module_config.preloaded_pt != Some(true) {
                return Err(ValidationError::PreloadedFlagMissing);
            }
        }
        PolicyTableType::Snapshot => {}
    }

    match data.app_policies.get(DEFAULT_POLICY_ID) {
        Some(AppPolicyEntry::Policy(_)) => {}
        _ => return Err(ValidationError::MissingDefaultEntry),
    }

    for (app, entry) in &data.app_policies {
        match entry {
            AppPolicyEntry::Policy(policy) => {
                for group in &policy.groups {
                    if !data.functional_groupings.contains_key(group) {
                        return Err(ValidationError::UnknownGroupReference {
                            app: app.clone(),
                            group: group.clone(),
                        });
                    }
                }
            }
            AppPolicyEntry::Reference(target) => {
                if target != DEFAULT_POLICY_ID
                    && target != PRE_DATA_CONSENT_ID
                    && target != DEVICE_POLICY_ID
                {
                    return Err(ValidationError::ForbiddenReference {
                        app: app.clone(),
                        target: target.clone(),
                    });
                }
                match data.app_policies.get(target.as_str()) {
                    Some(AppPolicyEntry::Policy(_)) => {}
                    _ => {
                        return Err(ValidationError::UnresolvedReference {
                            app: app.clone(),
                            target: target.clone(),
                        })
                    }
                }
            }
            AppPolicyEntry::Revoked => {}
        }
    }

    Ok(())
}
