//! # Functional-Group Tiers
//!
//! The cache answers a per-application permission query with the group ids
//! partitioned into three tiers: the application's own membership
//! (`general`), the `default` section, and the `pre_DataConsent` section.
//! Resolution picks a tier (or excludes one) based on how the application
//! is classified.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::identity::FunctionalGroupId;

/// Tier selector for a functional-group query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupType {
    /// Groups the queried application is a member of.
    General,
    /// Groups of the `default` policy section.
    Default,
    /// Groups of the `pre_DataConsent` policy section.
    PreDataConsented,
}

/// Group ids of one application, partitioned by tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionalGroupTypes {
    pub general: Vec<FunctionalGroupId>,
    pub default_policy: Vec<FunctionalGroupId>,
    pub pre_data_consented: Vec<FunctionalGroupId>,
}

impl FunctionalGroupTypes {
    /// The ids of one tier.
    pub fn for_type(&self, group_type: GroupType) -> &[FunctionalGroupId] {
        match group_type {
            GroupType::General => &self.general,
            GroupType::Default => &self.default_policy,
            GroupType::PreDataConsented => &self.pre_data_consented,
        }
    }
}

/// Display data of one functional group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionalGroupName {
    /// User-facing alias (consent prompt). `None`/empty ⇒ auto-allowed.
    pub alias: Option<String>,
    /// Group name as keyed in the functional groupings table.
    pub name: String,
}

impl FunctionalGroupName {
    /// Whether the group carries no consent prompt and is auto-allowed.
    pub fn is_auto_allowed(&self) -> bool {
        self.alias.as_deref().map_or(true, str::is_empty)
    }
}

/// Catalogue of all groups in the current table, keyed by id.
pub type FunctionalGroupNames = BTreeMap<FunctionalGroupId, FunctionalGroupName>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_type_selects_tier() {
        let types = FunctionalGroupTypes {
            general: vec![FunctionalGroupId(1)],
            default_policy: vec![FunctionalGroupId(2)],
            pre_data_consented: vec![FunctionalGroupId(3)],
        };
        assert_eq!(types.for_type(GroupType::General), &[FunctionalGroupId(1)]);
        assert_eq!(types.for_type(GroupType::Default), &[FunctionalGroupId(2)]);
        assert_eq!(
            types.for_type(GroupType::PreDataConsented),
            &[FunctionalGroupId(3)]
        );
    }

    #[test]
    fn test_auto_allowed_when_alias_missing_or_empty() {
        let unnamed = FunctionalGroupName {
            alias: None,
            name: "Base-4".to_string(),
        };
        let blank = FunctionalGroupName {
            alias: Some(String::new()),
            name: "Base-4".to_string(),
        };
        let prompted = FunctionalGroupName {
            alias: Some("Location".to_string()),
            name: "Location-1".to_string(),
        };
        assert!(unnamed.is_auto_allowed());
        assert!(blank.is_auto_allowed());
        assert!(!prompted.is_auto_allowed());
    }
}
