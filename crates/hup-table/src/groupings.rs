//! # Functional Groupings
//!
//! A functional group is a named bundle of remote procedures with the HMI
//! levels (and optionally the parameters) each procedure may be invoked
//! with. The optional `user_consent_prompt` is the group's user-facing
//! alias: groups without one are granted automatically and can never be
//! revoked by the user.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// HMI level an RPC may be invoked from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HmiLevel {
    Full,
    Limited,
    Background,
    None,
}

/// Permission record of a single RPC inside a functional group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcPermission {
    /// HMI levels the RPC is allowed in.
    pub hmi_levels: Vec<HmiLevel>,
    /// Allowed parameter names; absent ⇒ all parameters allowed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<String>>,
}

/// One named bundle of permitted RPCs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionalGrouping {
    /// User-facing alias shown in the consent prompt. Absent or empty ⇒
    /// the group is auto-allowed and non-revocable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_consent_prompt: Option<String>,
    /// RPC name → permission record.
    pub rpcs: BTreeMap<String, RpcPermission>,
}

impl FunctionalGrouping {
    /// Whether the group carries no consent prompt and is auto-allowed.
    pub fn is_auto_allowed(&self) -> bool {
        self.user_consent_prompt
            .as_deref()
            .map_or(true, str::is_empty)
    }
}

/// Group name → grouping. Keyed by name; ids are derived from the names.
pub type FunctionalGroupings = BTreeMap<String, FunctionalGrouping>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hmi_level_wire_names() {
        assert_eq!(serde_json::to_string(&HmiLevel::Full).unwrap(), "\"FULL\"");
        assert_eq!(serde_json::to_string(&HmiLevel::None).unwrap(), "\"NONE\"");
    }

    #[test]
    fn test_grouping_roundtrip() {
        let json = r#"{
            "user_consent_prompt": "Location",
            "rpcs": {
                "GetVehicleData": {
                    "hmi_levels": ["FULL", "LIMITED"],
                    "parameters": ["gps", "speed"]
                }
            }
        }"#;
        let grouping: FunctionalGrouping = serde_json::from_str(json).unwrap();
        assert!(!grouping.is_auto_allowed());
        let rpc = &grouping.rpcs["GetVehicleData"];
        assert_eq!(rpc.hmi_levels, vec![HmiLevel::Full, HmiLevel::Limited]);
        assert_eq!(
            rpc.parameters.as_deref(),
            Some(&["gps".to_string(), "speed".to_string()][..])
        );
    }

    #[test]
    fn test_missing_prompt_is_auto_allowed() {
        let json = r#"{"rpcs": {"ListFiles": {"hmi_levels": ["BACKGROUND"]}}}"#;
        let grouping: FunctionalGrouping = serde_json::from_str(json).unwrap();
        assert!(grouping.is_auto_allowed());
        assert!(grouping.rpcs["ListFiles"].parameters.is_none());
    }
}
