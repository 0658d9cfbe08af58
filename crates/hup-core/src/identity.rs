//! # Domain Identity Newtypes
//!
//! Newtype wrappers for the identifiers flowing through the policy stack.
//! These prevent accidental identifier confusion — you cannot pass a
//! `DeviceId` where an `AppId` is expected.
//!
//! Application and device ids are opaque strings assigned by the transport
//! layer. Functional-group ids are derived deterministically from the group
//! name, so the same table always yields the same ids.

use serde::{Deserialize, Serialize};

/// Reserved app-policy entry holding the default permission set.
pub const DEFAULT_POLICY_ID: &str = "default";

/// Reserved app-policy entry applied before the user has granted data consent.
pub const PRE_DATA_CONSENT_ID: &str = "pre_DataConsent";

/// Reserved app-policy entry describing device-scoped permissions.
pub const DEVICE_POLICY_ID: &str = "device";

/// Unique identifier for a registered mobile application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AppId(pub String);

/// Unique identifier for a connected device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(pub String);

/// Stable identifier for a functional group, derived from the group name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FunctionalGroupId(pub i32);

impl AppId {
    /// Wrap a transport-assigned application id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The reserved `default` policy id.
    pub fn default_policy() -> Self {
        Self(DEFAULT_POLICY_ID.to_string())
    }

    /// The reserved `pre_DataConsent` policy id.
    pub fn pre_data_consent() -> Self {
        Self(PRE_DATA_CONSENT_ID.to_string())
    }

    /// Access the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this id names one of the reserved policy sections rather
    /// than a concrete application.
    pub fn is_reserved(&self) -> bool {
        matches!(
            self.0.as_str(),
            DEFAULT_POLICY_ID | PRE_DATA_CONSENT_ID | DEVICE_POLICY_ID
        )
    }
}

impl DeviceId {
    /// Wrap a transport-assigned device id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Access the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FunctionalGroupId {
    /// Derive the stable id for a functional group from its name (djb2a).
    ///
    /// The id only has to be stable for the lifetime of a table and unique
    /// across the handful of groups a table carries; it is recomputed from
    /// the name whenever a new table is applied.
    pub fn from_name(name: &str) -> Self {
        let mut hash: u32 = 5381;
        for byte in name.as_bytes() {
            hash = hash.wrapping_mul(33) ^ u32::from(*byte);
        }
        Self(hash as i32)
    }
}

impl std::fmt::Display for AppId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for FunctionalGroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "group:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_id_is_deterministic() {
        let a = FunctionalGroupId::from_name("Location-1");
        let b = FunctionalGroupId::from_name("Location-1");
        assert_eq!(a, b);
    }

    #[test]
    fn test_group_id_differs_by_name() {
        let a = FunctionalGroupId::from_name("Location-1");
        let b = FunctionalGroupId::from_name("Notifications");
        assert_ne!(a, b);
    }

    #[test]
    fn test_reserved_ids() {
        assert!(AppId::default_policy().is_reserved());
        assert!(AppId::pre_data_consent().is_reserved());
        assert!(AppId::new("device").is_reserved());
        assert!(!AppId::new("1234").is_reserved());
    }

    #[test]
    fn test_display_is_raw() {
        assert_eq!(AppId::new("1234").to_string(), "1234");
        assert_eq!(DeviceId::new("XYZ").to_string(), "XYZ");
    }
}
