//! # Module Configuration
//!
//! Head-unit-wide configuration carried by the policy table: exchange
//! trigger limits, the retry schedule, service endpoints, the module
//! certificate, and vehicle metadata.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Module-wide configuration section of the policy table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Set on tables shipped with the head unit; must be absent/false on
    /// updates received from the policy server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preloaded_pt: Option<bool>,
    /// Ignition cycles between policy-table exchanges.
    pub exchange_after_x_ignition_cycles: u32,
    /// Kilometers driven between policy-table exchanges.
    pub exchange_after_x_kilometers: u32,
    /// Calendar days between policy-table exchanges.
    pub exchange_after_x_days: u32,
    /// Seconds the head unit waits for a response to one update request.
    pub timeout_after_x_seconds: u32,
    /// Per-attempt delays of the retry sequence, in seconds.
    pub seconds_between_retries: Vec<u32>,
    /// Service type → endpoint label → URLs.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub endpoints: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    /// Notification rate limits keyed by priority class name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub notifications_per_minute_by_priority: BTreeMap<String, u32>,
    /// Module certificate used by the transport layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_make: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_year: Option<String>,
}

impl ModuleConfig {
    /// All URLs configured for a service type, in endpoint-label order.
    pub fn service_urls(&self, service_type: &str) -> Vec<String> {
        self.endpoints
            .get(service_type)
            .map(|labels| labels.values().flatten().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_parses() {
        let json = r#"{
            "exchange_after_x_ignition_cycles": 100,
            "exchange_after_x_kilometers": 1800,
            "exchange_after_x_days": 30,
            "timeout_after_x_seconds": 60,
            "seconds_between_retries": [1, 5, 25, 125, 625]
        }"#;
        let config: ModuleConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.exchange_after_x_days, 30);
        assert_eq!(config.seconds_between_retries.len(), 5);
        assert!(config.preloaded_pt.is_none());
        assert!(config.certificate.is_none());
    }

    #[test]
    fn test_service_urls_flatten_in_label_order() {
        let json = r#"{
            "exchange_after_x_ignition_cycles": 100,
            "exchange_after_x_kilometers": 1800,
            "exchange_after_x_days": 30,
            "timeout_after_x_seconds": 60,
            "seconds_between_retries": [],
            "endpoints": {
                "0x07": {
                    "default": ["http://policy.example/api/v1"],
                    "fallback": ["http://backup.example/api/v1"]
                }
            }
        }"#;
        let config: ModuleConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            config.service_urls("0x07"),
            vec![
                "http://policy.example/api/v1".to_string(),
                "http://backup.example/api/v1".to_string()
            ]
        );
        assert!(config.service_urls("0x04").is_empty());
    }
}
