//! # In-Memory Cache
//!
//! Reference [`PolicyCache`] implementation holding the table and the
//! exchange counters behind one mutex. Suitable for tests and for
//! embedders without a persistence requirement; a durable deployment
//! implements the same trait over its own storage.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use hup_core::{
    temporal, AppId, DeviceId, FunctionalGroupId, FunctionalGroupName, FunctionalGroupNames,
    FunctionalGroupTypes, Priority, DEFAULT_POLICY_ID, PRE_DATA_CONSENT_ID,
};
use hup_table::{
    parse_payload, AppPolicy, AppPolicyEntry, HmiLevel, PayloadFormat, PolicyTable,
    PolicyTableType,
};

use crate::{CacheError, PolicyCache};

/// Response timeout applied when no table is loaded yet.
const DEFAULT_TIMEOUT_SECS: u32 = 60;

#[derive(Debug, Default)]
struct CacheState {
    table: Option<PolicyTable>,
    update_required: bool,
    /// Ignition cycles counted since the last successful exchange.
    ignition_cycles: u32,
    /// Days-since-epoch at the last successful exchange.
    exchanged_at_day: u32,
    /// Odometer reading at the last successful exchange.
    exchanged_at_km: u32,
    /// Most recent odometer reading seen by the kilometer counter.
    last_seen_km: u32,
}

/// Thread-safe in-memory policy cache.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    state: Mutex<CacheState>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the counter values of a successful exchange reported by the
    /// surrounding system (current day and odometer reading).
    pub fn set_counters_passed_for_successful_update(&self, current_day: u32, current_km: u32) {
        let mut state = self.lock();
        state.exchanged_at_day = current_day;
        state.exchanged_at_km = current_km;
        state.ignition_cycles = 0;
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn load_preloaded(path: &Path) -> Result<PolicyTable, CacheError> {
        let bytes = std::fs::read(path)?;
        let mut table = parse_payload(&bytes, PayloadFormat::HmiDecrypted)?;
        table.set_table_type(PolicyTableType::Preloaded);
        table.validate()?;
        Ok(table)
    }
}

/// Resolve an entry to its concrete policy, following one level of
/// string reference.
fn resolve_policy<'a>(table: &'a PolicyTable, app_id: &str) -> Option<&'a AppPolicy> {
    match table.policy_table.app_policies.get(app_id)? {
        AppPolicyEntry::Policy(policy) => Some(policy),
        AppPolicyEntry::Reference(target) => table
            .policy_table
            .app_policies
            .get(target.as_str())
            .and_then(AppPolicyEntry::as_policy),
        AppPolicyEntry::Revoked => None,
    }
}

/// Group names of a section, mapped to ids, skipping names absent from
/// the groupings table.
fn group_ids(table: &PolicyTable, section: &str) -> Vec<FunctionalGroupId> {
    resolve_policy(table, section)
        .map(|policy| {
            policy
                .groups
                .iter()
                .filter(|name| table.policy_table.functional_groupings.contains_key(*name))
                .map(|name| FunctionalGroupId::from_name(name))
                .collect()
        })
        .unwrap_or_default()
}

impl PolicyCache for InMemoryCache {
    fn init(&self, preloaded_file: &Path) -> Result<(), CacheError> {
        let table = Self::load_preloaded(preloaded_file)?;
        let mut state = self.lock();
        state.table = Some(table);
        Ok(())
    }

    fn reset(&self, preloaded_file: &Path) -> bool {
        match Self::load_preloaded(preloaded_file) {
            Ok(table) => {
                let mut state = self.lock();
                *state = CacheState {
                    table: Some(table),
                    ..CacheState::default()
                };
                true
            }
            Err(error) => {
                tracing::error!(%error, "failed to reset policy table from preloaded file");
                false
            }
        }
    }

    fn is_preloaded(&self) -> bool {
        self.lock()
            .table
            .as_ref()
            .map_or(false, |t| t.table_type() == PolicyTableType::Preloaded)
    }

    fn generate_snapshot(&self) -> Option<PolicyTable> {
        let state = self.lock();
        let mut snapshot = state.table.clone()?;
        snapshot.set_table_type(PolicyTableType::Snapshot);
        Some(snapshot)
    }

    fn apply_update(&self, update: &PolicyTable) -> bool {
        let mut state = self.lock();
        let mut table = update.clone();
        table.set_table_type(PolicyTableType::Update);
        state.table = Some(table);
        state.ignition_cycles = 0;
        state.exchanged_at_day = temporal::days_since_epoch();
        state.exchanged_at_km = state.last_seen_km;
        true
    }

    fn get_permissions_for_app(
        &self,
        _device_id: &DeviceId,
        app_id: &AppId,
    ) -> Option<FunctionalGroupTypes> {
        let state = self.lock();
        let table = state.table.as_ref()?;
        if !table.policy_table.app_policies.contains_key(app_id.as_str()) {
            return None;
        }
        Some(FunctionalGroupTypes {
            general: group_ids(table, app_id.as_str()),
            default_policy: group_ids(table, DEFAULT_POLICY_ID),
            pre_data_consented: group_ids(table, PRE_DATA_CONSENT_ID),
        })
    }

    fn get_functional_group_names(&self) -> Option<FunctionalGroupNames> {
        let state = self.lock();
        let table = state.table.as_ref()?;
        Some(
            table
                .policy_table
                .functional_groupings
                .iter()
                .map(|(name, grouping)| {
                    (
                        FunctionalGroupId::from_name(name),
                        FunctionalGroupName {
                            alias: grouping.user_consent_prompt.clone(),
                            name: name.clone(),
                        },
                    )
                })
                .collect(),
        )
    }

    fn hmi_app_types(&self) -> BTreeMap<AppId, Vec<String>> {
        let state = self.lock();
        let Some(table) = state.table.as_ref() else {
            return BTreeMap::new();
        };
        table
            .policy_table
            .app_policies
            .iter()
            .filter(|(app, _)| !AppId::new(app.as_str()).is_reserved())
            .filter_map(|(app, entry)| {
                let types = entry.as_policy()?.app_hmi_types.clone()?;
                (!types.is_empty()).then(|| (AppId::new(app.as_str()), types))
            })
            .collect()
    }

    fn is_default_policy(&self, app_id: &AppId) -> bool {
        let state = self.lock();
        state.table.as_ref().map_or(false, |table| {
            table
                .policy_table
                .app_policies
                .get(app_id.as_str())
                .map_or(false, |entry| entry.references(DEFAULT_POLICY_ID))
        })
    }

    fn is_predata_policy(&self, app_id: &AppId) -> bool {
        let state = self.lock();
        state.table.as_ref().map_or(false, |table| {
            table
                .policy_table
                .app_policies
                .get(app_id.as_str())
                .map_or(false, |entry| entry.references(PRE_DATA_CONSENT_ID))
        })
    }

    fn is_application_represented(&self, app_id: &AppId) -> bool {
        let state = self.lock();
        state.table.as_ref().map_or(false, |table| {
            table
                .policy_table
                .app_policies
                .contains_key(app_id.as_str())
        })
    }

    fn is_application_revoked(&self, app_id: &AppId) -> bool {
        let state = self.lock();
        state.table.as_ref().map_or(false, |table| {
            table
                .policy_table
                .app_policies
                .get(app_id.as_str())
                .map_or(false, AppPolicyEntry::is_revoked)
        })
    }

    fn set_default_policy(&self, app_id: &AppId) -> bool {
        let mut state = self.lock();
        match state.table.as_mut() {
            Some(table) => {
                table.policy_table.app_policies.insert(
                    app_id.as_str().to_string(),
                    AppPolicyEntry::Reference(DEFAULT_POLICY_ID.to_string()),
                );
                true
            }
            None => {
                tracing::warn!(app = %app_id, "no policy table; cannot assign default policy");
                false
            }
        }
    }

    fn priority(&self, app_id: &AppId) -> Option<Priority> {
        let state = self.lock();
        let table = state.table.as_ref()?;
        resolve_policy(table, app_id.as_str()).map(|policy| policy.priority)
    }

    fn default_hmi(&self, app_id: &AppId) -> Option<HmiLevel> {
        let state = self.lock();
        let table = state.table.as_ref()?;
        resolve_policy(table, app_id.as_str()).and_then(|policy| policy.default_hmi)
    }

    fn initial_app_data(&self, app_id: &AppId) -> Option<(Vec<String>, Vec<String>)> {
        let state = self.lock();
        let table = state.table.as_ref()?;
        let policy = resolve_policy(table, app_id.as_str())?;
        Some((
            policy.nicknames.clone().unwrap_or_default(),
            policy.app_hmi_types.clone().unwrap_or_default(),
        ))
    }

    fn can_app_keep_context(&self, app_id: &AppId) -> bool {
        let state = self.lock();
        state.table.as_ref().map_or(false, |table| {
            resolve_policy(table, app_id.as_str())
                .and_then(|policy| policy.keep_context)
                .unwrap_or(false)
        })
    }

    fn can_app_steal_focus(&self, app_id: &AppId) -> bool {
        let state = self.lock();
        state.table.as_ref().map_or(false, |table| {
            resolve_policy(table, app_id.as_str())
                .and_then(|policy| policy.steal_focus)
                .unwrap_or(false)
        })
    }

    fn certificate(&self) -> Option<String> {
        let state = self.lock();
        state
            .table
            .as_ref()
            .and_then(|table| table.policy_table.module_config.certificate.clone())
    }

    fn service_urls(&self, service_type: &str) -> Vec<String> {
        let state = self.lock();
        state.table.as_ref().map_or_else(Vec::new, |table| {
            table.policy_table.module_config.service_urls(service_type)
        })
    }

    fn ignition_cycles_before_exchange(&self) -> u32 {
        let state = self.lock();
        state.table.as_ref().map_or(u32::MAX, |table| {
            table
                .policy_table
                .module_config
                .exchange_after_x_ignition_cycles
                .saturating_sub(state.ignition_cycles)
        })
    }

    fn increment_ignition_cycles(&self) {
        let mut state = self.lock();
        state.ignition_cycles = state.ignition_cycles.saturating_add(1);
    }

    fn days_before_exchange(&self, current_day: u32) -> u32 {
        let state = self.lock();
        state.table.as_ref().map_or(u32::MAX, |table| {
            let elapsed = current_day.saturating_sub(state.exchanged_at_day);
            table
                .policy_table
                .module_config
                .exchange_after_x_days
                .saturating_sub(elapsed)
        })
    }

    fn kilometers_before_exchange(&self, current_km: u32) -> u32 {
        let mut state = self.lock();
        state.last_seen_km = current_km;
        state.table.as_ref().map_or(u32::MAX, |table| {
            let driven = current_km.saturating_sub(state.exchanged_at_km);
            table
                .policy_table
                .module_config
                .exchange_after_x_kilometers
                .saturating_sub(driven)
        })
    }

    fn timeout_response(&self) -> u32 {
        let state = self.lock();
        state
            .table
            .as_ref()
            .map_or(DEFAULT_TIMEOUT_SECS, |table| {
                table.policy_table.module_config.timeout_after_x_seconds
            })
    }

    fn seconds_between_retries(&self) -> Vec<u32> {
        let state = self.lock();
        state.table.as_ref().map_or_else(Vec::new, |table| {
            table
                .policy_table
                .module_config
                .seconds_between_retries
                .clone()
        })
    }

    fn save_update_required(&self, required: bool) {
        self.lock().update_required = required;
    }

    fn update_required(&self) -> bool {
        self.lock().update_required
    }
}
