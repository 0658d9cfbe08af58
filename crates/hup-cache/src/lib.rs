//! # hup-cache — Policy Cache Boundary
//!
//! The engine never touches storage directly; it talks to a [`PolicyCache`]
//! collaborator that owns the current policy table and the exchange
//! counters. Richer deployments back this trait with durable storage; the
//! bundled [`InMemoryCache`] is a complete reference implementation used by
//! the engine's tests and by embedders that do not need persistence.
//!
//! ## Contract notes
//!
//! - Queries degrade, they do not fail: a cache without a table answers
//!   `None`/`false`/empty, and the engine proceeds with no permissions.
//! - `apply_update` is atomic from the engine's perspective: it either
//!   swaps the whole table in or leaves the previous one untouched.
//! - The counter queries (`*_before_exchange`) use decrement-and-compare
//!   semantics: each returns the remaining amount, saturating at zero,
//!   measured against the limits of the current table.

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

use hup_core::{
    AppId, DeviceId, FunctionalGroupNames, FunctionalGroupTypes, Priority,
};
use hup_table::{HmiLevel, ParseError, PolicyTable, ValidationError};

pub mod memory;

pub use memory::InMemoryCache;

/// Error initializing or resetting a cache from a preloaded file.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The preloaded file could not be read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The preloaded file is not a well-formed table.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The preloaded file is not a valid preloaded table.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// The storage collaborator owning the policy table and its counters.
pub trait PolicyCache: Send + Sync {
    /// Load the preloaded table from disk and make it current.
    fn init(&self, preloaded_file: &Path) -> Result<(), CacheError>;

    /// Discard all state and re-initialize from the preloaded file.
    fn reset(&self, preloaded_file: &Path) -> bool;

    /// Whether the current table is still the preloaded one.
    fn is_preloaded(&self) -> bool;

    /// A copy of the current table tagged `PT_SNAPSHOT`, or `None` when no
    /// table is loaded.
    fn generate_snapshot(&self) -> Option<PolicyTable>;

    /// Atomically replace the current table with a validated update.
    /// Resets the exchange counters on success.
    fn apply_update(&self, update: &PolicyTable) -> bool;

    /// Group membership of an application partitioned by tier, resolving
    /// string-reference entries. `None` when the table or the app entry is
    /// missing.
    fn get_permissions_for_app(
        &self,
        device_id: &DeviceId,
        app_id: &AppId,
    ) -> Option<FunctionalGroupTypes>;

    /// Catalogue of all groups in the current table, keyed by id.
    fn get_functional_group_names(&self) -> Option<FunctionalGroupNames>;

    /// HMI types of every concrete application entry that declares them.
    fn hmi_app_types(&self) -> BTreeMap<AppId, Vec<String>>;

    /// Whether the application is assigned the `default` policy.
    fn is_default_policy(&self, app_id: &AppId) -> bool;

    /// Whether the application is assigned the `pre_DataConsent` policy.
    fn is_predata_policy(&self, app_id: &AppId) -> bool;

    /// Whether the application has any entry in the current table.
    fn is_application_represented(&self, app_id: &AppId) -> bool;

    /// Whether the application's entry is revoked.
    fn is_application_revoked(&self, app_id: &AppId) -> bool;

    /// Assign the `default` policy to the application.
    fn set_default_policy(&self, app_id: &AppId) -> bool;

    /// Priority of the application's (resolved) policy.
    fn priority(&self, app_id: &AppId) -> Option<Priority>;

    /// Default HMI level of the application's (resolved) policy.
    fn default_hmi(&self, app_id: &AppId) -> Option<HmiLevel>;

    /// Nicknames and HMI types of the application, for registration.
    fn initial_app_data(&self, app_id: &AppId) -> Option<(Vec<String>, Vec<String>)>;

    fn can_app_keep_context(&self, app_id: &AppId) -> bool;

    fn can_app_steal_focus(&self, app_id: &AppId) -> bool;

    /// Module certificate from the current table.
    fn certificate(&self) -> Option<String>;

    /// Endpoint URLs configured for a service type.
    fn service_urls(&self, service_type: &str) -> Vec<String>;

    /// Ignition cycles remaining before an exchange is due.
    fn ignition_cycles_before_exchange(&self) -> u32;

    /// Count one ignition cycle against the limit.
    fn increment_ignition_cycles(&self);

    /// Days remaining before an exchange is due, given today's
    /// days-since-epoch count.
    fn days_before_exchange(&self, current_day: u32) -> u32;

    /// Kilometers remaining before an exchange is due, given the current
    /// odometer value.
    fn kilometers_before_exchange(&self, current_km: u32) -> u32;

    /// Seconds to wait for a response to one update request.
    fn timeout_response(&self) -> u32;

    /// Per-attempt delays of the retry sequence, in seconds.
    fn seconds_between_retries(&self) -> Vec<u32>;

    /// Persist the update-required flag.
    fn save_update_required(&self, required: bool);

    /// The persisted update-required flag.
    fn update_required(&self) -> bool;
}
