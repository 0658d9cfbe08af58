//! # hup-table — Policy Table Model
//!
//! The versioned configuration mediating what a connected application may
//! do: functional groupings (named bundles of permitted RPCs), per-app
//! policy entries (classification into `default`, `pre_DataConsent`, or a
//! concrete policy), and module configuration (exchange triggers, retry
//! schedule, certificate, vehicle metadata).
//!
//! ## Lifecycle
//!
//! A table is constructed from a parsed payload ([`parse::parse_payload`]),
//! tagged with the validation mode it must satisfy
//! ([`table::PolicyTableType`]), validated, and atomically handed to the
//! cache. Superseded tables are discarded.
//!
//! ## Invariant
//!
//! Every functional-group reference used by an app-policy entry must exist
//! in the groupings table; validation rejects the table otherwise.

pub mod app_policies;
pub mod groupings;
pub mod module_config;
pub mod parse;
pub mod table;
pub mod validation;

// ─── Model re-exports ───────────────────────────────────────────────

pub use app_policies::{unwrap_app_policies, AppPolicies, AppPolicy, AppPolicyEntry};
pub use groupings::{FunctionalGrouping, FunctionalGroupings, HmiLevel, RpcPermission};
pub use module_config::ModuleConfig;
pub use table::{PolicyTable, PolicyTableData, PolicyTableType};

// ─── Parse / validation re-exports ──────────────────────────────────

pub use parse::{parse_payload, ParseError, PayloadFormat};
pub use validation::ValidationError;
