//! # hup-core — Foundational Types
//!
//! Shared value types for the head-unit policy stack. Everything in this
//! crate is a plain datum: identifier newtypes, consent states, permission
//! records, functional-group tiers, and the day-granularity clock used by
//! the exchange triggers. No I/O, no locks, no policy logic.
//!
//! ## Modules
//!
//! - **identity** (`identity.rs`): `AppId`, `DeviceId`, `FunctionalGroupId`
//!   newtypes and the reserved policy-entry ids.
//! - **consent** (`consent.rs`): `ConsentState`, `DeviceConsent`,
//!   `Priority`, `FunctionalGroupPermission`, `AppPermissions`,
//!   `PermissionConsent`.
//! - **groups** (`groups.rs`): functional-group tier partition
//!   (`FunctionalGroupTypes`) and the id → (alias, name) catalogue.
//! - **temporal** (`temporal.rs`): days-since-epoch helpers for the
//!   calendar-day exchange trigger.
//! - **settings** (`settings.rs`): engine bootstrap settings.

pub mod consent;
pub mod groups;
pub mod identity;
pub mod settings;
pub mod temporal;

// ─── Identity re-exports ────────────────────────────────────────────

pub use identity::{
    AppId, DeviceId, FunctionalGroupId, DEFAULT_POLICY_ID, DEVICE_POLICY_ID, PRE_DATA_CONSENT_ID,
};

// ─── Consent re-exports ─────────────────────────────────────────────

pub use consent::{
    AppPermissions, ConsentState, DeviceConsent, FunctionalGroupPermission, PermissionConsent,
    Priority,
};

// ─── Group re-exports ───────────────────────────────────────────────

pub use groups::{FunctionalGroupName, FunctionalGroupNames, FunctionalGroupTypes, GroupType};

// ─── Settings re-exports ────────────────────────────────────────────

pub use settings::PolicySettings;
