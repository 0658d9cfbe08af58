//! # hup-engine — Policy Engine Core
//!
//! Orchestration and decision logic of the head-unit policy stack: when
//! the policy table must be refreshed from the remote policy server, how
//! re-requests back off over time, which functional groups an application
//! effectively holds, and whether the user still has consent decisions
//! outstanding.
//!
//! ## Components
//!
//! - **status** (`status.rs`): the update-status state machine consumed
//!   through commands and predicates.
//! - **retry** (`retry.rs`) + **timer** (`timer.rs`): cumulative-backoff
//!   retry scheduling over a background periodic timer.
//! - **triggers** (`triggers.rs`): ignition-cycle and calendar-day
//!   exchange triggers.
//! - **resolver** (`resolver.rs`): tiered permission resolution with
//!   exclusion-set arithmetic.
//! - **pending** (`pending.rs`): per-application pending-permission
//!   records and consent-diff tracking.
//! - **diff** (`diff.rs`): update-vs-snapshot permission diffing, run
//!   before an update is applied so revocations are still observable.
//! - **manager** (`manager.rs`): the [`PolicyManager`] orchestrator tying
//!   everything to the [`PolicyCache`](hup_cache::PolicyCache) and
//!   [`PolicyListener`] collaborators.
//!
//! ## Concurrency
//!
//! Three independent lock domains, never nested: application
//! registration (also covering the snapshot-diff-apply sequence of
//! `load_pt`), the pending-permission map, and the retry-sequence state.
//! The retry timer thread only requests snapshots and re-arms itself; it
//! never takes the registration lock.

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod diff;
pub mod error;
pub mod listener;
pub mod manager;
pub mod pending;
pub mod resolver;
pub mod retry;
pub mod status;
pub mod timer;
pub mod triggers;

// ─── Re-exports ─────────────────────────────────────────────────────

pub use error::UpdateError;
pub use listener::PolicyListener;
pub use manager::PolicyManager;
pub use pending::PendingPermissions;
pub use retry::RetrySequence;
pub use status::UpdateStatusManager;
pub use timer::PeriodicTimer;

/// Lock a mutex, recovering the guard if a holder panicked. The engine's
/// guarded state stays consistent across panics because every critical
/// section either fully applies its change or only reads.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
