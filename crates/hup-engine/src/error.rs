//! # Engine Errors
//!
//! Internal error taxonomy of the update pipeline. Public orchestrator
//! operations never surface these — every entry point returns a success
//! indicator or an empty value, and failures are logged where they occur.

use thiserror::Error;

use hup_table::{ParseError, ValidationError};

/// Why an incoming update payload was rejected.
#[derive(Error, Debug)]
pub enum UpdateError {
    /// The payload could not be parsed into a table candidate.
    #[error("update rejected: {0}")]
    Parse(#[from] ParseError),

    /// The candidate table failed `PT_UPDATE` validation.
    #[error("update rejected: {0}")]
    Validation(#[from] ValidationError),

    /// The cache could not produce the pre-update snapshot.
    #[error("failed to create snapshot of policy table")]
    Snapshot,

    /// The cache refused to apply the validated update.
    #[error("unsuccessful save of updated policy table")]
    Apply,
}
