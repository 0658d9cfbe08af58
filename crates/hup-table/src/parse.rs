//! # Payload Parsing
//!
//! One parse entry point for both transport arrangements. When the HMI
//! decrypts and unwraps update payloads, the bytes are the bare table
//! object. When updates come from the policy server unencrypted, the
//! table may arrive wrapped in a `data` envelope array whose first
//! element is the actual table.

use serde_json::Value;
use thiserror::Error;

use crate::table::{PolicyTable, PolicyTableType};

/// How update payloads reach the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    /// The HMI already decrypted and unwrapped the payload.
    HmiDecrypted,
    /// Unencrypted server payload; may carry the `data` envelope.
    ServerUnencrypted,
}

/// Error parsing an update payload into a table candidate.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The payload is not valid JSON or does not match the table shape.
    #[error("malformed policy table payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse a raw update payload into a policy table tagged `PT_UPDATE`.
///
/// For [`PayloadFormat::ServerUnencrypted`], a non-empty `data` array at
/// the root takes precedence and its first element is parsed as the
/// table; anything else falls through to parsing the whole document.
pub fn parse_payload(payload: &[u8], format: PayloadFormat) -> Result<PolicyTable, ParseError> {
    let mut table: PolicyTable = match format {
        PayloadFormat::HmiDecrypted => serde_json::from_slice(payload)?,
        PayloadFormat::ServerUnencrypted => {
            let root: Value = serde_json::from_slice(payload)?;
            match root.get("data").and_then(Value::as_array) {
                Some(data) if !data.is_empty() => serde_json::from_value(data[0].clone())?,
                _ => serde_json::from_value(root)?,
            }
        }
    };
    table.set_table_type(PolicyTableType::Update);
    Ok(table)
}
