//! # The Policy Table
//!
//! Aggregates the three sections of the versioned configuration and the
//! type tag governing which validation rules apply. The tag is not part of
//! the wire format: the same JSON shape travels as an update, a snapshot,
//! or a preloaded file, and the receiving side decides what it must be.

use serde::{Deserialize, Serialize};

use crate::app_policies::AppPolicies;
use crate::groupings::FunctionalGroupings;
use crate::module_config::ModuleConfig;
use crate::validation::{self, ValidationError};

/// Validation mode of a policy table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyTableType {
    /// Received from the policy server; the strictest rules apply.
    #[default]
    Update,
    /// Generated locally to report current state upstream.
    Snapshot,
    /// Shipped with the head unit.
    Preloaded,
}

impl std::fmt::Display for PolicyTableType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PolicyTableType::Update => "PT_UPDATE",
            PolicyTableType::Snapshot => "PT_SNAPSHOT",
            PolicyTableType::Preloaded => "PT_PRELOADED",
        })
    }
}

/// Inner sections of the policy table, as they appear on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyTableData {
    pub module_config: ModuleConfig,
    pub functional_groupings: FunctionalGroupings,
    pub app_policies: AppPolicies,
}

/// The full policy table: wire payload plus the local type tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyTable {
    pub policy_table: PolicyTableData,
    #[serde(skip)]
    table_type: PolicyTableType,
}

impl PolicyTable {
    pub fn new(data: PolicyTableData, table_type: PolicyTableType) -> Self {
        Self {
            policy_table: data,
            table_type,
        }
    }

    pub fn table_type(&self) -> PolicyTableType {
        self.table_type
    }

    /// Re-tag the table; done when a parsed payload is promoted to an
    /// update candidate or a cached table is turned into a snapshot.
    pub fn set_table_type(&mut self, table_type: PolicyTableType) {
        self.table_type = table_type;
    }

    /// Validate the table against the rules of its current type tag.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate(self)
    }

    /// Serialize to the wire shape (the type tag is not emitted).
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
