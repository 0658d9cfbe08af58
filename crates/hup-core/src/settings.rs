//! # Engine Bootstrap Settings
//!
//! Settings handed to the policy engine at initialization time. The values
//! that drive runtime behavior (retry sequence, trigger limits) live in the
//! policy table itself, not here.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Process-level settings for the policy engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySettings {
    /// Directory the cache and transport layer use for table files.
    /// Must exist and be readable/writable before initialization succeeds.
    pub app_storage_folder: PathBuf,
}

impl PolicySettings {
    pub fn new(app_storage_folder: impl Into<PathBuf>) -> Self {
        Self {
            app_storage_folder: app_storage_folder.into(),
        }
    }

    pub fn app_storage_folder(&self) -> &Path {
        &self.app_storage_folder
    }
}
