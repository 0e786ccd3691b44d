//! Storage layer configuration.
//!
//! Backend endpoints and credentials are not configured here: they belong
//! to each registered drive and are immutable for its lifetime. This
//! section only carries the defaults a drive inherits when its own options
//! leave them out.

use serde::{Deserialize, Serialize};

use crate::types::{DuplicatePolicy, FolderNameStyle};

/// Top-level storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Duplicate-folder policy for drives registered without one.
    #[serde(default)]
    pub default_duplicate_policy: DuplicatePolicy,
    /// Folder name style for drives registered without one.
    #[serde(default)]
    pub default_name_style: FolderNameStyle,
    /// Timeout for a single backend HTTP round trip, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Registry backend: `"postgres"` or `"memory"`.
    #[serde(default = "default_registry")]
    pub registry: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            default_duplicate_policy: DuplicatePolicy::default(),
            default_name_style: FolderNameStyle::default(),
            request_timeout_seconds: default_request_timeout(),
            registry: default_registry(),
        }
    }
}

fn default_request_timeout() -> u64 {
    30
}

fn default_registry() -> String {
    "postgres".to_string()
}
