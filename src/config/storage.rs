//! Storage configuration

use serde::Deserialize;
use std::path::PathBuf;

use super::error::ValidationError;

/// Where the ledger snapshot and event catalog live on disk
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// JSON snapshot of registrations, intents and sponsor state
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,

    /// JSON array of events accepting registrations
    #[serde(default = "default_event_catalog_path")]
    pub event_catalog_path: PathBuf,
}

impl StorageConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.snapshot_path.as_os_str().is_empty() {
            return Err(ValidationError::EmptyPath("snapshot_path"));
        }
        if self.event_catalog_path.as_os_str().is_empty() {
            return Err(ValidationError::EmptyPath("event_catalog_path"));
        }
        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            event_catalog_path: default_event_catalog_path(),
        }
    }
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("data/payments.json")
}

fn default_event_catalog_path() -> PathBuf {
    PathBuf::from("data/events.json")
}
