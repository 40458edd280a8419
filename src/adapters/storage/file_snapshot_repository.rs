//! File-based snapshot repository.
//!
//! Stores the whole ledger as one pretty-printed JSON document. Writes go to
//! a sibling temp file first and are renamed into place, so a crash never
//! leaves a half-written snapshot behind.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::domain::ledger::LedgerSnapshot;
use crate::ports::{SnapshotRepository, SnapshotStorageError};

/// JSON file storage for the ledger snapshot.
#[derive(Debug, Clone)]
pub struct FileSnapshotRepository {
    path: PathBuf,
}

impl FileSnapshotRepository {
    /// # Example
    /// ```ignore
    /// let repo = FileSnapshotRepository::new("./data/ledger.json");
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn ensure_parent_dir(&self) -> Result<(), SnapshotStorageError> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
                .await
                .map_err(|e| SnapshotStorageError::IoError(e.to_string())),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl SnapshotRepository for FileSnapshotRepository {
    async fn load(&self) -> Result<LedgerSnapshot, SnapshotStorageError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No snapshot file, starting empty");
            return Ok(LedgerSnapshot::default());
        }

        let json = fs::read_to_string(&self.path)
            .await
            .map_err(|e| SnapshotStorageError::IoError(e.to_string()))?;
        if json.trim().is_empty() {
            return Ok(LedgerSnapshot::default());
        }

        serde_json::from_str(&json)
            .map_err(|e| SnapshotStorageError::DeserializationFailed(e.to_string()))
    }

    async fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), SnapshotStorageError> {
        self.ensure_parent_dir().await?;

        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| SnapshotStorageError::SerializationFailed(e.to_string()))?;

        let temp = self.temp_path();
        fs::write(&temp, json)
            .await
            .map_err(|e| SnapshotStorageError::IoError(e.to_string()))?;
        fs::rename(&temp, &self.path)
            .await
            .map_err(|e| SnapshotStorageError::IoError(e.to_string()))?;

        Ok(())
    }
}
