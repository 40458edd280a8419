//! In-memory snapshot repository (testing/development).

use async_trait::async_trait;
use std::sync::Mutex;

use crate::domain::ledger::LedgerSnapshot;
use crate::ports::{SnapshotRepository, SnapshotStorageError};

/// Keeps the last saved snapshot in memory.
#[derive(Debug, Default)]
pub struct InMemorySnapshotRepository {
    stored: Mutex<Option<LedgerSnapshot>>,
    saves: Mutex<usize>,
    fail_saves: Mutex<bool>,
}

impl InMemorySnapshotRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with `snapshot` already stored.
    pub fn with_snapshot(snapshot: LedgerSnapshot) -> Self {
        Self {
            stored: Mutex::new(Some(snapshot)),
            ..Self::default()
        }
    }

    /// Makes subsequent saves fail with an IO error.
    pub fn fail_saves(&self, fail: bool) {
        if let Ok(mut flag) = self.fail_saves.lock() {
            *flag = fail;
        }
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|n| *n).unwrap_or(0)
    }

    /// Last saved snapshot, if any.
    pub fn stored(&self) -> Option<LedgerSnapshot> {
        self.stored.lock().ok().and_then(|s| s.clone())
    }
}

fn poisoned() -> SnapshotStorageError {
    SnapshotStorageError::IoError("snapshot lock poisoned".to_string())
}

#[async_trait]
impl SnapshotRepository for InMemorySnapshotRepository {
    async fn load(&self) -> Result<LedgerSnapshot, SnapshotStorageError> {
        let stored = self.stored.lock().map_err(|_| poisoned())?;
        Ok(stored.clone().unwrap_or_default())
    }

    async fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), SnapshotStorageError> {
        if *self.fail_saves.lock().map_err(|_| poisoned())? {
            return Err(SnapshotStorageError::IoError("simulated write failure".to_string()));
        }
        *self.stored.lock().map_err(|_| poisoned())? = Some(snapshot.clone());
        *self.saves.lock().map_err(|_| poisoned())? += 1;
        Ok(())
    }
}
