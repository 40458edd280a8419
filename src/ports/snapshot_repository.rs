//! SnapshotRepository port - durable storage of the ledger snapshot.
//!
//! The snapshot is saved and loaded as one unit. Saving happens after the
//! in-memory commit, outside the ledger lock.

use async_trait::async_trait;

use crate::domain::ledger::LedgerSnapshot;
use crate::domain::registration::PaymentError;

/// Errors that can occur during snapshot storage operations.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotStorageError {
    #[error("Failed to serialize snapshot: {0}")]
    SerializationFailed(String),

    #[error("Failed to deserialize snapshot: {0}")]
    DeserializationFailed(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<SnapshotStorageError> for PaymentError {
    fn from(err: SnapshotStorageError) -> Self {
        PaymentError::persistence(err.to_string())
    }
}

#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// Loads the stored snapshot, or an empty one if nothing was saved yet.
    async fn load(&self) -> Result<LedgerSnapshot, SnapshotStorageError>;

    /// Replaces the stored snapshot.
    async fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), SnapshotStorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn SnapshotRepository) {}

    #[test]
    fn storage_errors_are_retryable_persistence_errors() {
        let err: PaymentError = SnapshotStorageError::IoError("disk full".into()).into();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("disk full"));
    }
}
