//! Storage Adapters
//!
//! Implementations of the SnapshotRepository port.
//!
//! ## Available Adapters
//!
//! - **FileSnapshotRepository** - One JSON document on disk, replaced atomically
//! - **InMemorySnapshotRepository** - Keeps the snapshot in memory (testing/development)

mod file_snapshot_repository;
mod in_memory_snapshot_repository;

pub use file_snapshot_repository::FileSnapshotRepository;
pub use in_memory_snapshot_repository::InMemorySnapshotRepository;
