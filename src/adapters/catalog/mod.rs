//! Event catalog adapters.

mod in_memory_catalog;

pub use in_memory_catalog::{CatalogLoadError, InMemoryEventCatalog};
