//! In-memory event catalog, optionally loaded from a JSON file.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use crate::domain::foundation::EventId;
use crate::ports::{EventCatalog, EventInfo};

/// Errors loading the catalog file.
#[derive(Debug, thiserror::Error)]
pub enum CatalogLoadError {
    #[error("Failed to read catalog: {0}")]
    IoError(String),

    #[error("Failed to parse catalog: {0}")]
    ParseFailed(String),
}

/// Event facts keyed by id.
#[derive(Debug, Default)]
pub struct InMemoryEventCatalog {
    events: RwLock<HashMap<EventId, EventInfo>>,
}

impl InMemoryEventCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: impl IntoIterator<Item = EventInfo>) -> Self {
        Self {
            events: RwLock::new(events.into_iter().map(|e| (e.id, e)).collect()),
        }
    }

    /// Loads a JSON array of events. A missing file yields an empty catalog.
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CatalogLoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new());
        }
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CatalogLoadError::IoError(e.to_string()))?;
        let events: Vec<EventInfo> =
            serde_json::from_str(&json).map_err(|e| CatalogLoadError::ParseFailed(e.to_string()))?;
        Ok(Self::with_events(events))
    }

    /// Adds or replaces an event.
    pub fn upsert(&self, event: EventInfo) {
        if let Ok(mut events) = self.events.write() {
            events.insert(event.id, event);
        }
    }

    pub fn len(&self) -> usize {
        self.events.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventCatalog for InMemoryEventCatalog {
    fn event(&self, id: EventId) -> Option<EventInfo> {
        self.events.read().ok()?.get(&id).cloned()
    }
}
