//! In-memory event publisher for testing.
//!
//! Captures every published ledger event for assertions.
//!
//! # Security Note
//!
//! This adapter is for **testing only**. It uses `.expect()` on lock
//! operations which will panic if locks are poisoned.

use async_trait::async_trait;
use std::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::ledger::LedgerEvent;
use crate::ports::EventPublisher;

/// In-memory event publisher for testing.
///
/// # Example
///
/// ```ignore
/// let events = Arc::new(InMemoryEventBus::new());
/// let ledger = PaymentLedger::new(snapshot, repo, events.clone(), numbers, clock);
///
/// // ... apply a succeeded webhook ...
/// assert!(events.has_event("registration.confirmed"));
/// ```
pub struct InMemoryEventBus {
    published: RwLock<Vec<LedgerEvent>>,
    fail_publish: RwLock<bool>,
}

impl InMemoryEventBus {
    /// Creates a new empty bus.
    pub fn new() -> Self {
        Self {
            published: RwLock::new(Vec::new()),
            fail_publish: RwLock::new(false),
        }
    }

    // === Test Helpers ===

    /// Makes every subsequent publish fail.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn fail_publishing(&self) {
        *self
            .fail_publish
            .write()
            .expect("InMemoryEventBus: fail flag lock poisoned") = true;
    }

    /// Returns all published events.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn published_events(&self) -> Vec<LedgerEvent> {
        self.published
            .read()
            .expect("InMemoryEventBus: published lock poisoned")
            .clone()
    }

    /// Returns events of a specific dotted type.
    pub fn events_of_type(&self, event_type: &str) -> Vec<LedgerEvent> {
        self.published_events()
            .into_iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Returns count of published events.
    pub fn event_count(&self) -> usize {
        self.published
            .read()
            .expect("InMemoryEventBus: published lock poisoned")
            .len()
    }

    /// Checks if a specific event type was published.
    pub fn has_event(&self, event_type: &str) -> bool {
        self.published
            .read()
            .expect("InMemoryEventBus: published lock poisoned")
            .iter()
            .any(|e| e.event_type() == event_type)
    }

    /// Clears all published events.
    pub fn clear(&self) {
        self.published
            .write()
            .expect("InMemoryEventBus: published write lock poisoned")
            .clear();
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: LedgerEvent) -> Result<(), DomainError> {
        if *self
            .fail_publish
            .read()
            .expect("InMemoryEventBus: fail flag lock poisoned")
        {
            return Err(DomainError::new(
                ErrorCode::InternalError,
                "Simulated publish failure",
            ));
        }
        self.published
            .write()
            .expect("InMemoryEventBus: published write lock poisoned")
            .push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{OrganizerId, RegistrationId, Timestamp};

    fn cancelled() -> LedgerEvent {
        LedgerEvent::RegistrationCancelled {
            registration_id: RegistrationId::new(),
            occurred_at: Timestamp::now(),
        }
    }

    fn module_enabled() -> LedgerEvent {
        LedgerEvent::SponsorModuleEnabled {
            organizer_id: OrganizerId::new(),
            occurred_at: Timestamp::now(),
        }
    }

    #[tokio::test]
    async fn publish_stores_event() {
        let bus = InMemoryEventBus::new();
        bus.publish(cancelled()).await.unwrap();

        assert_eq!(bus.event_count(), 1);
        assert!(bus.has_event("registration.cancelled"));
        assert!(!bus.has_event("registration.confirmed"));
    }

    #[tokio::test]
    async fn events_of_type_filters_correctly() {
        let bus = InMemoryEventBus::new();
        bus.publish_all(vec![cancelled(), module_enabled(), cancelled()])
            .await
            .unwrap();

        assert_eq!(bus.events_of_type("registration.cancelled").len(), 2);
        assert_eq!(bus.events_of_type("sponsor_module.enabled").len(), 1);
    }

    #[tokio::test]
    async fn failing_bus_rejects_and_stores_nothing() {
        let bus = InMemoryEventBus::new();
        bus.fail_publishing();

        assert!(bus.publish(cancelled()).await.is_err());
        assert_eq!(bus.event_count(), 0);
    }

    #[tokio::test]
    async fn clear_removes_all_events() {
        let bus = InMemoryEventBus::new();
        bus.publish(cancelled()).await.unwrap();
        bus.clear();
        assert_eq!(bus.event_count(), 0);
    }
}
