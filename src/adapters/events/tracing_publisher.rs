//! Event publisher that writes ledger events to the log.
//!
//! Stands in for an email/sync integration: each committed change shows up
//! as one structured `info` line carrying the JSON payload.

use async_trait::async_trait;
use tracing::info;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::ledger::LedgerEvent;
use crate::ports::EventPublisher;

#[derive(Debug, Clone, Default)]
pub struct TracingEventPublisher;

impl TracingEventPublisher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish(&self, event: LedgerEvent) -> Result<(), DomainError> {
        let payload = serde_json::to_string(&event).map_err(|e| {
            DomainError::new(ErrorCode::InternalError, "Failed to serialize event")
                .with_detail("error", e.to_string())
        })?;
        info!(event_type = event.event_type(), %payload, "Ledger event");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{RegistrationId, Timestamp};

    #[tokio::test]
    async fn publishing_always_succeeds() {
        let publisher = TracingEventPublisher::new();
        let event = LedgerEvent::RegistrationRefunded {
            registration_id: RegistrationId::new(),
            occurred_at: Timestamp::now(),
        };
        assert!(publisher.publish(event).await.is_ok());
    }
}
