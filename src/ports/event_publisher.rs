//! EventPublisher port - post-commit notifications.
//!
//! This port defines how committed changes are announced (confirmation
//! emails, remote sync) without the core knowing the transport.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::ledger::LedgerEvent;

/// Port for publishing ledger events.
///
/// Implementations must ensure:
/// - Events are delivered at-least-once (handlers may receive duplicates)
/// - Errors are propagated to the caller, which logs and moves on
///
/// Publishing happens after the snapshot is committed, so a failure here
/// never undoes a transition.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a single event.
    async fn publish(&self, event: LedgerEvent) -> Result<(), DomainError>;

    /// Publish multiple events in order, stopping at the first failure.
    async fn publish_all(&self, events: Vec<LedgerEvent>) -> Result<(), DomainError> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn EventPublisher) {}
}
