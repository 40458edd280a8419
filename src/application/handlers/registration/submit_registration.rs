//! SubmitRegistrationHandler - creates a registration (and its first intent).

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use crate::application::{Commit, PaymentLedger};
use crate::domain::foundation::EventId;
use crate::domain::ledger::LedgerEvent;
use crate::domain::registration::{
    submit_registration, Consents, EntityKind, Participant, PaymentError, PaymentIntent,
    Registration, RegistrationPricing,
};
use crate::ports::{EventCatalog, NumberAssigner};

/// Command to register a participant for an event.
#[derive(Debug, Clone)]
pub struct SubmitRegistrationCommand {
    pub event_id: EventId,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub city: String,
    pub birth_date: Option<NaiveDate>,
    pub privacy_consent: bool,
    pub retention_consent: bool,
}

/// Result of a successful submission.
#[derive(Debug, Clone)]
pub struct SubmitRegistrationResult {
    pub registration: Registration,
    /// First intent of a paid registration; `None` for free events.
    pub payment_intent: Option<PaymentIntent>,
}

pub struct SubmitRegistrationHandler {
    ledger: Arc<PaymentLedger>,
    catalog: Arc<dyn EventCatalog>,
    numbers: Arc<dyn NumberAssigner>,
    pricing: RegistrationPricing,
}

impl SubmitRegistrationHandler {
    pub fn new(
        ledger: Arc<PaymentLedger>,
        catalog: Arc<dyn EventCatalog>,
        numbers: Arc<dyn NumberAssigner>,
        pricing: RegistrationPricing,
    ) -> Self {
        Self {
            ledger,
            catalog,
            numbers,
            pricing,
        }
    }

    pub async fn handle(
        &self,
        cmd: SubmitRegistrationCommand,
    ) -> Result<SubmitRegistrationResult, PaymentError> {
        // 1. Resolve the event and validate the participant before locking
        let event = self
            .catalog
            .event(cmd.event_id)
            .ok_or_else(|| PaymentError::not_found(EntityKind::Event, cmd.event_id))?;
        let participant = Participant::new(
            &cmd.full_name,
            &cmd.email,
            &cmd.phone,
            &cmd.city,
            cmd.birth_date,
        )?;
        let consents = Consents {
            privacy: cmd.privacy_consent,
            retention: cmd.retention_consent,
        };

        // 2. Create registration (+ intent) in one commit
        let numbers = self.numbers.as_ref();
        let pricing = &self.pricing;
        let change = self
            .ledger
            .commit(|snapshot, now| {
                let change = submit_registration(
                    snapshot,
                    &event,
                    participant,
                    consents,
                    pricing,
                    numbers,
                    now,
                )?;
                let submitted = LedgerEvent::RegistrationSubmitted {
                    registration_id: change.registration.id,
                    event_id: change.registration.event_id,
                    payment_intent_id: change.registration.payment_intent_id,
                    occurred_at: now,
                };
                let events = std::iter::once(submitted)
                    .chain(LedgerEvent::for_registration(&change.registration));
                let snapshot = change.snapshot.clone();
                Ok(Commit::write(snapshot, change).with_events(events))
            })
            .await?;

        info!(
            registration_id = %change.registration.id,
            event_id = %change.registration.event_id,
            status = %change.registration.registration_status,
            "Registration submitted"
        );

        Ok(SubmitRegistrationResult {
            registration: change.registration,
            payment_intent: change.intent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_support::{fixture, paid_event};
    use crate::domain::registration::{PaymentIntentStatus, RegistrationStatus};
    use rust_decimal_macros::dec;

    fn command(event_id: EventId, email: &str) -> SubmitRegistrationCommand {
        SubmitRegistrationCommand {
            event_id,
            full_name: "Anna Bianchi".to_string(),
            email: email.to_string(),
            phone: "+39 333 1234567".to_string(),
            city: "Torino".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1990, 3, 14),
            privacy_consent: true,
            retention_consent: true,
        }
    }

    #[tokio::test]
    async fn paid_submission_persists_pair_and_publishes() {
        let event = paid_event(dec!(25));
        let f = fixture(vec![event.clone()]);
        let handler = SubmitRegistrationHandler::new(
            f.ledger.clone(),
            f.catalog.clone(),
            f.numbers.clone(),
            RegistrationPricing::default(),
        );

        let result = handler.handle(command(event.id, "Anna@Example.com")).await.unwrap();

        assert_eq!(result.registration.registration_status, RegistrationStatus::PendingPayment);
        assert_eq!(result.registration.participant.email, "anna@example.com");
        assert_eq!(result.payment_intent.unwrap().status, PaymentIntentStatus::Pending);
        assert_eq!(f.repository.save_count(), 1);
        assert!(f.events.has_event("registration.submitted"));
        assert!(!f.events.has_event("registration.confirmed"));
    }

    #[tokio::test]
    async fn free_submission_confirms_and_numbers_sequentially() {
        let event = paid_event(dec!(0));
        let f = fixture(vec![event.clone()]);
        let handler = SubmitRegistrationHandler::new(
            f.ledger.clone(),
            f.catalog.clone(),
            f.numbers.clone(),
            RegistrationPricing::default(),
        );

        let first = handler.handle(command(event.id, "a@b.it")).await.unwrap();
        let second = handler.handle(command(event.id, "c@d.it")).await.unwrap();

        assert_eq!(first.registration.assigned_number, Some(1));
        assert_eq!(second.registration.assigned_number, Some(2));
        assert_eq!(f.events.events_of_type("registration.confirmed").len(), 2);
    }

    #[tokio::test]
    async fn unknown_event_is_not_found() {
        let f = fixture(vec![]);
        let handler = SubmitRegistrationHandler::new(
            f.ledger.clone(),
            f.catalog.clone(),
            f.numbers.clone(),
            RegistrationPricing::default(),
        );

        let err = handler.handle(command(EventId::new(), "a@b.it")).await.unwrap_err();
        assert!(matches!(
            err,
            PaymentError::NotFound {
                entity: EntityKind::Event,
                ..
            }
        ));
        assert_eq!(f.repository.save_count(), 0);
    }

    #[tokio::test]
    async fn invalid_email_rejected_before_commit() {
        let event = paid_event(dec!(25));
        let f = fixture(vec![event.clone()]);
        let handler = SubmitRegistrationHandler::new(
            f.ledger.clone(),
            f.catalog.clone(),
            f.numbers.clone(),
            RegistrationPricing::default(),
        );

        let err = handler.handle(command(event.id, "not-an-email")).await.unwrap_err();
        assert!(matches!(err, PaymentError::Validation(_)));
    }
}
