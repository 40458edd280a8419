//! ChooseCashPaymentHandler - participant opts to pay cash on site.

use std::sync::Arc;

use tracing::info;

use crate::application::{Commit, PaymentLedger};
use crate::domain::foundation::{Currency, RegistrationId};
use crate::domain::registration::{
    choose_cash_payment, EntityKind, PaymentError, PaymentIntent, Registration,
};
use crate::ports::EventCatalog;

#[derive(Debug, Clone)]
pub struct ChooseCashPaymentCommand {
    pub registration_id: RegistrationId,
    /// Receipt or note supplied by the participant.
    pub reference: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChooseCashPaymentResult {
    pub registration: Registration,
    pub intent: PaymentIntent,
}

pub struct ChooseCashPaymentHandler {
    ledger: Arc<PaymentLedger>,
    catalog: Arc<dyn EventCatalog>,
    currency: Currency,
}

impl ChooseCashPaymentHandler {
    pub fn new(ledger: Arc<PaymentLedger>, catalog: Arc<dyn EventCatalog>, currency: Currency) -> Self {
        Self {
            ledger,
            catalog,
            currency,
        }
    }

    pub async fn handle(
        &self,
        cmd: ChooseCashPaymentCommand,
    ) -> Result<ChooseCashPaymentResult, PaymentError> {
        let event_id = self
            .ledger
            .current()?
            .registration(cmd.registration_id)
            .map(|r| r.event_id)
            .ok_or_else(|| PaymentError::not_found(EntityKind::Registration, cmd.registration_id))?;
        let event = self
            .catalog
            .event(event_id)
            .ok_or_else(|| PaymentError::not_found(EntityKind::Event, event_id))?;

        let change = self
            .ledger
            .commit(|snapshot, now| {
                let change = choose_cash_payment(
                    snapshot,
                    cmd.registration_id,
                    &event,
                    self.currency,
                    cmd.reference,
                    now,
                )?;
                let snapshot = change.snapshot.clone();
                Ok(Commit::write(snapshot, change))
            })
            .await?;

        let intent = change
            .intent
            .ok_or_else(|| PaymentError::not_found(EntityKind::PaymentIntent, cmd.registration_id))?;
        info!(
            registration_id = %change.registration.id,
            payment_intent_id = %intent.id,
            "Cash payment chosen"
        );

        Ok(ChooseCashPaymentResult {
            registration: change.registration,
            intent,
        })
    }
}
