//! ConfirmCashPaymentHandler - organizer records cash collected on site.

use std::sync::Arc;

use tracing::info;

use crate::application::{Commit, PaymentLedger};
use crate::domain::foundation::RegistrationId;
use crate::domain::ledger::LedgerEvent;
use crate::domain::registration::{confirm_cash_payment, PaymentError, Registration};
use crate::ports::NumberAssigner;

#[derive(Debug, Clone)]
pub struct ConfirmCashPaymentCommand {
    pub registration_id: RegistrationId,
}

#[derive(Debug, Clone)]
pub struct ConfirmCashPaymentResult {
    pub registration: Registration,
}

pub struct ConfirmCashPaymentHandler {
    ledger: Arc<PaymentLedger>,
    numbers: Arc<dyn NumberAssigner>,
}

impl ConfirmCashPaymentHandler {
    pub fn new(ledger: Arc<PaymentLedger>, numbers: Arc<dyn NumberAssigner>) -> Self {
        Self { ledger, numbers }
    }

    pub async fn handle(
        &self,
        cmd: ConfirmCashPaymentCommand,
    ) -> Result<ConfirmCashPaymentResult, PaymentError> {
        let numbers = self.numbers.as_ref();
        let registration = self
            .ledger
            .commit(|snapshot, now| {
                let change = confirm_cash_payment(snapshot, cmd.registration_id, numbers, now)?;
                let events = LedgerEvent::for_registration(&change.registration);
                Ok(Commit::write(change.snapshot, change.registration).with_events(events))
            })
            .await?;

        info!(
            registration_id = %registration.id,
            assigned_number = ?registration.assigned_number,
            "Cash payment confirmed"
        );
        Ok(ConfirmCashPaymentResult { registration })
    }
}
