//! CancelRegistrationHandler - withdraws an unpaid registration.

use std::sync::Arc;

use tracing::info;

use crate::application::{Commit, PaymentLedger};
use crate::domain::foundation::RegistrationId;
use crate::domain::ledger::LedgerEvent;
use crate::domain::registration::{cancel_registration, PaymentError, Registration};

#[derive(Debug, Clone)]
pub struct CancelRegistrationCommand {
    pub registration_id: RegistrationId,
}

#[derive(Debug, Clone)]
pub struct CancelRegistrationResult {
    pub registration: Registration,
}

pub struct CancelRegistrationHandler {
    ledger: Arc<PaymentLedger>,
}

impl CancelRegistrationHandler {
    pub fn new(ledger: Arc<PaymentLedger>) -> Self {
        Self { ledger }
    }

    pub async fn handle(
        &self,
        cmd: CancelRegistrationCommand,
    ) -> Result<CancelRegistrationResult, PaymentError> {
        let registration = self
            .ledger
            .commit(|snapshot, now| {
                let change = cancel_registration(snapshot, cmd.registration_id, now)?;
                let events = LedgerEvent::for_registration(&change.registration);
                Ok(Commit::write(change.snapshot, change.registration).with_events(events))
            })
            .await?;

        info!(registration_id = %registration.id, "Registration cancelled");
        Ok(CancelRegistrationResult { registration })
    }
}
