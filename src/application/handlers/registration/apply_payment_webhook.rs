//! ApplyPaymentWebhookHandler - applies a normalized payment webhook.

use std::sync::Arc;

use tracing::{info, warn};

use crate::application::{Commit, PaymentLedger};
use crate::domain::ledger::LedgerEvent;
use crate::domain::registration::{
    apply_payment_webhook, PaymentError, PaymentIntent, PaymentOutcome, PaymentWebhook,
    PaymentWebhookPayload, Registration, WebhookApplication,
};
use crate::ports::NumberAssigner;

/// Command carrying one webhook as received on the wire.
#[derive(Debug, Clone)]
pub struct ApplyPaymentWebhookCommand {
    pub payload: PaymentWebhookPayload,
}

/// Result of applying a payment webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyPaymentWebhookResult {
    /// Transition committed.
    Applied {
        registration: Registration,
        intent: PaymentIntent,
        outcome: PaymentOutcome,
    },
    /// Webhook id seen before; nothing changed.
    AlreadyProcessed,
}

/// Validates the payload, then dedups, transitions and numbers in one commit.
pub struct ApplyPaymentWebhookHandler {
    ledger: Arc<PaymentLedger>,
    numbers: Arc<dyn NumberAssigner>,
}

impl ApplyPaymentWebhookHandler {
    pub fn new(ledger: Arc<PaymentLedger>, numbers: Arc<dyn NumberAssigner>) -> Self {
        Self { ledger, numbers }
    }

    pub async fn handle(
        &self,
        cmd: ApplyPaymentWebhookCommand,
    ) -> Result<ApplyPaymentWebhookResult, PaymentError> {
        let webhook = PaymentWebhook::try_from(cmd.payload)?;
        let numbers = self.numbers.as_ref();

        let result = self
            .ledger
            .commit(|snapshot, _| match apply_payment_webhook(snapshot, &webhook, numbers)? {
                WebhookApplication::AlreadyProcessed => {
                    Ok(Commit::keep(ApplyPaymentWebhookResult::AlreadyProcessed))
                }
                WebhookApplication::Applied(applied) => {
                    let applied = *applied;
                    let events = LedgerEvent::for_registration(&applied.registration);
                    Ok(Commit::write(
                        applied.snapshot,
                        ApplyPaymentWebhookResult::Applied {
                            registration: applied.registration,
                            intent: applied.intent,
                            outcome: applied.outcome,
                        },
                    )
                    .with_events(events))
                }
            })
            .await
            .map_err(|e| {
                warn!(
                    webhook_event_id = %webhook.webhook_event_id,
                    error = %e,
                    "Payment webhook rejected"
                );
                e
            })?;

        match &result {
            ApplyPaymentWebhookResult::Applied {
                registration,
                outcome,
                ..
            } => info!(
                webhook_event_id = %webhook.webhook_event_id,
                registration_id = %registration.id,
                outcome = outcome.as_str(),
                status = %registration.registration_status,
                "Payment webhook applied"
            ),
            ApplyPaymentWebhookResult::AlreadyProcessed => info!(
                webhook_event_id = %webhook.webhook_event_id,
                "Payment webhook already processed"
            ),
        }

        Ok(result)
    }
}
