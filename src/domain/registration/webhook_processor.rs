//! Idempotent application of payment webhooks.
//!
//! Runs entirely against an in-memory snapshot. The caller serializes calls
//! so that the dedup check, number assignment and ledger append happen as
//! one step.

use tracing::debug;

use crate::domain::ledger::LedgerSnapshot;
use crate::ports::NumberAssigner;

use super::{
    EntityKind, PairTransition, PaymentError, PaymentIntent, PaymentOutcome, PaymentWebhook,
    Registration, RegistrationStatus,
};

/// Updated entities and the snapshot that contains them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedWebhook {
    pub snapshot: LedgerSnapshot,
    pub registration: Registration,
    pub intent: PaymentIntent,
    pub outcome: PaymentOutcome,
}

/// Result of applying a payment webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookApplication {
    Applied(Box<AppliedWebhook>),
    /// The webhook id is already in the ledger; nothing changed.
    AlreadyProcessed,
}

/// Applies one validated payment webhook to `snapshot`.
///
/// Nothing is auto-created: an unknown intent or registration is rejected.
/// Both transitions are validated before a number is assigned, so a
/// rejected webhook never consumes a number.
pub fn apply_payment_webhook(
    snapshot: &LedgerSnapshot,
    webhook: &PaymentWebhook,
    numbers: &dyn NumberAssigner,
) -> Result<WebhookApplication, PaymentError> {
    if snapshot.has_processed(&webhook.webhook_event_id) {
        debug!(webhook_event_id = %webhook.webhook_event_id, "Webhook already processed");
        return Ok(WebhookApplication::AlreadyProcessed);
    }

    let intent = snapshot
        .payment_intent(webhook.payment_intent_id)
        .ok_or_else(|| PaymentError::not_found(EntityKind::PaymentIntent, webhook.payment_intent_id))?;
    let registration = snapshot
        .registration(intent.registration_id)
        .ok_or_else(|| PaymentError::not_found(EntityKind::Registration, intent.registration_id))?;

    let (intent_target, registration_target) = webhook.outcome.targets();
    let mut transition = PairTransition::pair(registration_target, intent_target);
    if let Some(reason) = webhook.outcome.failure_reason() {
        transition = transition.with_reason(reason);
    }

    let pair = transition.apply(registration, Some(intent), webhook.received_at)?;
    let mut next_registration = pair.registration;
    let mut next_intent = pair
        .intent
        .ok_or_else(|| PaymentError::not_found(EntityKind::PaymentIntent, intent.id))?;

    next_intent.provider_payment_intent_id = webhook
        .provider_payment_intent_id
        .clone()
        .or_else(|| intent.provider_payment_intent_id.clone());
    next_intent.webhook_event_id = Some(webhook.webhook_event_id.clone());

    if webhook.payment_reference.is_some() {
        next_registration.payment_reference = webhook.payment_reference.clone();
    }

    match registration_target {
        RegistrationStatus::Paid => {
            next_registration.payment_captured_at = Some(webhook.received_at);
            if next_registration.assigned_number.is_none() {
                let number =
                    numbers.assign_number(next_registration.id, next_registration.event_id)?;
                next_registration.assign_number_once(number);
            }
        }
        RegistrationStatus::Refunded => {
            next_registration.refunded_at = Some(webhook.received_at);
        }
        _ => {}
    }

    let mut next = snapshot.clone();
    next.upsert_payment_intent(next_intent.clone());
    next.upsert_registration(next_registration.clone());
    next.record_webhook(webhook.webhook_event_id.clone());

    Ok(WebhookApplication::Applied(Box::new(AppliedWebhook {
        snapshot: next,
        registration: next_registration,
        intent: next_intent,
        outcome: webhook.outcome.clone(),
    })))
}
