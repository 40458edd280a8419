//! Normalized payment webhook payload and its validated form.
//!
//! The wire payload is provider-agnostic and loosely typed. It is turned
//! into [`PaymentWebhook`] at the boundary; anything malformed is rejected
//! there and never reaches the state machines.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::foundation::{PaymentIntentId, Timestamp, ValidationError, WebhookEventId};

use super::{PaymentIntentStatus, PaymentProvider, RegistrationStatus};

/// Default failure reason when the provider does not supply one.
pub const DEFAULT_FAILED_REASON: &str = "payment not authorized";

/// Default reason for an expired checkout session.
pub const DEFAULT_EXPIRED_REASON: &str = "payment session expired";

/// Wire form of a normalized payment webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentWebhookPayload {
    pub webhook_event_id: String,
    pub payment_intent_id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_payment_intent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub received_at: String,
}

/// Outcome reported by the provider, one variant per webhook type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Succeeded,
    Failed { reason: Option<String> },
    Expired { reason: Option<String> },
    Refunded,
}

impl PaymentOutcome {
    /// Wire name of the webhook type.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentOutcome::Succeeded => "payment_intent.succeeded",
            PaymentOutcome::Failed { .. } => "payment_intent.failed",
            PaymentOutcome::Expired { .. } => "payment_intent.expired",
            PaymentOutcome::Refunded => "payment_intent.refunded",
        }
    }

    /// Target statuses for the intent and its registration.
    pub fn targets(&self) -> (PaymentIntentStatus, RegistrationStatus) {
        match self {
            PaymentOutcome::Succeeded => (PaymentIntentStatus::Captured, RegistrationStatus::Paid),
            PaymentOutcome::Failed { .. } => {
                (PaymentIntentStatus::Failed, RegistrationStatus::PaymentFailed)
            }
            PaymentOutcome::Expired { .. } => {
                (PaymentIntentStatus::Expired, RegistrationStatus::PaymentFailed)
            }
            PaymentOutcome::Refunded => {
                (PaymentIntentStatus::Refunded, RegistrationStatus::Refunded)
            }
        }
    }

    /// Failure reason to record, falling back to the per-type default.
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            PaymentOutcome::Failed { reason } => Some(
                reason
                    .clone()
                    .unwrap_or_else(|| DEFAULT_FAILED_REASON.to_string()),
            ),
            PaymentOutcome::Expired { reason } => Some(
                reason
                    .clone()
                    .unwrap_or_else(|| DEFAULT_EXPIRED_REASON.to_string()),
            ),
            PaymentOutcome::Succeeded | PaymentOutcome::Refunded => None,
        }
    }

    fn parse(event_type: &str, reason: Option<String>) -> Result<Self, ValidationError> {
        match event_type.trim() {
            "payment_intent.succeeded" => Ok(PaymentOutcome::Succeeded),
            "payment_intent.failed" => Ok(PaymentOutcome::Failed { reason }),
            "payment_intent.expired" => Ok(PaymentOutcome::Expired { reason }),
            "payment_intent.refunded" => Ok(PaymentOutcome::Refunded),
            other => Err(ValidationError::unsupported("type", other)),
        }
    }
}

/// A validated payment webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentWebhook {
    pub webhook_event_id: WebhookEventId,
    pub payment_intent_id: PaymentIntentId,
    pub provider: PaymentProvider,
    pub provider_payment_intent_id: Option<String>,
    pub payment_reference: Option<String>,
    pub received_at: Timestamp,
    pub outcome: PaymentOutcome,
}

impl TryFrom<PaymentWebhookPayload> for PaymentWebhook {
    type Error = ValidationError;

    fn try_from(payload: PaymentWebhookPayload) -> Result<Self, Self::Error> {
        let webhook_event_id = WebhookEventId::new(payload.webhook_event_id)?;

        let raw_intent_id = payload.payment_intent_id.trim();
        if raw_intent_id.is_empty() {
            return Err(ValidationError::empty_field("paymentIntentId"));
        }
        let payment_intent_id = PaymentIntentId::from_str(raw_intent_id)
            .map_err(|e| ValidationError::invalid_format("paymentIntentId", e.to_string()))?;

        let provider = match payload.provider.trim() {
            "stripe" => PaymentProvider::Stripe,
            "manual" | "manual_demo" => PaymentProvider::Manual,
            other => return Err(ValidationError::unsupported("provider", other)),
        };

        let received_at = Timestamp::parse_rfc3339("receivedAt", &payload.received_at)?;
        let outcome = PaymentOutcome::parse(&payload.event_type, non_blank(payload.reason))?;

        Ok(Self {
            webhook_event_id,
            payment_intent_id,
            provider,
            provider_payment_intent_id: non_blank(payload.provider_payment_intent_id),
            payment_reference: non_blank(payload.payment_reference),
            received_at,
            outcome,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
