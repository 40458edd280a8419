//! Payment intent entity.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::foundation::{
    Currency, EventId, Money, OrganizerId, PaymentIntentId, RegistrationId, StateMachine,
    Timestamp, WebhookEventId,
};

use super::{PaymentIntentStatus, Registration};

/// Who collects the money for an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentProvider {
    Stripe,
    /// Collected by the organizer (cash on site), confirmed by hand.
    #[default]
    #[serde(alias = "manual_demo")]
    Manual,
}

impl PaymentProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProvider::Stripe => "stripe",
            PaymentProvider::Manual => "manual",
        }
    }
}

impl fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One attempt to collect `amount` for a registration.
///
/// `amount` is fixed at creation. A failed or expired intent is never
/// reused; a new attempt gets a new intent with a new idempotency key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub id: PaymentIntentId,
    pub registration_id: RegistrationId,
    pub event_id: EventId,
    pub organizer_id: OrganizerId,
    pub provider: PaymentProvider,
    pub currency: Currency,
    pub amount: Money,
    pub status: PaymentIntentStatus,
    pub idempotency_key: String,
    pub provider_payment_intent_id: Option<String>,
    pub checkout_session_id: Option<String>,
    pub checkout_url: Option<String>,
    pub webhook_event_id: Option<WebhookEventId>,
    pub failure_reason: Option<String>,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PaymentIntent {
    /// Opens a fresh `pending` intent for the registration's full amount.
    pub fn open(
        registration: &Registration,
        provider: PaymentProvider,
        currency: Currency,
        expires_at: Timestamp,
        now: Timestamp,
    ) -> Self {
        Self {
            id: PaymentIntentId::new(),
            registration_id: registration.id,
            event_id: registration.event_id,
            organizer_id: registration.organizer_id,
            provider,
            currency,
            amount: registration.payment_amount,
            status: PaymentIntentStatus::Pending,
            idempotency_key: Uuid::new_v4().to_string(),
            provider_payment_intent_id: None,
            checkout_session_id: None,
            checkout_url: None,
            webhook_event_id: None,
            failure_reason: None,
            expires_at,
            created_at: now,
            updated_at: now,
        }
    }

    /// Open and past its own deadline.
    pub fn is_expired_at(&self, now: &Timestamp) -> bool {
        self.status.is_open() && self.expires_at.is_before(now)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
