//! CheckoutGateway port - hosted checkout sessions at the payment provider.
//!
//! The gateway is called outside the ledger lock. Whatever it returns is
//! committed afterwards as an ordinary transition.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{
    Currency, EventId, Money, OrganizerId, PaymentIntentId, RegistrationId, SponsorSlotId,
    Timestamp,
};
use crate::domain::registration::PaymentError;
use crate::domain::sponsor::{KIND_SPONSOR_MODULE, KIND_SPONSOR_SLOT};

/// Metadata kind tagging participant registration checkouts.
pub const KIND_REGISTRATION: &str = "registration_payment";

/// Metadata key carrying the internal payment intent id.
pub const METADATA_PAYMENT_INTENT_ID: &str = "payment_intent_id";

/// What a checkout session pays for. Echoed back in webhook metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutPurpose {
    Registration {
        registration_id: RegistrationId,
        payment_intent_id: PaymentIntentId,
        event_id: EventId,
        organizer_id: OrganizerId,
        registration_code: String,
    },
    SponsorSlot {
        sponsor_slot_id: SponsorSlotId,
        event_id: EventId,
        organizer_id: OrganizerId,
    },
    SponsorModule {
        organizer_id: OrganizerId,
    },
}

impl CheckoutPurpose {
    pub fn kind(&self) -> &'static str {
        match self {
            CheckoutPurpose::Registration { .. } => KIND_REGISTRATION,
            CheckoutPurpose::SponsorSlot { .. } => KIND_SPONSOR_SLOT,
            CheckoutPurpose::SponsorModule { .. } => KIND_SPONSOR_MODULE,
        }
    }

    /// Flat key/value metadata attached to the session and its payment.
    pub fn metadata(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("kind", self.kind().to_string())];
        match self {
            CheckoutPurpose::Registration {
                registration_id,
                payment_intent_id,
                event_id,
                organizer_id,
                registration_code,
            } => {
                pairs.push(("registration_id", registration_id.to_string()));
                pairs.push(("event_id", event_id.to_string()));
                pairs.push(("organizer_id", organizer_id.to_string()));
                pairs.push(("registration_code", registration_code.clone()));
                pairs.push((METADATA_PAYMENT_INTENT_ID, payment_intent_id.to_string()));
            }
            CheckoutPurpose::SponsorSlot {
                sponsor_slot_id,
                event_id,
                organizer_id,
            } => {
                pairs.push(("sponsor_slot_id", sponsor_slot_id.to_string()));
                pairs.push(("event_id", event_id.to_string()));
                pairs.push(("organizer_id", organizer_id.to_string()));
            }
            CheckoutPurpose::SponsorModule { organizer_id } => {
                pairs.push(("organizer_id", organizer_id.to_string()));
            }
        }
        pairs
    }
}

/// Request to open a hosted checkout session for a single line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub purpose: CheckoutPurpose,
    /// Forwarded to the provider so a retried request opens one session.
    pub idempotency_key: String,
    pub product_name: String,
    pub description: Option<String>,
    pub amount: Money,
    pub currency: Currency,
    /// Platform fee in cents, already clamped to the amount.
    pub application_fee_cents: Option<i64>,
    /// Connected account receiving the remainder.
    pub destination_account: Option<String>,
    pub customer_email: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
}

/// Session opened by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
    pub provider_payment_intent_id: Option<String>,
    pub expires_at: Option<Timestamp>,
}

/// Gateway error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorCode {
    NetworkError,
    AuthenticationError,
    InvalidRequest,
    RateLimited,
    ProviderError,
}

impl GatewayErrorCode {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayErrorCode::NetworkError
                | GatewayErrorCode::RateLimited
                | GatewayErrorCode::ProviderError
        )
    }
}

impl fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GatewayErrorCode::NetworkError => "network_error",
            GatewayErrorCode::AuthenticationError => "authentication_error",
            GatewayErrorCode::InvalidRequest => "invalid_request",
            GatewayErrorCode::RateLimited => "rate_limited",
            GatewayErrorCode::ProviderError => "provider_error",
        };
        f.write_str(s)
    }
}

/// Error from the checkout provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct GatewayError {
    pub code: GatewayErrorCode,
    pub message: String,
    /// Provider's own error code, if it sent one.
    pub provider_code: Option<String>,
}

impl GatewayError {
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::NetworkError, message)
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl From<GatewayError> for PaymentError {
    fn from(err: GatewayError) -> Self {
        PaymentError::checkout_provider(err.to_string())
    }
}

#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn CheckoutGateway) {}

    #[test]
    fn registration_metadata_carries_internal_intent_id() {
        let intent = PaymentIntentId::new();
        let purpose = CheckoutPurpose::Registration {
            registration_id: RegistrationId::new(),
            payment_intent_id: intent,
            event_id: EventId::new(),
            organizer_id: OrganizerId::new(),
            registration_code: "TRA-00001".to_string(),
        };
        let metadata = purpose.metadata();
        assert_eq!(metadata[0], ("kind", KIND_REGISTRATION.to_string()));
        assert!(metadata.contains(&(METADATA_PAYMENT_INTENT_ID, intent.to_string())));
    }

    #[test]
    fn sponsor_kinds_match_webhook_routing() {
        let slot = CheckoutPurpose::SponsorSlot {
            sponsor_slot_id: SponsorSlotId::new(),
            event_id: EventId::new(),
            organizer_id: OrganizerId::new(),
        };
        assert_eq!(slot.kind(), "sponsor_slot");
        let module = CheckoutPurpose::SponsorModule {
            organizer_id: OrganizerId::new(),
        };
        assert_eq!(module.kind(), "sponsor_module_activation");
    }

    #[test]
    fn gateway_error_becomes_retryable_collaborator_error() {
        let err: PaymentError = GatewayError::network("timeout").into();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("network_error: timeout"));
        assert!(!GatewayError::new(GatewayErrorCode::InvalidRequest, "bad").is_retryable());
    }
}
