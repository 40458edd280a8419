//! Request and response bodies for the payment endpoints.
//!
//! All bodies are camelCase JSON.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    Currency, EventId, Money, OrganizerId, PaymentIntentId, RegistrationId, SponsorSlotId,
    Timestamp,
};
use crate::domain::registration::{
    PaymentIntent, PaymentStatus, Registration, RegistrationStatus,
};
use crate::domain::sponsor::{SponsorChange, SponsorSlot, SponsorSlotStatus};

// ════════════════════════════════════════════════════════════════════════════════
// Requests
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRegistrationRequest {
    pub event_id: EventId,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub privacy_consent: bool,
    #[serde(default)]
    pub retention_consent: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashPaymentRequest {
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantCheckoutRequest {
    pub registration_id: RegistrationId,
    #[serde(default)]
    pub success_url: Option<String>,
    #[serde(default)]
    pub cancel_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorModuleCheckoutRequest {
    pub organizer_id: OrganizerId,
    #[serde(default)]
    pub payer_email: Option<String>,
    #[serde(default)]
    pub success_url: Option<String>,
    #[serde(default)]
    pub cancel_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorSlotCheckoutRequest {
    pub event_id: EventId,
    #[serde(default)]
    pub sponsor_name: Option<String>,
    #[serde(default)]
    pub sponsor_name_it: Option<String>,
    #[serde(default)]
    pub sponsor_name_en: Option<String>,
    #[serde(default)]
    pub sponsor_url: Option<String>,
    #[serde(default)]
    pub sponsor_logo_url: Option<String>,
    #[serde(default)]
    pub payer_email: Option<String>,
    pub package_days: u32,
    pub amount: Money,
    #[serde(default)]
    pub success_url: Option<String>,
    #[serde(default)]
    pub cancel_url: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Responses
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub registration: Registration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_intent: Option<PaymentIntent>,
}

/// Payment-facing view of a registration, shared by both checkout states.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationPaymentView {
    pub remote_registration_id: RegistrationId,
    pub remote_payment_intent_id: Option<PaymentIntentId>,
    pub provider_payment_intent_id: Option<String>,
    pub registration_status: RegistrationStatus,
    pub payment_status: PaymentStatus,
    pub payment_reference: Option<String>,
    pub assigned_number: Option<u32>,
    pub payment_captured_at: Option<Timestamp>,
    pub payment_failed_reason: Option<String>,
    pub refunded_at: Option<Timestamp>,
    pub session_expires_at: Option<Timestamp>,
}

impl RegistrationPaymentView {
    pub fn new(registration: &Registration, intent: Option<&PaymentIntent>) -> Self {
        Self {
            remote_registration_id: registration.id,
            remote_payment_intent_id: intent.map(|i| i.id).or(registration.payment_intent_id),
            provider_payment_intent_id: intent.and_then(|i| i.provider_payment_intent_id.clone()),
            registration_status: registration.registration_status,
            payment_status: registration.payment_status,
            payment_reference: registration.payment_reference.clone(),
            assigned_number: registration.assigned_number,
            payment_captured_at: registration.payment_captured_at,
            payment_failed_reason: registration.payment_failed_reason.clone(),
            refunded_at: registration.refunded_at,
            session_expires_at: registration
                .payment_session_expires_at
                .or_else(|| intent.map(|i| i.expires_at)),
        }
    }
}

/// Participant checkout outcome, tagged by `state`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ParticipantCheckoutResponse {
    Checkout {
        #[serde(rename = "checkoutUrl")]
        checkout_url: String,
        #[serde(flatten)]
        payment: RegistrationPaymentView,
    },
    Final {
        #[serde(flatten)]
        payment: RegistrationPaymentView,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SponsorModuleCheckoutResponse {
    AlreadyActive {
        #[serde(rename = "organizerId")]
        organizer_id: OrganizerId,
    },
    Checkout {
        #[serde(rename = "checkoutUrl")]
        checkout_url: String,
        #[serde(rename = "organizerId")]
        organizer_id: OrganizerId,
        amount: Money,
        currency: Currency,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorSlotCheckoutResponse {
    pub state: &'static str,
    pub checkout_url: String,
    pub sponsor_slot: SponsorSlot,
    pub max_package_days: u32,
}

/// Acknowledgement returned to webhook senders.
///
/// Duplicates and ignored events still answer 200 so the sender stops retrying.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub ignored: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_id: Option<RegistrationId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_status: Option<RegistrationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sponsor_slot_id: Option<SponsorSlotId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sponsor_slot_status: Option<SponsorSlotStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizer_id: Option<OrganizerId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sponsor_module_enabled: Option<bool>,
}

pub const ALREADY_PROCESSED: &str = "already processed";

impl WebhookResponse {
    pub fn already_processed() -> Self {
        Self {
            reason: Some(ALREADY_PROCESSED.to_string()),
            ..Self::default()
        }
    }

    pub fn ignored(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ignored: true,
            ..Self::default()
        }
    }

    pub fn registration(registration: &Registration) -> Self {
        Self {
            applied: true,
            registration_id: Some(registration.id),
            registration_status: Some(registration.registration_status),
            payment_status: Some(registration.payment_status),
            assigned_number: registration.assigned_number,
            ..Self::default()
        }
    }

    pub fn sponsor(change: &SponsorChange) -> Self {
        match change {
            SponsorChange::Slot(slot) => Self {
                applied: true,
                sponsor_slot_id: Some(slot.id),
                sponsor_slot_status: Some(slot.status),
                ..Self::default()
            },
            SponsorChange::Module(module) => Self {
                applied: true,
                organizer_id: Some(module.organizer_id),
                sponsor_module_enabled: Some(module.enabled),
                ..Self::default()
            },
        }
    }
}

/// Error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error_code: String,
    pub message: String,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            retryable: false,
            details: None,
        }
    }

    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}
