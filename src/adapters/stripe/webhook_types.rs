//! Stripe webhook event types and their translation to normalized payloads.
//!
//! Events arrive already verified by the upstream proxy. Each supported
//! event is routed by the `kind` metadata written when the checkout was
//! created: sponsor slots and the sponsor module go to the sponsor
//! webhook, everything else to the registration payment webhook.

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::registration::PaymentWebhookPayload;
use crate::domain::sponsor::{SponsorWebhookPayload, KIND_SPONSOR_MODULE, KIND_SPONSOR_SLOT};
use crate::ports::METADATA_PAYMENT_INTENT_ID;

// ════════════════════════════════════════════════════════════════════════════════
// Stripe Event Types
// ════════════════════════════════════════════════════════════════════════════════

/// Raw Stripe webhook event envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeWebhookEvent {
    /// Unique event identifier (evt_...).
    pub id: String,

    /// Event type (e.g., "checkout.session.completed").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Unix timestamp when the event was created.
    pub created: i64,

    /// Event payload containing the affected object.
    pub data: StripeEventData,
}

/// Event data container.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    /// The object affected by this event.
    pub object: serde_json::Value,
}

// ════════════════════════════════════════════════════════════════════════════════
// Stripe Object Types
// ════════════════════════════════════════════════════════════════════════════════

/// Stripe Checkout Session object, as returned by create and in events.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeCheckoutSession {
    /// Unique session identifier (cs_...).
    pub id: String,

    /// Hosted page url; absent once the session is complete or expired.
    #[serde(default)]
    pub url: Option<String>,

    /// Payment intent created for the session (pi_...).
    #[serde(default)]
    pub payment_intent: Option<String>,

    /// Unix timestamp at which the session expires.
    #[serde(default)]
    pub expires_at: Option<i64>,

    #[serde(default)]
    pub customer_email: Option<String>,

    #[serde(default)]
    pub customer_details: Option<StripeCustomerDetails>,

    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeCustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
}

/// Stripe PaymentIntent object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripePaymentIntent {
    pub id: String,

    /// Charge id of the latest attempt (ch_...).
    #[serde(default)]
    pub latest_charge: Option<String>,

    #[serde(default)]
    pub last_payment_error: Option<StripePaymentError>,

    #[serde(default)]
    pub cancellation_reason: Option<String>,

    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripePaymentError {
    #[serde(default)]
    pub message: Option<String>,
}

/// Stripe Charge object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeCharge {
    pub id: String,

    #[serde(default)]
    pub payment_intent: Option<String>,

    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Error body returned by the Stripe API.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorBody {
    pub error: StripeApiError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeApiError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Routing
// ════════════════════════════════════════════════════════════════════════════════

/// Registration payment event whose internal intent may still need resolving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationPaymentEvent {
    /// Internal intent id from metadata, when the checkout wrote it.
    pub payment_intent_id: Option<String>,
    pub provider_payment_intent_id: String,
    pub payload: PaymentWebhookPayload,
}

impl RegistrationPaymentEvent {
    /// Completes the payload with the resolved internal intent id.
    pub fn into_payload(self, payment_intent_id: String) -> PaymentWebhookPayload {
        PaymentWebhookPayload {
            payment_intent_id,
            ..self.payload
        }
    }
}

/// Where a Stripe event goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StripeEventRoute {
    Sponsor(SponsorWebhookPayload),
    Registration(RegistrationPaymentEvent),
    /// Unsupported type or missing routing metadata; acknowledged only.
    Ignored,
}

/// Error decoding the event object for a supported event type.
#[derive(Debug, thiserror::Error)]
#[error("Invalid {event_type} object: {message}")]
pub struct StripeEventError {
    pub event_type: String,
    pub message: String,
}

impl StripeWebhookEvent {
    fn received_at(&self) -> String {
        Utc.timestamp_opt(self.created, 0)
            .single()
            .unwrap_or_else(Utc::now)
            .to_rfc3339()
    }

    fn object<T: serde::de::DeserializeOwned>(&self) -> Result<T, StripeEventError> {
        serde_json::from_value(self.data.object.clone()).map_err(|e| StripeEventError {
            event_type: self.event_type.clone(),
            message: e.to_string(),
        })
    }

    /// Routes the event to the sponsor or registration webhook.
    pub fn route(&self) -> Result<StripeEventRoute, StripeEventError> {
        match self.event_type.as_str() {
            "checkout.session.completed" | "checkout.session.expired" => {
                let session: StripeCheckoutSession = self.object()?;
                Ok(self.sponsor_route(
                    &session.metadata,
                    SponsorRefs {
                        checkout_session_id: Some(session.id.clone()),
                        provider_payment_intent_id: session.payment_intent.clone(),
                        payment_link_url: session.url.clone(),
                        payer_email: session
                            .customer_details
                            .and_then(|d| d.email)
                            .or(session.customer_email),
                    },
                ))
            }
            "payment_intent.succeeded" | "payment_intent.payment_failed"
            | "payment_intent.canceled" => {
                let intent: StripePaymentIntent = self.object()?;
                if is_sponsor(&intent.metadata) {
                    if self.event_type == "payment_intent.payment_failed" {
                        return Ok(self.sponsor_route(
                            &intent.metadata,
                            SponsorRefs {
                                provider_payment_intent_id: Some(intent.id.clone()),
                                ..SponsorRefs::default()
                            },
                        ));
                    }
                    return Ok(StripeEventRoute::Ignored);
                }
                Ok(self.registration_from_intent(intent))
            }
            "charge.refunded" => {
                let charge: StripeCharge = self.object()?;
                if is_sponsor(&charge.metadata) {
                    return Ok(self.sponsor_route(
                        &charge.metadata,
                        SponsorRefs {
                            provider_payment_intent_id: charge.payment_intent.clone(),
                            ..SponsorRefs::default()
                        },
                    ));
                }
                let Some(provider_id) = charge.payment_intent.clone() else {
                    return Ok(StripeEventRoute::Ignored);
                };
                Ok(StripeEventRoute::Registration(self.registration_event(
                    "payment_intent.refunded",
                    provider_id,
                    Some(charge.id),
                    None,
                    &charge.metadata,
                )))
            }
            _ => Ok(StripeEventRoute::Ignored),
        }
    }

    fn sponsor_route(&self, metadata: &HashMap<String, String>, refs: SponsorRefs) -> StripeEventRoute {
        let kind = metadata.get("kind").map(String::as_str);
        let (sponsor_slot_id, organizer_id) = match kind {
            Some(KIND_SPONSOR_SLOT) => match metadata.get("sponsor_slot_id") {
                Some(id) => (Some(id.clone()), None),
                None => return StripeEventRoute::Ignored,
            },
            Some(KIND_SPONSOR_MODULE) => match metadata.get("organizer_id") {
                Some(id) => (None, Some(id.clone())),
                None => return StripeEventRoute::Ignored,
            },
            _ => return StripeEventRoute::Ignored,
        };

        StripeEventRoute::Sponsor(SponsorWebhookPayload {
            webhook_event_id: self.id.clone(),
            event_type: self.event_type.clone(),
            kind: kind.map(str::to_string),
            sponsor_slot_id,
            organizer_id,
            checkout_session_id: refs.checkout_session_id,
            provider_payment_intent_id: refs.provider_payment_intent_id,
            payment_link_url: refs.payment_link_url,
            payer_email: refs.payer_email,
            received_at: self.received_at(),
        })
    }

    fn registration_from_intent(&self, intent: StripePaymentIntent) -> StripeEventRoute {
        let reference = intent.latest_charge.clone().or_else(|| Some(intent.id.clone()));
        let (event_type, reason, reference) = match self.event_type.as_str() {
            "payment_intent.succeeded" => ("payment_intent.succeeded", None, reference),
            "payment_intent.payment_failed" => (
                "payment_intent.failed",
                intent
                    .last_payment_error
                    .and_then(|e| e.message)
                    .or(intent.cancellation_reason),
                reference,
            ),
            _ => (
                "payment_intent.expired",
                intent.cancellation_reason,
                Some(intent.id.clone()),
            ),
        };
        StripeEventRoute::Registration(self.registration_event(
            event_type,
            intent.id,
            reference,
            reason,
            &intent.metadata,
        ))
    }

    fn registration_event(
        &self,
        event_type: &str,
        provider_payment_intent_id: String,
        payment_reference: Option<String>,
        reason: Option<String>,
        metadata: &HashMap<String, String>,
    ) -> RegistrationPaymentEvent {
        let payment_intent_id = metadata.get(METADATA_PAYMENT_INTENT_ID).cloned();
        RegistrationPaymentEvent {
            payment_intent_id: payment_intent_id.clone(),
            provider_payment_intent_id: provider_payment_intent_id.clone(),
            payload: PaymentWebhookPayload {
                webhook_event_id: self.id.clone(),
                payment_intent_id: payment_intent_id.unwrap_or_default(),
                event_type: event_type.to_string(),
                provider: "stripe".to_string(),
                provider_payment_intent_id: Some(provider_payment_intent_id),
                payment_reference,
                reason,
                received_at: self.received_at(),
            },
        }
    }
}

#[derive(Default)]
struct SponsorRefs {
    checkout_session_id: Option<String>,
    provider_payment_intent_id: Option<String>,
    payment_link_url: Option<String>,
    payer_email: Option<String>,
}

fn is_sponsor(metadata: &HashMap<String, String>) -> bool {
    matches!(
        metadata.get("kind").map(String::as_str),
        Some(KIND_SPONSOR_SLOT) | Some(KIND_SPONSOR_MODULE)
    )
}
