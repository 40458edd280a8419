//! Sponsor webhooks: wire payload, validated union and application.
//!
//! Sponsor events share the dedup ledger with registration webhooks, so a
//! provider event id is applied at most once across both surfaces.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::foundation::{
    OrganizerId, SponsorSlotId, Timestamp, ValidationError, WebhookEventId,
};
use crate::domain::ledger::LedgerSnapshot;
use crate::domain::registration::{
    EntityKind, PaymentError, DEFAULT_EXPIRED_REASON, DEFAULT_FAILED_REASON,
};

use super::{SponsorModuleActivation, SponsorSlot, SponsorSlotStatus};

/// Metadata kind tagging sponsor slot checkouts.
pub const KIND_SPONSOR_SLOT: &str = "sponsor_slot";

/// Metadata kind tagging sponsor module activation checkouts.
pub const KIND_SPONSOR_MODULE: &str = "sponsor_module_activation";

/// Wire form of a normalized sponsor webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorWebhookPayload {
    pub webhook_event_id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sponsor_slot_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkout_session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_payment_intent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_link_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer_email: Option<String>,
    pub received_at: String,
}

/// Provider event kinds understood for sponsor checkouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SponsorEvent {
    CheckoutCompleted,
    CheckoutExpired,
    PaymentFailed,
    Refunded,
}

impl SponsorEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            SponsorEvent::CheckoutCompleted => "checkout.session.completed",
            SponsorEvent::CheckoutExpired => "checkout.session.expired",
            SponsorEvent::PaymentFailed => "payment_intent.payment_failed",
            SponsorEvent::Refunded => "charge.refunded",
        }
    }

    /// Slot status reached by this event.
    pub fn slot_target(&self) -> SponsorSlotStatus {
        match self {
            SponsorEvent::CheckoutCompleted => SponsorSlotStatus::Active,
            SponsorEvent::CheckoutExpired => SponsorSlotStatus::Expired,
            SponsorEvent::PaymentFailed => SponsorSlotStatus::PaymentFailed,
            SponsorEvent::Refunded => SponsorSlotStatus::Refunded,
        }
    }

    fn failure_reason(&self) -> Option<&'static str> {
        match self {
            SponsorEvent::CheckoutExpired => Some(DEFAULT_EXPIRED_REASON),
            SponsorEvent::PaymentFailed => Some(DEFAULT_FAILED_REASON),
            SponsorEvent::CheckoutCompleted | SponsorEvent::Refunded => None,
        }
    }
}

impl FromStr for SponsorEvent {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "checkout.session.completed" => Ok(SponsorEvent::CheckoutCompleted),
            "checkout.session.expired" => Ok(SponsorEvent::CheckoutExpired),
            "payment_intent.payment_failed" => Ok(SponsorEvent::PaymentFailed),
            "charge.refunded" => Ok(SponsorEvent::Refunded),
            other => Err(ValidationError::unsupported("type", other)),
        }
    }
}

/// What a sponsor webhook is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SponsorTarget {
    Slot(SponsorSlotId),
    Module(OrganizerId),
}

/// Provider references carried by a sponsor webhook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutReferences {
    pub checkout_session_id: Option<String>,
    pub provider_payment_intent_id: Option<String>,
    pub payment_link_url: Option<String>,
    pub payer_email: Option<String>,
}

/// A validated sponsor webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SponsorWebhook {
    pub webhook_event_id: WebhookEventId,
    pub target: SponsorTarget,
    pub event: SponsorEvent,
    pub references: CheckoutReferences,
    pub received_at: Timestamp,
}

impl TryFrom<SponsorWebhookPayload> for SponsorWebhook {
    type Error = ValidationError;

    fn try_from(payload: SponsorWebhookPayload) -> Result<Self, Self::Error> {
        let webhook_event_id = WebhookEventId::new(payload.webhook_event_id)?;
        let event = SponsorEvent::from_str(&payload.event_type)?;

        let kind = non_blank(payload.kind);
        let target = match kind.as_deref().unwrap_or(KIND_SPONSOR_SLOT) {
            KIND_SPONSOR_SLOT => {
                let raw = non_blank(payload.sponsor_slot_id)
                    .ok_or_else(|| ValidationError::empty_field("sponsorSlotId"))?;
                let id = SponsorSlotId::from_str(&raw)
                    .map_err(|e| ValidationError::invalid_format("sponsorSlotId", e.to_string()))?;
                SponsorTarget::Slot(id)
            }
            KIND_SPONSOR_MODULE => {
                let raw = non_blank(payload.organizer_id)
                    .ok_or_else(|| ValidationError::empty_field("organizerId"))?;
                let id = OrganizerId::from_str(&raw)
                    .map_err(|e| ValidationError::invalid_format("organizerId", e.to_string()))?;
                SponsorTarget::Module(id)
            }
            other => return Err(ValidationError::unsupported("kind", other)),
        };

        let received_at = Timestamp::parse_rfc3339("receivedAt", &payload.received_at)?;

        Ok(Self {
            webhook_event_id,
            target,
            event,
            references: CheckoutReferences {
                checkout_session_id: non_blank(payload.checkout_session_id),
                provider_payment_intent_id: non_blank(payload.provider_payment_intent_id),
                payment_link_url: non_blank(payload.payment_link_url),
                payer_email: non_blank(payload.payer_email).map(|e| e.to_lowercase()),
            },
            received_at,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Entity updated by an applied sponsor webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SponsorChange {
    Slot(SponsorSlot),
    Module(SponsorModuleActivation),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedSponsorWebhook {
    pub snapshot: LedgerSnapshot,
    pub change: SponsorChange,
}

/// Result of applying a sponsor webhook to a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SponsorWebhookApplication {
    Applied(Box<AppliedSponsorWebhook>),
    AlreadyProcessed,
}

/// Applies one sponsor webhook to `snapshot`, returning the next snapshot.
///
/// Dedup is checked first; a processed id leaves the snapshot untouched.
pub fn apply_sponsor_webhook(
    snapshot: &LedgerSnapshot,
    webhook: &SponsorWebhook,
) -> Result<SponsorWebhookApplication, PaymentError> {
    if snapshot.has_processed(&webhook.webhook_event_id) {
        return Ok(SponsorWebhookApplication::AlreadyProcessed);
    }

    let mut next = snapshot.clone();
    let change = match webhook.target {
        SponsorTarget::Slot(slot_id) => {
            let slot = snapshot
                .sponsor_slot(slot_id)
                .ok_or_else(|| PaymentError::not_found(EntityKind::SponsorSlot, slot_id))?;
            let updated = apply_to_slot(slot, webhook)?;
            next.upsert_sponsor_slot(updated.clone());
            SponsorChange::Slot(updated)
        }
        SponsorTarget::Module(organizer_id) => {
            let module = snapshot
                .sponsor_module(organizer_id)
                .ok_or_else(|| PaymentError::not_found(EntityKind::SponsorModule, organizer_id))?;
            let updated = module.apply_event(webhook.event, webhook.received_at)?;
            next.upsert_sponsor_module(updated.clone());
            SponsorChange::Module(updated)
        }
    };
    next.record_webhook(webhook.webhook_event_id.clone());

    Ok(SponsorWebhookApplication::Applied(Box::new(
        AppliedSponsorWebhook {
            snapshot: next,
            change,
        },
    )))
}

fn apply_to_slot(slot: &SponsorSlot, webhook: &SponsorWebhook) -> Result<SponsorSlot, PaymentError> {
    let mut updated = slot.transitioned(webhook.event.slot_target(), webhook.received_at)?;

    let refs = &webhook.references;
    if refs.checkout_session_id.is_some() {
        updated.checkout_session_id = refs.checkout_session_id.clone();
    }
    if refs.provider_payment_intent_id.is_some() {
        updated.provider_payment_intent_id = refs.provider_payment_intent_id.clone();
    }
    if refs.payment_link_url.is_some() {
        updated.payment_link_url = refs.payment_link_url.clone();
    }
    if refs.payer_email.is_some() {
        updated.payer_email = refs.payer_email.clone();
    }
    if let Some(reason) = webhook.event.failure_reason() {
        updated.failure_reason = Some(reason.to_string());
    }
    Ok(updated)
}
