//! Lenient loading of persisted snapshots.
//!
//! Older snapshots miss fields, use non-UUID ids, or store a single
//! `paymentStatus` where the registration status is now separate. Every
//! field is read as optional and filled with a documented default so that
//! loading never fails on shape alone.
//!
//! | Field | Default |
//! |-------|---------|
//! | `registrationStatus` | derived from `paymentStatus`, else `pending_payment` |
//! | `paymentStatus` `"paid"` | registration `paid`, payment `captured` |
//! | `paymentStatus` missing | `not_required` for free, `pending` otherwise |
//! | intent `provider` | `manual` |
//! | intent `status` | `pending` |
//! | intent `expiresAt` | `createdAt` + 15 minutes |
//! | slot `packageDays` | 1 |
//! | `currency` | `EUR` |
//! | slot `status` | `pending_payment` |
//! | slot `endsAt` | `startsAt` + `packageDays` |

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::foundation::{
    Currency, EventId, Money, OrganizerId, PaymentIntentId, RegistrationId, SponsorSlotId,
    Timestamp, WebhookEventId,
};
use crate::domain::registration::{
    Consents, Participant, PaymentIntent, PaymentIntentStatus, PaymentMethod, PaymentProvider,
    PaymentStatus, Registration, RegistrationCode, RegistrationStatus,
};
use crate::domain::sponsor::{
    ContractTerms, SponsorModuleActivation, SponsorSlot, SponsorSlotStatus,
};

use super::LedgerSnapshot;

const LEGACY_INTENT_TTL_MINUTES: i64 = 15;

/// Maps any persisted id to a UUID. Non-UUID ids map deterministically.
pub fn legacy_uuid(raw: &str) -> Uuid {
    let raw = raw.trim();
    Uuid::parse_str(raw).unwrap_or_else(|_| Uuid::new_v5(&Uuid::NAMESPACE_OID, raw.as_bytes()))
}

fn id_or_new(raw: Option<&str>) -> Uuid {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => legacy_uuid(raw),
        None => Uuid::new_v4(),
    }
}

fn optional_id(raw: Option<&str>) -> Option<Uuid> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(legacy_uuid)
}

fn timestamp(raw: Option<&str>) -> Option<Timestamp> {
    raw.and_then(|s| Timestamp::parse_rfc3339("timestamp", s).ok())
}

/// Parses a snake_case enum value, ignoring unknown values.
fn wire_enum<T: DeserializeOwned>(raw: Option<&str>) -> Option<T> {
    let raw = raw?.trim();
    serde_json::from_value(serde_json::Value::String(raw.to_string())).ok()
}

fn currency(raw: Option<&str>) -> Currency {
    wire_enum(raw.map(str::trim).map(|s| s.to_uppercase()).as_deref()).unwrap_or_default()
}

fn text(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

// ════════════════════════════════════════════════════════════════════════════════
// Raw shapes
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(super) struct RawSnapshot {
    registrations: Vec<RawRegistration>,
    payment_intents: Vec<RawPaymentIntent>,
    sponsor_slots: Vec<RawSponsorSlot>,
    sponsor_modules: Vec<RawSponsorModule>,
    processed_webhook_event_ids: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawRegistration {
    id: Option<String>,
    event_id: Option<String>,
    organizer_id: Option<String>,
    full_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    city: Option<String>,
    birth_date: Option<NaiveDate>,
    privacy_consent: Option<bool>,
    retention_consent: Option<bool>,
    assigned_number: Option<u32>,
    registration_code: Option<String>,
    registration_status: Option<String>,
    payment_intent_id: Option<String>,
    payment_status: Option<String>,
    payment_amount: Option<Decimal>,
    commission_amount: Option<Decimal>,
    payment_method: Option<String>,
    payment_reference: Option<String>,
    payment_session_expires_at: Option<String>,
    payment_captured_at: Option<String>,
    payment_failed_reason: Option<String>,
    refunded_at: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawPaymentIntent {
    id: Option<String>,
    registration_id: Option<String>,
    event_id: Option<String>,
    organizer_id: Option<String>,
    provider: Option<String>,
    currency: Option<String>,
    amount: Option<Decimal>,
    status: Option<String>,
    idempotency_key: Option<String>,
    provider_payment_intent_id: Option<String>,
    checkout_session_id: Option<String>,
    checkout_url: Option<String>,
    webhook_event_id: Option<String>,
    failure_reason: Option<String>,
    expires_at: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawSponsorSlot {
    id: Option<String>,
    event_id: Option<String>,
    organizer_id: Option<String>,
    sponsor_name: Option<String>,
    sponsor_name_it: Option<String>,
    sponsor_name_en: Option<String>,
    sponsor_url: Option<String>,
    sponsor_logo_url: Option<String>,
    package_days: Option<u32>,
    amount: Option<Decimal>,
    currency: Option<String>,
    contract_terms: Option<ContractTerms>,
    status: Option<String>,
    starts_at: Option<String>,
    ends_at: Option<String>,
    paid_at: Option<String>,
    cancelled_at: Option<String>,
    #[serde(alias = "stripeCheckoutSessionId")]
    checkout_session_id: Option<String>,
    #[serde(alias = "stripePaymentIntentId")]
    provider_payment_intent_id: Option<String>,
    #[serde(alias = "stripePaymentLinkUrl")]
    payment_link_url: Option<String>,
    payer_email: Option<String>,
    failure_reason: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawSponsorModule {
    organizer_id: Option<String>,
    enabled: Option<bool>,
    activation_amount: Option<Decimal>,
    currency: Option<String>,
    checkout_session_id: Option<String>,
    checkout_url: Option<String>,
    activated_at: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Normalization
// ════════════════════════════════════════════════════════════════════════════════

impl From<RawSnapshot> for LedgerSnapshot {
    fn from(raw: RawSnapshot) -> Self {
        let loaded_at = Timestamp::now();
        let processed = raw
            .processed_webhook_event_ids
            .into_iter()
            .filter_map(|id| WebhookEventId::new(id).ok())
            .collect();

        LedgerSnapshot::from_parts(
            raw.registrations
                .into_iter()
                .map(|r| r.normalize(loaded_at))
                .collect(),
            raw.payment_intents
                .into_iter()
                .map(|i| i.normalize(loaded_at))
                .collect(),
            raw.sponsor_slots
                .into_iter()
                .map(|s| s.normalize(loaded_at))
                .collect(),
            raw.sponsor_modules
                .into_iter()
                .filter_map(|m| m.normalize(loaded_at))
                .collect(),
            processed,
        )
    }
}

/// Resolves the registration and payment statuses of a stored registration.
fn registration_statuses(
    registration_status: Option<&str>,
    payment_status: Option<&str>,
    amount: Money,
) -> (RegistrationStatus, PaymentStatus) {
    let legacy_paid = payment_status.map(str::trim) == Some("paid");
    let payment: Option<PaymentStatus> = if legacy_paid {
        Some(PaymentStatus::Captured)
    } else {
        wire_enum(payment_status)
    };

    let status = wire_enum(registration_status).unwrap_or(match payment {
        Some(PaymentStatus::Captured) | Some(PaymentStatus::NotRequired) => {
            RegistrationStatus::Paid
        }
        Some(PaymentStatus::Failed) | Some(PaymentStatus::Expired) => {
            RegistrationStatus::PaymentFailed
        }
        Some(PaymentStatus::Refunded) => RegistrationStatus::Refunded,
        Some(PaymentStatus::Cancelled) => RegistrationStatus::Cancelled,
        _ => RegistrationStatus::PendingPayment,
    });

    let payment = payment.unwrap_or(if amount.is_positive() {
        match status {
            RegistrationStatus::Paid => PaymentStatus::Captured,
            RegistrationStatus::Refunded => PaymentStatus::Refunded,
            RegistrationStatus::Cancelled => PaymentStatus::Cancelled,
            RegistrationStatus::PaymentFailed => PaymentStatus::Failed,
            RegistrationStatus::PendingPayment | RegistrationStatus::PendingCash => {
                PaymentStatus::Pending
            }
        }
    } else {
        PaymentStatus::NotRequired
    });

    (status, payment)
}

impl RawRegistration {
    fn normalize(self, loaded_at: Timestamp) -> Registration {
        let amount = Money::new(self.payment_amount.unwrap_or_default());
        let (registration_status, payment_status) = registration_statuses(
            self.registration_status.as_deref(),
            self.payment_status.as_deref(),
            amount,
        );
        let created_at = timestamp(self.created_at.as_deref()).unwrap_or(loaded_at);

        Registration {
            id: RegistrationId::from_uuid(id_or_new(self.id.as_deref())),
            event_id: EventId::from_uuid(id_or_new(self.event_id.as_deref())),
            organizer_id: OrganizerId::from_uuid(id_or_new(self.organizer_id.as_deref())),
            participant: Participant {
                full_name: text(self.full_name).unwrap_or_default(),
                email: text(self.email).unwrap_or_default().to_lowercase(),
                phone: text(self.phone).unwrap_or_default(),
                city: text(self.city).unwrap_or_default(),
                birth_date: self.birth_date,
            },
            consents: Consents {
                privacy: self.privacy_consent.unwrap_or(false),
                retention: self.retention_consent.unwrap_or(false),
            },
            assigned_number: self.assigned_number,
            registration_code: text(self.registration_code)
                .map(RegistrationCode::from_string)
                .unwrap_or_else(|| RegistrationCode::generate("")),
            registration_status,
            payment_intent_id: optional_id(self.payment_intent_id.as_deref())
                .map(PaymentIntentId::from_uuid),
            payment_status,
            payment_amount: amount,
            commission_amount: Money::new(self.commission_amount.unwrap_or_default()),
            payment_method: wire_enum::<PaymentMethod>(self.payment_method.as_deref()),
            payment_reference: text(self.payment_reference),
            payment_session_expires_at: timestamp(self.payment_session_expires_at.as_deref()),
            payment_captured_at: timestamp(self.payment_captured_at.as_deref()),
            payment_failed_reason: text(self.payment_failed_reason),
            refunded_at: timestamp(self.refunded_at.as_deref()),
            created_at,
            updated_at: timestamp(self.updated_at.as_deref()).unwrap_or(created_at),
        }
    }
}

impl RawPaymentIntent {
    fn normalize(self, loaded_at: Timestamp) -> PaymentIntent {
        let created_at = timestamp(self.created_at.as_deref()).unwrap_or(loaded_at);

        PaymentIntent {
            id: PaymentIntentId::from_uuid(id_or_new(self.id.as_deref())),
            registration_id: RegistrationId::from_uuid(id_or_new(
                self.registration_id.as_deref(),
            )),
            event_id: EventId::from_uuid(id_or_new(self.event_id.as_deref())),
            organizer_id: OrganizerId::from_uuid(id_or_new(self.organizer_id.as_deref())),
            provider: wire_enum(self.provider.as_deref()).unwrap_or_default(),
            currency: currency(self.currency.as_deref()),
            amount: Money::new(self.amount.unwrap_or_default()),
            status: wire_enum(self.status.as_deref()).unwrap_or(PaymentIntentStatus::Pending),
            idempotency_key: text(self.idempotency_key)
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            provider_payment_intent_id: text(self.provider_payment_intent_id),
            checkout_session_id: text(self.checkout_session_id),
            checkout_url: text(self.checkout_url),
            webhook_event_id: self
                .webhook_event_id
                .and_then(|id| WebhookEventId::new(id).ok()),
            failure_reason: text(self.failure_reason),
            expires_at: timestamp(self.expires_at.as_deref())
                .unwrap_or_else(|| created_at.plus_minutes(LEGACY_INTENT_TTL_MINUTES)),
            created_at,
            updated_at: timestamp(self.updated_at.as_deref()).unwrap_or(created_at),
        }
    }
}

impl RawSponsorSlot {
    fn normalize(self, loaded_at: Timestamp) -> SponsorSlot {
        let created_at = timestamp(self.created_at.as_deref()).unwrap_or(loaded_at);
        let package_days = self.package_days.filter(|d| *d > 0).unwrap_or(1);
        let starts_at = timestamp(self.starts_at.as_deref()).unwrap_or(created_at);
        let ends_at = timestamp(self.ends_at.as_deref())
            .unwrap_or_else(|| starts_at.plus_days(i64::from(package_days)));

        let sponsor_name = text(self.sponsor_name)
            .or_else(|| self.sponsor_name_it.clone())
            .or_else(|| self.sponsor_name_en.clone())
            .unwrap_or_default();

        let mut slot = SponsorSlot {
            id: SponsorSlotId::from_uuid(id_or_new(self.id.as_deref())),
            event_id: EventId::from_uuid(id_or_new(self.event_id.as_deref())),
            organizer_id: OrganizerId::from_uuid(id_or_new(self.organizer_id.as_deref())),
            sponsor_name_it: text(self.sponsor_name_it).unwrap_or_else(|| sponsor_name.clone()),
            sponsor_name_en: text(self.sponsor_name_en).unwrap_or_else(|| sponsor_name.clone()),
            sponsor_name,
            sponsor_url: text(self.sponsor_url),
            sponsor_logo_url: text(self.sponsor_logo_url),
            package_days,
            amount: Money::new(self.amount.unwrap_or_default()),
            currency: currency(self.currency.as_deref()),
            contract_terms: self.contract_terms.unwrap_or_default(),
            status: wire_enum(self.status.as_deref()).unwrap_or(SponsorSlotStatus::PendingPayment),
            active: false,
            starts_at,
            ends_at,
            paid_at: timestamp(self.paid_at.as_deref()),
            cancelled_at: timestamp(self.cancelled_at.as_deref()),
            checkout_session_id: text(self.checkout_session_id),
            provider_payment_intent_id: text(self.provider_payment_intent_id),
            payment_link_url: text(self.payment_link_url),
            payer_email: text(self.payer_email).map(|e| e.to_lowercase()),
            failure_reason: text(self.failure_reason),
            created_at,
            updated_at: timestamp(self.updated_at.as_deref()).unwrap_or(created_at),
        };
        slot.active = slot.is_visible_at(&loaded_at);
        slot
    }
}

impl RawSponsorModule {
    fn normalize(self, loaded_at: Timestamp) -> Option<SponsorModuleActivation> {
        let organizer_id = OrganizerId::from_uuid(optional_id(self.organizer_id.as_deref())?);
        let created_at = timestamp(self.created_at.as_deref()).unwrap_or(loaded_at);

        let mut module = SponsorModuleActivation::disabled(
            organizer_id,
            self.activation_amount.map(Money::new),
            currency(self.currency.as_deref()),
            created_at,
        );
        module.enabled = self.enabled.unwrap_or(false);
        module.checkout_session_id = text(self.checkout_session_id);
        module.checkout_url = text(self.checkout_url);
        module.activated_at = timestamp(self.activated_at.as_deref());
        module.updated_at = timestamp(self.updated_at.as_deref()).unwrap_or(created_at);
        Some(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn load(value: serde_json::Value) -> LedgerSnapshot {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn empty_object_loads_as_empty_snapshot() {
        assert_eq!(load(json!({})), LedgerSnapshot::default());
    }

    #[test]
    fn legacy_paid_maps_to_paid_and_captured() {
        let snapshot = load(json!({
            "registrations": [{
                "id": "reg-1",
                "email": "Anna@Example.com",
                "paymentStatus": "paid",
                "paymentAmount": 25.0
            }]
        }));
        let r = &snapshot.registrations()[0];
        assert_eq!(r.registration_status, RegistrationStatus::Paid);
        assert_eq!(r.payment_status, PaymentStatus::Captured);
        assert_eq!(r.participant.email, "anna@example.com");
        assert_eq!(r.payment_amount, Money::new(dec!(25)));
    }

    #[test]
    fn missing_status_defaults_to_pending_payment() {
        let snapshot = load(json!({
            "registrations": [{ "id": "reg-2", "paymentAmount": 10 }]
        }));
        let r = &snapshot.registrations()[0];
        assert_eq!(r.registration_status, RegistrationStatus::PendingPayment);
        assert_eq!(r.payment_status, PaymentStatus::Pending);
    }

    #[test]
    fn free_registration_without_status_is_not_required() {
        let snapshot = load(json!({ "registrations": [{ "id": "reg-3" }] }));
        assert_eq!(
            snapshot.registrations()[0].payment_status,
            PaymentStatus::NotRequired
        );
    }

    #[test]
    fn legacy_ids_map_deterministically() {
        let a = load(json!({ "registrations": [{ "id": "reg-legacy" }] }));
        let b = load(json!({ "registrations": [{ "id": "reg-legacy" }] }));
        assert_eq!(a.registrations()[0].id, b.registrations()[0].id);
        assert_eq!(
            *a.registrations()[0].id.as_uuid(),
            legacy_uuid("reg-legacy")
        );
    }

    #[test]
    fn uuid_ids_are_kept() {
        let id = Uuid::new_v4();
        assert_eq!(legacy_uuid(&id.to_string()), id);
    }

    #[test]
    fn intent_defaults_to_manual_pending_with_fifteen_minute_expiry() {
        let snapshot = load(json!({
            "paymentIntents": [{
                "id": "pi-1",
                "status": "something_new",
                "provider": "manual_demo",
                "createdAt": "2025-05-01T10:00:00Z"
            }]
        }));
        let i = &snapshot.payment_intents()[0];
        assert_eq!(i.provider, PaymentProvider::Manual);
        assert_eq!(i.status, PaymentIntentStatus::Pending);
        assert_eq!(i.currency, Currency::Eur);
        assert_eq!(
            i.expires_at,
            Timestamp::parse_rfc3339("t", "2025-05-01T10:15:00Z").unwrap()
        );
    }

    #[test]
    fn slot_defaults_fill_missing_fields() {
        let snapshot = load(json!({
            "sponsorSlots": [{
                "id": "slot-1",
                "sponsorName": "Bici",
                "currency": "eur",
                "startsAt": "2025-05-01T10:00:00Z",
                "stripeCheckoutSessionId": "cs_1"
            }]
        }));
        let s = &snapshot.sponsor_slots()[0];
        assert_eq!(s.package_days, 1);
        assert_eq!(s.status, SponsorSlotStatus::PendingPayment);
        assert_eq!(s.sponsor_name_en, "Bici");
        assert_eq!(s.checkout_session_id.as_deref(), Some("cs_1"));
        assert_eq!(
            s.ends_at,
            Timestamp::parse_rfc3339("t", "2025-05-02T10:00:00Z").unwrap()
        );
        assert!(!s.active);
    }

    #[test]
    fn blank_and_repeated_webhook_ids_are_dropped() {
        let snapshot = load(json!({
            "processedWebhookEventIds": ["evt_2", " ", "evt_1", "evt_2"]
        }));
        assert_eq!(snapshot.processed_webhook_event_ids().len(), 2);
        assert!(snapshot.has_processed(&WebhookEventId::new("evt_1").unwrap()));
    }
}
