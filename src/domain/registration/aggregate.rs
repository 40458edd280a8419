//! Registration entity and participant value objects.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::foundation::{
    EventId, Money, OrganizerId, PaymentIntentId, RegistrationId, StateMachine, Timestamp,
    ValidationError,
};

use super::{PaymentStatus, RegistrationStatus};

/// Participant identity as captured by the registration form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub full_name: String,
    /// Always stored lower-cased; used for per-event deduplication.
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
}

impl Participant {
    /// Builds a participant, trimming fields and lower-casing the email.
    pub fn new(
        full_name: &str,
        email: &str,
        phone: &str,
        city: &str,
        birth_date: Option<NaiveDate>,
    ) -> Result<Self, ValidationError> {
        let full_name = full_name.trim();
        if full_name.is_empty() {
            return Err(ValidationError::empty_field("full_name"));
        }
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(ValidationError::empty_field("email"));
        }
        let at = email.find('@');
        if at.map_or(true, |i| i == 0 || i + 1 >= email.len()) {
            return Err(ValidationError::invalid_format("email", "expected name@domain"));
        }
        Ok(Self {
            full_name: full_name.to_string(),
            email,
            phone: phone.trim().to_string(),
            city: city.trim().to_string(),
            birth_date,
        })
    }
}

/// Consent flags collected at submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consents {
    #[serde(rename = "privacyConsent")]
    pub privacy: bool,
    #[serde(rename = "retentionConsent")]
    pub retention: bool,
}

/// How the participant settles the fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Cash,
}

/// Human-facing registration code, `TAG-XXXXX`.
///
/// The tag is the first three characters of the event name upper-cased,
/// non-alphanumerics replaced by `X`, padded to three.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrationCode(String);

impl RegistrationCode {
    const ALPHABET: &'static [u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

    /// Generates a fresh code for the given event name.
    pub fn generate(event_name: &str) -> Self {
        let mut tag: String = event_name
            .chars()
            .take(3)
            .flat_map(char::to_uppercase)
            .map(|c| if c.is_ascii_alphanumeric() { c } else { 'X' })
            .take(3)
            .collect();
        while tag.len() < 3 {
            tag.push('X');
        }

        let mut entropy = Uuid::new_v4().as_u128();
        let mut tail = String::with_capacity(5);
        for _ in 0..5 {
            tail.push(Self::ALPHABET[(entropy % 36) as usize] as char);
            entropy /= 36;
        }

        Self(format!("{}-{}", tag, tail))
    }

    /// Wraps an already issued code.
    pub fn from_string(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegistrationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A participant's registration to one event.
///
/// Mutated only through validated transitions; `assigned_number` is set at
/// most once and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: RegistrationId,
    pub event_id: EventId,
    pub organizer_id: OrganizerId,
    #[serde(flatten)]
    pub participant: Participant,
    #[serde(flatten)]
    pub consents: Consents,
    pub assigned_number: Option<u32>,
    pub registration_code: RegistrationCode,
    pub registration_status: RegistrationStatus,
    pub payment_intent_id: Option<PaymentIntentId>,
    pub payment_status: PaymentStatus,
    pub payment_amount: Money,
    pub commission_amount: Money,
    pub payment_method: Option<PaymentMethod>,
    pub payment_reference: Option<String>,
    pub payment_session_expires_at: Option<Timestamp>,
    pub payment_captured_at: Option<Timestamp>,
    pub payment_failed_reason: Option<String>,
    pub refunded_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Registration {
    /// Free registration: confirmed immediately, no payment intent.
    pub fn free(
        event_id: EventId,
        organizer_id: OrganizerId,
        participant: Participant,
        consents: Consents,
        code: RegistrationCode,
        now: Timestamp,
    ) -> Self {
        Self {
            id: RegistrationId::new(),
            event_id,
            organizer_id,
            participant,
            consents,
            assigned_number: None,
            registration_code: code,
            registration_status: RegistrationStatus::Paid,
            payment_intent_id: None,
            payment_status: PaymentStatus::NotRequired,
            payment_amount: Money::ZERO,
            commission_amount: Money::ZERO,
            payment_method: None,
            payment_reference: None,
            payment_session_expires_at: None,
            payment_captured_at: Some(now),
            payment_failed_reason: None,
            refunded_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Paid registration awaiting its first payment intent to settle.
    #[allow(clippy::too_many_arguments)]
    pub fn pending_payment(
        event_id: EventId,
        organizer_id: OrganizerId,
        participant: Participant,
        consents: Consents,
        code: RegistrationCode,
        amount: Money,
        commission: Money,
        session_expires_at: Timestamp,
        now: Timestamp,
    ) -> Self {
        Self {
            id: RegistrationId::new(),
            event_id,
            organizer_id,
            participant,
            consents,
            assigned_number: None,
            registration_code: code,
            registration_status: RegistrationStatus::PendingPayment,
            payment_intent_id: None,
            payment_status: PaymentStatus::Pending,
            payment_amount: amount,
            commission_amount: commission,
            payment_method: Some(PaymentMethod::Card),
            payment_reference: None,
            payment_session_expires_at: Some(session_expires_at),
            payment_captured_at: None,
            payment_failed_reason: None,
            refunded_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true once the registration can no longer change status.
    pub fn is_terminal(&self) -> bool {
        self.registration_status.is_terminal()
    }

    /// Whether the payment deadline passed strictly before `now`.
    pub fn session_expired(&self, now: &Timestamp) -> bool {
        self.registration_status.is_awaiting_payment()
            && self
                .payment_session_expires_at
                .map_or(false, |deadline| deadline.is_before(now))
    }

    /// Sets the sequential number unless one was already assigned.
    pub fn assign_number_once(&mut self, number: Option<u32>) {
        if self.assigned_number.is_none() {
            self.assigned_number = number;
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use rust_decimal_macros::dec;

    fn at(s: &str) -> Timestamp {
        Timestamp::parse_rfc3339("test", s).unwrap()
    }

    #[test]
    fn participant_lowercases_email_and_trims() {
        let p = Participant::new("  Anna ", " Anna@Example.COM ", "", "", None).unwrap();
        assert_eq!(p.full_name, "Anna");
        assert_eq!(p.email, "anna@example.com");
    }

    #[test]
    fn participant_rejects_missing_name_or_bad_email() {
        assert!(Participant::new(" ", "a@b.it", "", "", None).is_err());
        assert!(Participant::new("Anna", "", "", "", None).is_err());
        assert!(Participant::new("Anna", "anna.example.com", "", "", None).is_err());
        assert!(Participant::new("Anna", "anna@", "", "", None).is_err());
    }

    #[test]
    fn registration_code_uses_event_tag() {
        let code = RegistrationCode::generate("Trail del Monte");
        assert!(code.as_str().starts_with("TRA-"));
        assert_eq!(code.as_str().len(), 9);
    }

    #[test]
    fn registration_code_pads_and_replaces_symbols() {
        assert!(RegistrationCode::generate("5k").as_str().starts_with("5KX-"));
        assert!(RegistrationCode::generate("a b").as_str().starts_with("AXB-"));
        assert!(RegistrationCode::generate("").as_str().starts_with("XXX-"));
    }

    #[test]
    fn free_registration_is_paid_without_intent() {
        let now = at("2025-05-01T10:00:00Z");
        let reg = Registration::free(
            EventId::new(),
            OrganizerId::new(),
            participant("a@b.it"),
            consents(),
            RegistrationCode::from_string("RUN-00001"),
            now,
        );
        assert_eq!(reg.registration_status, RegistrationStatus::Paid);
        assert_eq!(reg.payment_status, PaymentStatus::NotRequired);
        assert!(reg.payment_intent_id.is_none());
        assert_eq!(reg.payment_captured_at, Some(now));
    }

    #[test]
    fn session_expired_requires_strictly_past_deadline() {
        let now = at("2025-05-01T10:00:00Z");
        let reg = Registration::pending_payment(
            EventId::new(),
            OrganizerId::new(),
            participant("a@b.it"),
            consents(),
            RegistrationCode::from_string("RUN-00001"),
            Money::new(dec!(25)),
            Money::new(dec!(0.75)),
            now,
            now,
        );
        assert!(!reg.session_expired(&now));
        assert!(reg.session_expired(&now.plus_minutes(1)));
    }

    #[test]
    fn assign_number_once_never_overwrites() {
        let now = at("2025-05-01T10:00:00Z");
        let mut reg = Registration::free(
            EventId::new(),
            OrganizerId::new(),
            participant("a@b.it"),
            consents(),
            RegistrationCode::from_string("RUN-00001"),
            now,
        );
        reg.assign_number_once(Some(7));
        reg.assign_number_once(Some(9));
        assert_eq!(reg.assigned_number, Some(7));
    }

    #[test]
    fn registration_serializes_flat_camel_case() {
        let now = at("2025-05-01T10:00:00Z");
        let reg = Registration::free(
            EventId::new(),
            OrganizerId::new(),
            participant("a@b.it"),
            consents(),
            RegistrationCode::from_string("RUN-00001"),
            now,
        );
        let json = serde_json::to_value(&reg).unwrap();
        assert_eq!(json["email"], "a@b.it");
        assert_eq!(json["privacyConsent"], true);
        assert_eq!(json["registrationStatus"], "paid");
        assert_eq!(json["paymentStatus"], "not_required");
    }
}
