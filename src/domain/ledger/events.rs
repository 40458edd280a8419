//! Notifications emitted after a commit.
//!
//! Published by the application layer once the new snapshot is in place.
//! Subscribers send confirmation emails or sync remote copies; a failure
//! there never rolls a commit back.

use serde::Serialize;

use crate::domain::foundation::{
    EventId, OrganizerId, PaymentIntentId, RegistrationId, SponsorSlotId, Timestamp,
};
use crate::domain::registration::{Registration, RegistrationStatus};
use crate::domain::sponsor::{SponsorSlot, SponsorSlotStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    RegistrationSubmitted {
        registration_id: RegistrationId,
        event_id: EventId,
        payment_intent_id: Option<PaymentIntentId>,
        occurred_at: Timestamp,
    },
    RegistrationConfirmed {
        registration_id: RegistrationId,
        event_id: EventId,
        email: String,
        registration_code: String,
        assigned_number: Option<u32>,
        occurred_at: Timestamp,
    },
    PaymentFailed {
        registration_id: RegistrationId,
        reason: Option<String>,
        occurred_at: Timestamp,
    },
    RegistrationCancelled {
        registration_id: RegistrationId,
        occurred_at: Timestamp,
    },
    RegistrationRefunded {
        registration_id: RegistrationId,
        occurred_at: Timestamp,
    },
    SponsorSlotChanged {
        sponsor_slot_id: SponsorSlotId,
        event_id: EventId,
        status: SponsorSlotStatus,
        occurred_at: Timestamp,
    },
    SponsorModuleEnabled {
        organizer_id: OrganizerId,
        occurred_at: Timestamp,
    },
}

impl LedgerEvent {
    /// Dotted routing name, e.g. `registration.confirmed`.
    pub fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::RegistrationSubmitted { .. } => "registration.submitted",
            LedgerEvent::RegistrationConfirmed { .. } => "registration.confirmed",
            LedgerEvent::PaymentFailed { .. } => "registration.payment_failed",
            LedgerEvent::RegistrationCancelled { .. } => "registration.cancelled",
            LedgerEvent::RegistrationRefunded { .. } => "registration.refunded",
            LedgerEvent::SponsorSlotChanged { .. } => "sponsor_slot.changed",
            LedgerEvent::SponsorModuleEnabled { .. } => "sponsor_module.enabled",
        }
    }

    /// Event for a registration that just reached `status`, if it is notable.
    pub fn for_registration(registration: &Registration) -> Option<Self> {
        let occurred_at = registration.updated_at;
        let registration_id = registration.id;
        match registration.registration_status {
            RegistrationStatus::Paid => Some(LedgerEvent::RegistrationConfirmed {
                registration_id,
                event_id: registration.event_id,
                email: registration.participant.email.clone(),
                registration_code: registration.registration_code.to_string(),
                assigned_number: registration.assigned_number,
                occurred_at,
            }),
            RegistrationStatus::PaymentFailed => Some(LedgerEvent::PaymentFailed {
                registration_id,
                reason: registration.payment_failed_reason.clone(),
                occurred_at,
            }),
            RegistrationStatus::Cancelled => Some(LedgerEvent::RegistrationCancelled {
                registration_id,
                occurred_at,
            }),
            RegistrationStatus::Refunded => Some(LedgerEvent::RegistrationRefunded {
                registration_id,
                occurred_at,
            }),
            RegistrationStatus::PendingPayment | RegistrationStatus::PendingCash => None,
        }
    }

    pub fn for_sponsor_slot(slot: &SponsorSlot) -> Self {
        LedgerEvent::SponsorSlotChanged {
            sponsor_slot_id: slot.id,
            event_id: slot.event_id,
            status: slot.status,
            occurred_at: slot.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::registration::aggregate::test_support::{consents, participant};
    use crate::domain::registration::RegistrationCode;

    #[test]
    fn paid_registration_emits_confirmation() {
        let mut reg = Registration::free(
            EventId::new(),
            OrganizerId::new(),
            participant("a@b.it"),
            consents(),
            RegistrationCode::from_string("RUN-00001"),
            Timestamp::now(),
        );
        reg.assigned_number = Some(4);

        let event = LedgerEvent::for_registration(&reg).unwrap();
        assert_eq!(event.event_type(), "registration.confirmed");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "registration_confirmed");
        assert_eq!(json["assigned_number"], 4);
    }

    #[test]
    fn pending_registration_emits_nothing() {
        let mut reg = Registration::free(
            EventId::new(),
            OrganizerId::new(),
            participant("a@b.it"),
            consents(),
            RegistrationCode::from_string("RUN-00001"),
            Timestamp::now(),
        );
        reg.registration_status = RegistrationStatus::PendingCash;
        assert!(LedgerEvent::for_registration(&reg).is_none());
    }
}
