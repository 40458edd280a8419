//! Per-organizer sponsor module toggle.
//!
//! Organizers pay once to unlock sponsor slots. Enabling is idempotent and
//! never reverts.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Currency, Money, OrganizerId, Timestamp};
use crate::domain::registration::{EntityKind, PaymentError};

use super::SponsorEvent;

/// Activation price when the organizer has none configured.
pub const DEFAULT_ACTIVATION_AMOUNT: Money = Money::from_whole(25);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorModuleActivation {
    pub organizer_id: OrganizerId,
    pub enabled: bool,
    pub activation_amount: Money,
    pub currency: Currency,
    pub checkout_session_id: Option<String>,
    pub checkout_url: Option<String>,
    pub activated_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl SponsorModuleActivation {
    /// A disabled module priced at `activation_amount`, or the default when not positive.
    pub fn disabled(
        organizer_id: OrganizerId,
        activation_amount: Option<Money>,
        currency: Currency,
        now: Timestamp,
    ) -> Self {
        let activation_amount = activation_amount
            .filter(Money::is_positive)
            .unwrap_or(DEFAULT_ACTIVATION_AMOUNT);
        Self {
            organizer_id,
            enabled: false,
            activation_amount,
            currency,
            checkout_session_id: None,
            checkout_url: None,
            activated_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Checkout already created and awaiting completion.
    pub fn has_open_checkout(&self) -> bool {
        !self.enabled && self.checkout_url.is_some()
    }

    /// Records the provider session opened for activation.
    pub fn with_checkout(&self, session_id: String, url: String, at: Timestamp) -> Self {
        let mut next = self.clone();
        next.checkout_session_id = Some(session_id);
        next.checkout_url = Some(url);
        next.updated_at = at;
        next
    }

    /// Applies a provider event addressed to this organizer's module.
    ///
    /// Completion enables the module; expiry or failure drops the open
    /// checkout so a new one can be created. Refunds are not supported.
    pub fn apply_event(&self, event: SponsorEvent, at: Timestamp) -> Result<Self, PaymentError> {
        let mut next = self.clone();
        match event {
            SponsorEvent::CheckoutCompleted => {
                if !next.enabled {
                    next.enabled = true;
                    next.activated_at = Some(at);
                }
            }
            SponsorEvent::CheckoutExpired | SponsorEvent::PaymentFailed => {
                if next.enabled {
                    return Err(self.rejects(event));
                }
                next.checkout_session_id = None;
                next.checkout_url = None;
            }
            SponsorEvent::Refunded => return Err(self.rejects(event)),
        }
        next.updated_at = at;
        Ok(next)
    }

    fn rejects(&self, event: SponsorEvent) -> PaymentError {
        let current = if self.enabled { "enabled" } else { "disabled" };
        PaymentError::invalid_transition(EntityKind::SponsorModule, current, event.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn now() -> Timestamp {
        Timestamp::parse_rfc3339("t", "2025-05-01T10:00:00Z").unwrap()
    }

    #[test]
    fn default_amount_is_twenty_five() {
        let m = SponsorModuleActivation::disabled(OrganizerId::new(), None, Currency::Eur, now());
        assert_eq!(m.activation_amount, Money::new(dec!(25)));

        let m = SponsorModuleActivation::disabled(
            OrganizerId::new(),
            Some(Money::ZERO),
            Currency::Eur,
            now(),
        );
        assert_eq!(m.activation_amount, DEFAULT_ACTIVATION_AMOUNT);
    }

    #[test]
    fn completion_enables_once() {
        let m = SponsorModuleActivation::disabled(OrganizerId::new(), None, Currency::Eur, now());
        let first = m.apply_event(SponsorEvent::CheckoutCompleted, now()).unwrap();
        assert!(first.enabled);
        assert_eq!(first.activated_at, Some(now()));

        let again = first
            .apply_event(SponsorEvent::CheckoutCompleted, now().plus_days(1))
            .unwrap();
        assert_eq!(again.activated_at, Some(now()));
    }

    #[test]
    fn expiry_clears_open_checkout() {
        let m = SponsorModuleActivation::disabled(OrganizerId::new(), None, Currency::Eur, now())
            .with_checkout("cs_1".into(), "https://pay/cs_1".into(), now());
        assert!(m.has_open_checkout());
        let next = m.apply_event(SponsorEvent::CheckoutExpired, now()).unwrap();
        assert!(!next.has_open_checkout());
        assert!(!next.enabled);
    }

    #[test]
    fn refund_is_rejected() {
        let m = SponsorModuleActivation::disabled(OrganizerId::new(), None, Currency::Eur, now());
        let err = m.apply_event(SponsorEvent::Refunded, now()).unwrap_err();
        assert!(matches!(
            err,
            PaymentError::InvalidTransition {
                entity: EntityKind::SponsorModule,
                ..
            }
        ));
    }
}
