//! Composite transitions over a registration and its payment intent.
//!
//! Both halves are validated before either is touched, so a rejected
//! transition leaves the pair exactly as it was.

use crate::domain::foundation::{StateMachine, Timestamp};

use super::{
    EntityKind, PaymentError, PaymentIntent, PaymentIntentStatus, PaymentStatus, Registration,
    RegistrationStatus,
};

/// Target statuses for a registration/intent pair.
///
/// `None` leaves that half's status unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairTransition {
    registration: Option<RegistrationStatus>,
    intent: Option<PaymentIntentStatus>,
    reason: Option<String>,
}

/// Updated copies produced by [`PairTransition::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionedPair {
    pub registration: Registration,
    /// Present only when the intent half changed.
    pub intent: Option<PaymentIntent>,
}

impl PairTransition {
    /// Moves both halves together.
    pub fn pair(registration: RegistrationStatus, intent: PaymentIntentStatus) -> Self {
        Self {
            registration: Some(registration),
            intent: Some(intent),
            reason: None,
        }
    }

    /// Moves the intent only; the registration mirrors its payment status.
    pub fn intent_only(intent: PaymentIntentStatus) -> Self {
        Self {
            registration: None,
            intent: Some(intent),
            reason: None,
        }
    }

    /// Moves the registration only.
    pub fn registration_only(registration: RegistrationStatus) -> Self {
        Self {
            registration: Some(registration),
            intent: None,
            reason: None,
        }
    }

    /// Failure reason recorded on both halves.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn registration_target(&self) -> Option<RegistrationStatus> {
        self.registration
    }

    pub fn intent_target(&self) -> Option<PaymentIntentStatus> {
        self.intent
    }

    /// Checks the intent half first, then the registration half.
    pub fn validate(
        &self,
        registration: &Registration,
        intent: Option<&PaymentIntent>,
    ) -> Result<(), PaymentError> {
        if let Some(target) = self.intent {
            let intent = intent.ok_or_else(|| {
                PaymentError::not_found(
                    EntityKind::PaymentIntent,
                    registration
                        .payment_intent_id
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| format!("for registration {}", registration.id)),
                )
            })?;
            if !intent.status.can_transition_to(&target) {
                return Err(PaymentError::invalid_transition(
                    EntityKind::PaymentIntent,
                    intent.status,
                    target,
                ));
            }
        }

        if let Some(target) = self.registration {
            if !registration.registration_status.can_transition_to(&target) {
                return Err(PaymentError::invalid_transition(
                    EntityKind::Registration,
                    registration.registration_status,
                    target,
                ));
            }
        }

        Ok(())
    }

    /// Validates, then returns updated copies stamped with `at`.
    pub fn apply(
        &self,
        registration: &Registration,
        intent: Option<&PaymentIntent>,
        at: Timestamp,
    ) -> Result<TransitionedPair, PaymentError> {
        self.validate(registration, intent)?;

        let mut next_registration = registration.clone();
        if let Some(target) = self.registration {
            next_registration.registration_status = target;
        }
        next_registration.updated_at = at;

        let next_intent = match (self.intent, intent) {
            (Some(target), Some(current)) => {
                let mut next = current.clone();
                next.status = target;
                next.failure_reason = self.reason.clone();
                next.updated_at = at;
                next_registration.payment_status = PaymentStatus::from(target);
                Some(next)
            }
            _ => None,
        };

        if self.registration.is_some() || next_intent.is_some() {
            next_registration.payment_failed_reason = self.reason.clone();
        }

        Ok(TransitionedPair {
            registration: next_registration,
            intent: next_intent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Currency, EventId, Money, OrganizerId};
    use crate::domain::registration::aggregate::test_support::{consents, participant};
    use crate::domain::registration::{PaymentProvider, RegistrationCode};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn now() -> Timestamp {
        Timestamp::parse_rfc3339("t", "2025-05-01T10:00:00Z").unwrap()
    }

    fn pair(
        reg_status: RegistrationStatus,
        intent_status: PaymentIntentStatus,
    ) -> (Registration, PaymentIntent) {
        let mut reg = Registration::pending_payment(
            EventId::new(),
            OrganizerId::new(),
            participant("a@b.it"),
            consents(),
            RegistrationCode::from_string("RUN-00001"),
            Money::new(dec!(25)),
            Money::new(dec!(0.75)),
            now().plus_minutes(15),
            now(),
        );
        let mut intent = PaymentIntent::open(
            &reg,
            PaymentProvider::Stripe,
            Currency::Eur,
            now().plus_minutes(15),
            now(),
        );
        reg.payment_intent_id = Some(intent.id);
        reg.registration_status = reg_status;
        intent.status = intent_status;
        (reg, intent)
    }

    #[test]
    fn pair_moves_both_and_mirrors_payment_status() {
        let (reg, intent) = pair(RegistrationStatus::PendingPayment, PaymentIntentStatus::Pending);
        let later = now().plus_minutes(2);
        let out = PairTransition::pair(RegistrationStatus::Paid, PaymentIntentStatus::Captured)
            .apply(&reg, Some(&intent), later)
            .unwrap();

        assert_eq!(out.registration.registration_status, RegistrationStatus::Paid);
        assert_eq!(out.registration.payment_status, PaymentStatus::Captured);
        assert_eq!(out.registration.updated_at, later);
        let next_intent = out.intent.unwrap();
        assert_eq!(next_intent.status, PaymentIntentStatus::Captured);
        assert_eq!(next_intent.updated_at, later);
    }

    #[test]
    fn invalid_intent_half_rejects_whole_pair() {
        let (reg, intent) = pair(RegistrationStatus::PendingPayment, PaymentIntentStatus::Captured);
        let err = PairTransition::pair(RegistrationStatus::Paid, PaymentIntentStatus::Captured)
            .apply(&reg, Some(&intent), now())
            .unwrap_err();

        assert_eq!(
            err,
            PaymentError::invalid_transition(EntityKind::PaymentIntent, "captured", "captured")
        );
    }

    #[test]
    fn invalid_registration_half_rejects_whole_pair() {
        let (reg, intent) = pair(RegistrationStatus::PaymentFailed, PaymentIntentStatus::Pending);
        let err = PairTransition::pair(RegistrationStatus::Paid, PaymentIntentStatus::Captured)
            .validate(&reg, Some(&intent))
            .unwrap_err();

        assert_eq!(
            err,
            PaymentError::invalid_transition(EntityKind::Registration, "payment_failed", "paid")
        );
    }

    #[test]
    fn missing_intent_is_not_found() {
        let (reg, _) = pair(RegistrationStatus::PendingPayment, PaymentIntentStatus::Pending);
        let err = PairTransition::intent_only(PaymentIntentStatus::Cancelled)
            .validate(&reg, None)
            .unwrap_err();
        assert!(matches!(
            err,
            PaymentError::NotFound {
                entity: EntityKind::PaymentIntent,
                ..
            }
        ));
    }

    #[test]
    fn reason_lands_on_both_halves() {
        let (reg, intent) = pair(RegistrationStatus::PendingPayment, PaymentIntentStatus::Pending);
        let out = PairTransition::pair(
            RegistrationStatus::PaymentFailed,
            PaymentIntentStatus::Failed,
        )
        .with_reason("card declined")
        .apply(&reg, Some(&intent), now())
        .unwrap();

        assert_eq!(out.registration.payment_failed_reason.as_deref(), Some("card declined"));
        assert_eq!(out.intent.unwrap().failure_reason.as_deref(), Some("card declined"));
    }

    #[test]
    fn intent_only_keeps_registration_status() {
        let (reg, intent) = pair(RegistrationStatus::PendingPayment, PaymentIntentStatus::Pending);
        let out = PairTransition::intent_only(PaymentIntentStatus::RequiresAction)
            .apply(&reg, Some(&intent), now())
            .unwrap();
        assert_eq!(out.registration.registration_status, RegistrationStatus::PendingPayment);
        assert_eq!(out.registration.payment_status, PaymentStatus::RequiresAction);
    }

    fn any_reg() -> impl Strategy<Value = RegistrationStatus> {
        prop::sample::select(RegistrationStatus::ALL.to_vec())
    }

    fn any_intent() -> impl Strategy<Value = PaymentIntentStatus> {
        prop::sample::select(PaymentIntentStatus::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn rejected_pairs_leave_inputs_untouched(
            reg_from in any_reg(),
            intent_from in any_intent(),
            reg_to in any_reg(),
            intent_to in any_intent(),
        ) {
            let (reg, intent) = pair(reg_from, intent_from);
            let before = (reg.clone(), intent.clone());
            let result = PairTransition::pair(reg_to, intent_to).apply(&reg, Some(&intent), now());
            let legal = reg_from.can_transition_to(&reg_to) && intent_from.can_transition_to(&intent_to);

            prop_assert_eq!(result.is_ok(), legal);
            prop_assert_eq!((reg, intent), before);
        }
    }
}
