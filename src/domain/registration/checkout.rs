//! Participant checkout planning.
//!
//! Opening a hosted checkout is split in three steps around the provider
//! call: [`plan_checkout`] decides (and possibly creates the intent) inside
//! one commit, the gateway is called outside it, then [`attach_checkout`]
//! or [`fail_checkout`] records the result in a second commit.

use crate::domain::foundation::{Currency, PaymentIntentId, RegistrationId, Timestamp};
use crate::domain::ledger::LedgerSnapshot;

use super::{
    EntityKind, PairTransition, PaymentError, PaymentIntent, PaymentIntentStatus, PaymentProvider,
    PaymentStatus, Registration, RegistrationStatus,
};

/// Prefix of the failure reason stored when the provider rejects a session.
pub const CHECKOUT_FAILED_PREFIX: &str = "Checkout session creation failed";

/// What a checkout request resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutPlan {
    /// Registration is terminal; report its state as is.
    Final {
        registration: Registration,
        intent: Option<PaymentIntent>,
    },
    /// Open intent already has a live checkout url.
    Reuse {
        registration: Registration,
        intent: PaymentIntent,
    },
    /// A provider session must be opened for `intent`.
    Open {
        registration: Registration,
        intent: PaymentIntent,
        /// The intent was created by this request and is failed if the provider errors.
        created: bool,
    },
}

/// Decides how to serve a checkout for `registration_id`.
///
/// When no intent is open a fresh `pending` one is created and linked, and
/// the next snapshot is returned alongside the plan. Running this under the
/// ledger lock makes "open intent exists" a compare-and-swap.
pub fn plan_checkout(
    snapshot: &LedgerSnapshot,
    registration_id: RegistrationId,
    currency: Currency,
    session_expires_at: Timestamp,
    now: Timestamp,
) -> Result<(Option<LedgerSnapshot>, CheckoutPlan), PaymentError> {
    let registration = snapshot
        .registration(registration_id)
        .ok_or_else(|| PaymentError::not_found(EntityKind::Registration, registration_id))?;

    if registration.is_terminal() {
        let intent = registration
            .payment_intent_id
            .and_then(|id| snapshot.payment_intent(id))
            .cloned();
        return Ok((
            None,
            CheckoutPlan::Final {
                registration: registration.clone(),
                intent,
            },
        ));
    }

    registration.payment_amount.ensure_chargeable("paymentAmount")?;

    if registration.registration_status == RegistrationStatus::PendingCash {
        return Err(PaymentError::invalid_transition(
            EntityKind::Registration,
            RegistrationStatus::PendingCash,
            RegistrationStatus::PendingPayment,
        ));
    }

    if let Some(intent) = snapshot.open_intent_for(registration_id) {
        let live_url = intent.status == PaymentIntentStatus::RequiresAction
            && intent.checkout_url.is_some()
            && !intent.is_expired_at(&now);
        let plan = if live_url {
            CheckoutPlan::Reuse {
                registration: registration.clone(),
                intent: intent.clone(),
            }
        } else {
            CheckoutPlan::Open {
                registration: registration.clone(),
                intent: intent.clone(),
                created: false,
            }
        };
        return Ok((None, plan));
    }

    let intent = PaymentIntent::open(
        registration,
        PaymentProvider::Stripe,
        currency,
        session_expires_at,
        now,
    );
    let mut linked = registration.clone();
    linked.payment_intent_id = Some(intent.id);
    linked.payment_status = PaymentStatus::Pending;
    linked.updated_at = now;

    let mut next = snapshot.clone();
    next.upsert_payment_intent(intent.clone());
    next.upsert_registration(linked.clone());

    Ok((
        Some(next),
        CheckoutPlan::Open {
            registration: linked,
            intent,
            created: true,
        },
    ))
}

/// Provider session details recorded on the intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedSession<'a> {
    pub session_id: &'a str,
    pub url: &'a str,
    pub provider_payment_intent_id: Option<&'a str>,
}

/// Moves the intent to `requires_action` and stores the session on it.
///
/// An intent already in `requires_action` keeps its status and only gets
/// the fresh references. The registration gets a new session deadline and
/// its failure reason cleared.
pub fn attach_checkout(
    snapshot: &LedgerSnapshot,
    intent_id: PaymentIntentId,
    session: &OpenedSession<'_>,
    session_expires_at: Timestamp,
    now: Timestamp,
) -> Result<(LedgerSnapshot, Registration, PaymentIntent), PaymentError> {
    let intent = snapshot
        .payment_intent(intent_id)
        .ok_or_else(|| PaymentError::not_found(EntityKind::PaymentIntent, intent_id))?;
    let registration = snapshot
        .registration(intent.registration_id)
        .ok_or_else(|| PaymentError::not_found(EntityKind::Registration, intent.registration_id))?;

    let (mut next_registration, mut next_intent) =
        if intent.status == PaymentIntentStatus::RequiresAction
            && registration.registration_status == RegistrationStatus::PendingPayment
        {
            let mut r = registration.clone();
            r.payment_status = PaymentStatus::RequiresAction;
            r.payment_failed_reason = None;
            (r, intent.clone())
        } else {
            let pair = PairTransition::intent_only(PaymentIntentStatus::RequiresAction).apply(
                registration,
                Some(intent),
                now,
            )?;
            let next_intent = pair
                .intent
                .ok_or_else(|| PaymentError::not_found(EntityKind::PaymentIntent, intent_id))?;
            (pair.registration, next_intent)
        };

    next_intent.provider_payment_intent_id = session
        .provider_payment_intent_id
        .map(str::to_string)
        .or_else(|| intent.provider_payment_intent_id.clone());
    next_intent.checkout_session_id = Some(session.session_id.to_string());
    next_intent.checkout_url = Some(session.url.to_string());
    next_intent.failure_reason = None;
    next_intent.expires_at = session_expires_at;
    next_intent.updated_at = now;

    next_registration.payment_intent_id = Some(next_intent.id);
    next_registration.payment_session_expires_at = Some(session_expires_at);
    next_registration.updated_at = now;

    let mut next = snapshot.clone();
    next.upsert_payment_intent(next_intent.clone());
    next.upsert_registration(next_registration.clone());
    Ok((next, next_registration, next_intent))
}

/// Fails an intent whose provider session could not be created.
///
/// Returns `None` when the intent is no longer open, e.g. because a
/// webhook settled it in the meantime.
pub fn fail_checkout(
    snapshot: &LedgerSnapshot,
    intent_id: PaymentIntentId,
    detail: &str,
    now: Timestamp,
) -> Result<Option<LedgerSnapshot>, PaymentError> {
    let intent = snapshot
        .payment_intent(intent_id)
        .ok_or_else(|| PaymentError::not_found(EntityKind::PaymentIntent, intent_id))?;
    if !intent.status.is_open() {
        return Ok(None);
    }
    let registration = snapshot
        .registration(intent.registration_id)
        .ok_or_else(|| PaymentError::not_found(EntityKind::Registration, intent.registration_id))?;

    let pair = PairTransition::intent_only(PaymentIntentStatus::Failed)
        .with_reason(format!("{}: {}", CHECKOUT_FAILED_PREFIX, detail))
        .apply(registration, Some(intent), now)?;

    let mut next = snapshot.clone();
    if let Some(failed) = pair.intent {
        next.upsert_payment_intent(failed);
    }
    next.upsert_registration(pair.registration);
    Ok(Some(next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{EventId, Money, OrganizerId};
    use crate::domain::registration::aggregate::test_support::{consents, participant};
    use crate::domain::registration::RegistrationCode;

    fn now() -> Timestamp {
        Timestamp::parse_rfc3339("t", "2025-05-01T10:00:00Z").unwrap()
    }

    fn registration(amount_cents: i64) -> Registration {
        Registration::pending_payment(
            EventId::new(),
            OrganizerId::new(),
            participant("a@b.it"),
            consents(),
            RegistrationCode::from_string("RUN-00001"),
            Money::from_cents(amount_cents),
            Money::from_cents(75),
            now().plus_minutes(15),
            now(),
        )
    }

    fn snapshot_with(reg: &Registration) -> LedgerSnapshot {
        let mut s = LedgerSnapshot::default();
        s.upsert_registration(reg.clone());
        s
    }

    fn session() -> OpenedSession<'static> {
        OpenedSession {
            session_id: "cs_1",
            url: "https://checkout.example/cs_1",
            provider_payment_intent_id: Some("pi_1"),
        }
    }

    #[test]
    fn creates_and_links_one_intent_when_none_open() {
        let reg = registration(2500);
        let snapshot = snapshot_with(&reg);
        let expires = now().plus_minutes(15);

        let (next, plan) = plan_checkout(&snapshot, reg.id, Currency::Eur, expires, now()).unwrap();
        let next = next.unwrap();

        let CheckoutPlan::Open { intent, created, registration } = plan else {
            panic!("expected open plan");
        };
        assert!(created);
        assert_eq!(intent.status, PaymentIntentStatus::Pending);
        assert_eq!(intent.amount, Money::from_cents(2500));
        assert_eq!(registration.payment_intent_id, Some(intent.id));
        assert_eq!(next.open_intent_for(reg.id).unwrap().id, intent.id);

        // A second request sees the open intent and creates nothing.
        let (again, plan) = plan_checkout(&next, reg.id, Currency::Eur, expires, now()).unwrap();
        assert!(again.is_none());
        assert!(matches!(plan, CheckoutPlan::Open { created: false, .. }));
    }

    #[test]
    fn terminal_registration_is_reported_verbatim() {
        let mut reg = registration(2500);
        reg.registration_status = RegistrationStatus::Cancelled;
        let snapshot = snapshot_with(&reg);

        let (next, plan) =
            plan_checkout(&snapshot, reg.id, Currency::Eur, now(), now()).unwrap();
        assert!(next.is_none());
        assert_eq!(
            plan,
            CheckoutPlan::Final {
                registration: reg,
                intent: None
            }
        );
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        let reg = registration(0);
        let snapshot = snapshot_with(&reg);
        let err = plan_checkout(&snapshot, reg.id, Currency::Eur, now(), now()).unwrap_err();
        assert!(matches!(err, PaymentError::Validation(_)));
    }

    #[test]
    fn attached_session_is_reused_until_it_expires() {
        let reg = registration(2500);
        let expires = now().plus_minutes(15);
        let (next, plan) =
            plan_checkout(&snapshot_with(&reg), reg.id, Currency::Eur, expires, now()).unwrap();
        let CheckoutPlan::Open { intent, .. } = plan else {
            panic!("expected open plan");
        };

        let (attached, r, i) =
            attach_checkout(&next.unwrap(), intent.id, &session(), expires, now()).unwrap();
        assert_eq!(i.status, PaymentIntentStatus::RequiresAction);
        assert_eq!(i.provider_payment_intent_id.as_deref(), Some("pi_1"));
        assert_eq!(r.payment_status, PaymentStatus::RequiresAction);
        assert_eq!(r.payment_session_expires_at, Some(expires));

        let (_, plan) =
            plan_checkout(&attached, reg.id, Currency::Eur, expires, now().plus_minutes(5)).unwrap();
        assert!(matches!(plan, CheckoutPlan::Reuse { .. }));
    }

    #[test]
    fn reattaching_keeps_requires_action() {
        let reg = registration(2500);
        let expires = now().plus_minutes(15);
        let (next, plan) =
            plan_checkout(&snapshot_with(&reg), reg.id, Currency::Eur, expires, now()).unwrap();
        let CheckoutPlan::Open { intent, .. } = plan else {
            panic!("expected open plan");
        };
        let (once, _, _) =
            attach_checkout(&next.unwrap(), intent.id, &session(), expires, now()).unwrap();

        let (_, _, i) = attach_checkout(&once, intent.id, &session(), expires, now()).unwrap();
        assert_eq!(i.status, PaymentIntentStatus::RequiresAction);
    }

    #[test]
    fn provider_failure_fails_the_fresh_intent() {
        let reg = registration(2500);
        let expires = now().plus_minutes(15);
        let (next, plan) =
            plan_checkout(&snapshot_with(&reg), reg.id, Currency::Eur, expires, now()).unwrap();
        let CheckoutPlan::Open { intent, .. } = plan else {
            panic!("expected open plan");
        };

        let failed = fail_checkout(&next.unwrap(), intent.id, "card declined", now())
            .unwrap()
            .unwrap();
        let i = failed.payment_intent(intent.id).unwrap();
        assert_eq!(i.status, PaymentIntentStatus::Failed);
        assert_eq!(
            i.failure_reason.as_deref(),
            Some("Checkout session creation failed: card declined")
        );
        let r = failed.registration(reg.id).unwrap();
        assert_eq!(r.registration_status, RegistrationStatus::PendingPayment);
        assert!(failed.open_intent_for(reg.id).is_none());

        assert!(fail_checkout(&failed, intent.id, "again", now()).unwrap().is_none());
    }
}
