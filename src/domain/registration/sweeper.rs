//! Lazy expiry of payment sessions, cash deadlines and sponsor windows.
//!
//! There is no timer. Every mutating command sweeps first, so an expired
//! session is always observed as `payment_failed` before anything else
//! touches it.

use crate::domain::foundation::{
    PaymentIntentId, RegistrationId, SponsorSlotId, StateMachine, Timestamp,
};
use crate::domain::ledger::LedgerSnapshot;
use crate::domain::sponsor::SponsorSlotStatus;

use super::{
    PairTransition, PaymentIntent, PaymentIntentStatus, PaymentStatus, RegistrationStatus,
    DEFAULT_EXPIRED_REASON,
};

/// Reason recorded when an online payment session runs out.
pub const SESSION_EXPIRED_REASON: &str = DEFAULT_EXPIRED_REASON;

/// Reason recorded when the cash deadline passes without confirmation.
pub const CASH_DEADLINE_REASON: &str = "cash payment deadline exceeded";

/// What a sweep changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub failed_registrations: Vec<RegistrationId>,
    pub expired_intents: Vec<PaymentIntentId>,
    pub expired_sponsor_slots: Vec<SponsorSlotId>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.failed_registrations.is_empty()
            && self.expired_intents.is_empty()
            && self.expired_sponsor_slots.is_empty()
    }
}

/// Target for an open intent whose registration ran out of time.
///
/// Pending and `requires_action` intents close as `expired`. An
/// `authorized` intent closes as `cancelled` instead: the intent state
/// machine has no `authorized -> expired` edge, so the expiry rule that
/// lists `authorized` among the expirable states is applied as a
/// cancellation of the held authorization. The registration half still
/// ends in `payment_failed` either way.
fn closing_target(intent: &PaymentIntent) -> Option<PaymentIntentStatus> {
    [PaymentIntentStatus::Expired, PaymentIntentStatus::Cancelled]
        .into_iter()
        .find(|target| intent.status.can_transition_to(target))
}

/// Expires everything past its deadline at `now`.
///
/// Returns `None` when nothing is due, so callers can keep the current
/// snapshot without writing.
pub fn sweep_expired(snapshot: &LedgerSnapshot, now: Timestamp) -> Option<(LedgerSnapshot, SweepReport)> {
    let mut next = snapshot.clone();
    let mut report = SweepReport::default();

    for registration in snapshot.registrations() {
        if !registration.session_expired(&now) {
            continue;
        }
        let reason = match registration.registration_status {
            RegistrationStatus::PendingCash => CASH_DEADLINE_REASON,
            _ => SESSION_EXPIRED_REASON,
        };

        let intent = registration
            .payment_intent_id
            .and_then(|id| snapshot.payment_intent(id))
            .filter(|intent| intent.status.is_open());

        let transition = match intent.and_then(closing_target) {
            Some(target) => PairTransition::pair(RegistrationStatus::PaymentFailed, target),
            None => PairTransition::registration_only(RegistrationStatus::PaymentFailed),
        }
        .with_reason(reason);

        let intent = intent.filter(|_| transition.intent_target().is_some());
        let Ok(pair) = transition.apply(registration, intent, now) else {
            continue;
        };

        report.failed_registrations.push(pair.registration.id);
        if let Some(intent) = pair.intent {
            report.expired_intents.push(intent.id);
            next.upsert_payment_intent(intent);
        }
        next.upsert_registration(pair.registration);
    }

    // Intents past their own deadline whose registration is still within its session.
    for intent in snapshot.payment_intents() {
        if !intent.is_expired_at(&now)
            || report.expired_intents.contains(&intent.id)
            || !intent.status.can_transition_to(&PaymentIntentStatus::Expired)
        {
            continue;
        }

        let mut expired = intent.clone();
        expired.status = PaymentIntentStatus::Expired;
        expired.failure_reason = Some(SESSION_EXPIRED_REASON.to_string());
        expired.updated_at = now;

        if let Some(registration) = next.registration(intent.registration_id) {
            if registration.payment_intent_id == Some(intent.id)
                && registration.registration_status.is_awaiting_payment()
            {
                let mut mirrored = registration.clone();
                mirrored.payment_status = PaymentStatus::Expired;
                mirrored.updated_at = now;
                next.upsert_registration(mirrored);
            }
        }

        report.expired_intents.push(expired.id);
        next.upsert_payment_intent(expired);
    }

    for slot in snapshot.sponsor_slots() {
        let open = matches!(
            slot.status,
            SponsorSlotStatus::Active | SponsorSlotStatus::PendingPayment
        );
        if !open || !slot.window_ended(&now) {
            continue;
        }
        if let Ok(expired) = slot.transitioned(SponsorSlotStatus::Expired, now) {
            report.expired_sponsor_slots.push(expired.id);
            next.upsert_sponsor_slot(expired);
        }
    }

    if report.is_empty() {
        None
    } else {
        Some((next, report))
    }
}
