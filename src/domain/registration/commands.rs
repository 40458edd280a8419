//! Participant and organizer commands over a registration.
//!
//! Each command is a pure function from one snapshot to the next. The
//! application layer runs them inside a ledger commit, after the sweep.

use rust_decimal::Decimal;

use crate::domain::foundation::{Currency, Money, RegistrationId, Timestamp, ValidationError};
use crate::domain::ledger::LedgerSnapshot;
use crate::ports::{EventInfo, NumberAssigner};

use super::{
    compute_commission, CommissionInput, Consents, EntityKind, PairTransition, Participant,
    PaymentError, PaymentIntent, PaymentIntentStatus, PaymentMethod, PaymentProvider,
    PaymentStatus, Registration, RegistrationCode, RegistrationStatus,
};

/// Reason recorded on both halves when a participant withdraws.
pub const CANCELLED_REASON: &str = "registration cancelled";

/// Pricing applied to new paid registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationPricing {
    pub commission_rate: Decimal,
    pub provider_fee_rate: Decimal,
    pub provider_fee_fixed: Money,
    pub currency: Currency,
    /// Length of the online payment session opened at submission.
    pub session_minutes: i64,
}

impl Default for RegistrationPricing {
    fn default() -> Self {
        Self {
            commission_rate: super::DEFAULT_COMMISSION_RATE,
            provider_fee_rate: Decimal::ZERO,
            provider_fee_fixed: Money::ZERO,
            currency: Currency::Eur,
            session_minutes: 15,
        }
    }
}

/// Snapshot after a command plus the entities it touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationChange {
    pub snapshot: LedgerSnapshot,
    pub registration: Registration,
    pub intent: Option<PaymentIntent>,
}

impl RegistrationChange {
    fn commit(snapshot: &LedgerSnapshot, registration: Registration, intent: Option<PaymentIntent>) -> Self {
        let mut next = snapshot.clone();
        if let Some(intent) = &intent {
            next.upsert_payment_intent(intent.clone());
        }
        next.upsert_registration(registration.clone());
        Self {
            snapshot: next,
            registration,
            intent,
        }
    }
}

fn registration(snapshot: &LedgerSnapshot, id: RegistrationId) -> Result<&Registration, PaymentError> {
    snapshot
        .registration(id)
        .ok_or_else(|| PaymentError::not_found(EntityKind::Registration, id))
}

/// Creates a registration for `event`.
///
/// Free events confirm at once and take a number. Paid events open the
/// registration together with its first `pending` intent; a second open
/// registration for the same email is rejected.
pub fn submit_registration(
    snapshot: &LedgerSnapshot,
    event: &EventInfo,
    participant: Participant,
    consents: Consents,
    pricing: &RegistrationPricing,
    numbers: &dyn NumberAssigner,
    now: Timestamp,
) -> Result<RegistrationChange, PaymentError> {
    if !consents.privacy {
        return Err(ValidationError::invalid_format("privacyConsent", "must be accepted").into());
    }
    if !consents.retention {
        return Err(ValidationError::invalid_format("retentionConsent", "must be accepted").into());
    }
    if event.ends_at().is_before(&now) {
        return Err(ValidationError::invalid_format("eventId", "event already ended").into());
    }

    let code = RegistrationCode::generate(&event.name);

    if event.is_free() {
        let mut registration =
            Registration::free(event.id, event.organizer_id, participant, consents, code, now);
        let number = numbers.assign_number(registration.id, event.id)?;
        registration.assign_number_once(number);
        return Ok(RegistrationChange::commit(snapshot, registration, None));
    }

    let fee_amount = event.fee_amount.ensure_chargeable("feeAmount")?;

    if let Some(existing) = snapshot.open_registration_for(event.id, &participant.email) {
        return Err(PaymentError::DuplicateRegistration {
            existing: existing.id,
        });
    }

    let commission = compute_commission(&CommissionInput {
        fee_amount,
        developer_commission_rate: pricing.commission_rate,
        provider_fee_rate: pricing.provider_fee_rate,
        provider_fee_fixed: pricing.provider_fee_fixed,
    });
    let session_expires_at = now.plus_minutes(pricing.session_minutes);

    let mut registration = Registration::pending_payment(
        event.id,
        event.organizer_id,
        participant,
        consents,
        code,
        fee_amount.round2(),
        commission.commission_amount,
        session_expires_at,
        now,
    );
    let intent = PaymentIntent::open(
        &registration,
        PaymentProvider::Stripe,
        pricing.currency,
        session_expires_at,
        now,
    );
    registration.payment_intent_id = Some(intent.id);

    Ok(RegistrationChange::commit(snapshot, registration, Some(intent)))
}

/// Switches a pending online payment to cash on site.
///
/// The session deadline becomes the end of the event's cash deadline day
/// (or the event day when no separate deadline is set). The open intent is
/// handed to the manual provider and waits in `requires_action`.
pub fn choose_cash_payment(
    snapshot: &LedgerSnapshot,
    registration_id: RegistrationId,
    event: &EventInfo,
    currency: Currency,
    reference: Option<String>,
    now: Timestamp,
) -> Result<RegistrationChange, PaymentError> {
    let current = registration(snapshot, registration_id)?;

    if !event.accepts_cash {
        return Err(ValidationError::unsupported("paymentMethod", "cash").into());
    }
    let deadline = event.cash_deadline_at().unwrap_or_else(|| event.ends_at());
    if deadline.is_before(&now) {
        return Err(ValidationError::invalid_format("cashDeadline", "cash payment deadline passed").into());
    }

    let open = snapshot.open_intent_for(registration_id);
    let (mut next_registration, intent) = match open {
        Some(intent) if intent.status == PaymentIntentStatus::RequiresAction => {
            let pair = PairTransition::registration_only(RegistrationStatus::PendingCash)
                .apply(current, None, now)?;
            (pair.registration, intent.clone())
        }
        Some(intent) => {
            let pair = PairTransition::pair(
                RegistrationStatus::PendingCash,
                PaymentIntentStatus::RequiresAction,
            )
            .apply(current, Some(intent), now)?;
            let intent = pair
                .intent
                .ok_or_else(|| PaymentError::not_found(EntityKind::PaymentIntent, intent.id))?;
            (pair.registration, intent)
        }
        None => {
            let pair = PairTransition::registration_only(RegistrationStatus::PendingCash)
                .apply(current, None, now)?;
            let mut fresh =
                PaymentIntent::open(current, PaymentProvider::Manual, currency, deadline, now);
            fresh.status = PaymentIntentStatus::RequiresAction;
            (pair.registration, fresh)
        }
    };

    let mut intent = intent;
    intent.provider = PaymentProvider::Manual;
    intent.expires_at = deadline;
    intent.failure_reason = None;
    intent.updated_at = now;

    next_registration.payment_intent_id = Some(intent.id);
    next_registration.payment_status = PaymentStatus::RequiresAction;
    next_registration.payment_method = Some(PaymentMethod::Cash);
    next_registration.payment_reference = reference
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .or_else(|| current.payment_reference.clone())
        .or_else(|| Some(cash_reference(now)));
    next_registration.payment_session_expires_at = Some(deadline);
    next_registration.payment_failed_reason = None;

    Ok(RegistrationChange::commit(snapshot, next_registration, Some(intent)))
}

fn cash_reference(now: Timestamp) -> String {
    let millis = now.as_datetime().timestamp_millis().rem_euclid(100_000_000);
    format!("CASH-{millis:08}")
}

/// Organizer confirms the cash was collected.
///
/// Only `pending_cash` registrations qualify. The number is assigned after
/// both transitions validate.
pub fn confirm_cash_payment(
    snapshot: &LedgerSnapshot,
    registration_id: RegistrationId,
    numbers: &dyn NumberAssigner,
    now: Timestamp,
) -> Result<RegistrationChange, PaymentError> {
    let current = registration(snapshot, registration_id)?;
    if current.registration_status == RegistrationStatus::PendingPayment {
        return Err(ValidationError::unsupported("registrationStatus", "pending_payment").into());
    }

    let intent = current
        .payment_intent_id
        .and_then(|id| snapshot.payment_intent(id));
    let pair = PairTransition::pair(RegistrationStatus::Paid, PaymentIntentStatus::Captured)
        .apply(current, intent, now)?;

    let mut next_registration = pair.registration;
    let mut next_intent = pair
        .intent
        .ok_or_else(|| PaymentError::not_found(EntityKind::PaymentIntent, registration_id))?;

    next_intent.provider_payment_intent_id = next_intent
        .provider_payment_intent_id
        .take()
        .or_else(|| Some(format!("cash_manual_{}", now.as_datetime().timestamp_millis())));

    next_registration.payment_method = Some(PaymentMethod::Cash);
    next_registration.payment_captured_at = Some(now);
    if next_registration.assigned_number.is_none() {
        let number = numbers.assign_number(next_registration.id, next_registration.event_id)?;
        next_registration.assign_number_once(number);
    }

    Ok(RegistrationChange::commit(snapshot, next_registration, Some(next_intent)))
}

/// Withdraws a registration that has not been paid yet.
pub fn cancel_registration(
    snapshot: &LedgerSnapshot,
    registration_id: RegistrationId,
    now: Timestamp,
) -> Result<RegistrationChange, PaymentError> {
    let current = registration(snapshot, registration_id)?;

    match snapshot.open_intent_for(registration_id) {
        Some(intent) => {
            let pair =
                PairTransition::pair(RegistrationStatus::Cancelled, PaymentIntentStatus::Cancelled)
                    .with_reason(CANCELLED_REASON)
                    .apply(current, Some(intent), now)?;
            Ok(RegistrationChange::commit(snapshot, pair.registration, pair.intent))
        }
        None => {
            let pair = PairTransition::registration_only(RegistrationStatus::Cancelled)
                .with_reason(CANCELLED_REASON)
                .apply(current, None, now)?;
            let mut cancelled = pair.registration;
            cancelled.payment_status = PaymentStatus::Cancelled;
            Ok(RegistrationChange::commit(snapshot, cancelled, None))
        }
    }
}
