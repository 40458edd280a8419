//! ParticipantCheckoutHandler - opens (or reuses) a hosted checkout for a registration.

use std::sync::Arc;

use tracing::{info, warn};

use crate::application::{Commit, PaymentLedger, RedirectPolicy};
use crate::domain::foundation::{Currency, RegistrationId};
use crate::domain::registration::{
    application_fee_cents, attach_checkout, fail_checkout, plan_checkout, CheckoutPlan,
    OpenedSession, PaymentError, PaymentIntent, Registration,
};
use crate::ports::{CheckoutGateway, CheckoutPurpose, CheckoutRequest, EventCatalog};

/// Command to start paying for a registration.
#[derive(Debug, Clone)]
pub struct ParticipantCheckoutCommand {
    pub registration_id: RegistrationId,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
}

/// Result of a checkout request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantCheckoutResult {
    /// Hosted page the participant should be sent to.
    Checkout {
        checkout_url: String,
        registration: Registration,
        intent: PaymentIntent,
    },
    /// Registration already settled; nothing to pay.
    Final {
        registration: Registration,
        intent: Option<PaymentIntent>,
    },
}

pub struct ParticipantCheckoutHandler {
    ledger: Arc<PaymentLedger>,
    catalog: Arc<dyn EventCatalog>,
    gateway: Arc<dyn CheckoutGateway>,
    redirects: RedirectPolicy,
    currency: Currency,
    session_minutes: i64,
}

impl ParticipantCheckoutHandler {
    pub fn new(
        ledger: Arc<PaymentLedger>,
        catalog: Arc<dyn EventCatalog>,
        gateway: Arc<dyn CheckoutGateway>,
        redirects: RedirectPolicy,
        currency: Currency,
        session_minutes: i64,
    ) -> Self {
        Self {
            ledger,
            catalog,
            gateway,
            redirects,
            currency,
            session_minutes,
        }
    }

    pub fn redirects(&self) -> &RedirectPolicy {
        &self.redirects
    }

    pub async fn handle(
        &self,
        cmd: ParticipantCheckoutCommand,
    ) -> Result<ParticipantCheckoutResult, PaymentError> {
        // 1. Decide under the lock; a missing open intent is created here
        let currency = self.currency;
        let minutes = self.session_minutes;
        let plan = self
            .ledger
            .commit(|snapshot, now| {
                let (next, plan) = plan_checkout(
                    snapshot,
                    cmd.registration_id,
                    currency,
                    now.plus_minutes(minutes),
                    now,
                )?;
                Ok(match next {
                    Some(next) => Commit::write(next, plan),
                    None => Commit::keep(plan),
                })
            })
            .await?;

        let (registration, intent, created) = match plan {
            CheckoutPlan::Final {
                registration,
                intent,
            } => return Ok(ParticipantCheckoutResult::Final {
                registration,
                intent,
            }),
            CheckoutPlan::Reuse {
                registration,
                intent,
            } => {
                let checkout_url = intent.checkout_url.clone().unwrap_or_default();
                return Ok(ParticipantCheckoutResult::Checkout {
                    checkout_url,
                    registration,
                    intent,
                });
            }
            CheckoutPlan::Open {
                registration,
                intent,
                created,
            } => (registration, intent, created),
        };

        // 2. Call the provider outside the lock
        let session = match self.request_for(&registration, &intent, &cmd) {
            Ok(request) => self
                .gateway
                .create_checkout_session(request)
                .await
                .map_err(|e| (e.to_string(), PaymentError::from(e))),
            Err(e) => Err((e.to_string(), e)),
        };
        let session = match session {
            Ok(session) => session,
            Err((detail, e)) => {
                warn!(
                    registration_id = %registration.id,
                    payment_intent_id = %intent.id,
                    error = %e,
                    "Checkout session creation failed"
                );
                if created {
                    self.ledger
                        .commit(|snapshot, now| {
                            Ok(match fail_checkout(snapshot, intent.id, &detail, now)? {
                                Some(next) => Commit::write(next, ()),
                                None => Commit::keep(()),
                            })
                        })
                        .await?;
                }
                return Err(e);
            }
        };

        // 3. Record the session
        let (registration, intent) = self
            .ledger
            .commit(|snapshot, now| {
                let opened = OpenedSession {
                    session_id: &session.id,
                    url: &session.url,
                    provider_payment_intent_id: session.provider_payment_intent_id.as_deref(),
                };
                let (next, registration, intent) =
                    attach_checkout(snapshot, intent.id, &opened, now.plus_minutes(minutes), now)?;
                Ok(Commit::write(next, (registration, intent)))
            })
            .await?;

        info!(
            registration_id = %registration.id,
            payment_intent_id = %intent.id,
            checkout_session_id = %session.id,
            "Checkout session opened"
        );

        Ok(ParticipantCheckoutResult::Checkout {
            checkout_url: session.url,
            registration,
            intent,
        })
    }

    fn request_for(
        &self,
        registration: &Registration,
        intent: &PaymentIntent,
        cmd: &ParticipantCheckoutCommand,
    ) -> Result<CheckoutRequest, PaymentError> {
        let event = self.catalog.event(registration.event_id);
        let code = registration.registration_code.to_string();
        let product_name = event
            .as_ref()
            .map(|e| format!("Iscrizione {}", e.name))
            .unwrap_or_else(|| format!("Iscrizione {code}"));
        let fee = application_fee_cents(intent.amount, registration.commission_amount)?;

        Ok(CheckoutRequest {
            purpose: CheckoutPurpose::Registration {
                registration_id: registration.id,
                payment_intent_id: intent.id,
                event_id: registration.event_id,
                organizer_id: registration.organizer_id,
                registration_code: code.clone(),
            },
            idempotency_key: intent.idempotency_key.clone(),
            product_name,
            description: Some(format!("Codice iscrizione {code}")),
            amount: intent.amount,
            currency: intent.currency,
            application_fee_cents: Some(fee).filter(|cents| *cents > 0),
            destination_account: event.and_then(|e| e.payout_account_id),
            customer_email: Some(registration.participant.email.clone()),
            success_url: self.redirects.success_url(cmd.success_url.as_deref()),
            cancel_url: self.redirects.cancel_url(cmd.cancel_url.as_deref()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_support::{
        fixture_with, now, paid_event, pending_pair, redirects, Fixture,
    };
    use crate::domain::ledger::LedgerSnapshot;
    use crate::domain::registration::{
        PaymentIntentStatus, PaymentStatus, RegistrationStatus, CHECKOUT_FAILED_PREFIX,
    };
    use crate::ports::GatewayError;
    use rust_decimal_macros::dec;

    fn handler(f: &Fixture) -> ParticipantCheckoutHandler {
        ParticipantCheckoutHandler::new(
            f.ledger.clone(),
            f.catalog.clone(),
            Arc::new(f.gateway.clone()),
            redirects(),
            Currency::Eur,
            15,
        )
    }

    fn command(registration_id: RegistrationId) -> ParticipantCheckoutCommand {
        ParticipantCheckoutCommand {
            registration_id,
            success_url: Some("https://evil.example/x".to_string()),
            cancel_url: None,
        }
    }

    #[tokio::test]
    async fn opens_session_and_moves_intent_to_requires_action() {
        let event = paid_event(dec!(25));
        let (snapshot, reg, intent) = pending_pair(&event, now().plus_minutes(15));
        let f = fixture_with(snapshot, now(), vec![event]);

        let result = handler(&f).handle(command(reg.id)).await.unwrap();

        let ParticipantCheckoutResult::Checkout {
            checkout_url,
            registration,
            intent: updated,
        } = result
        else {
            panic!("expected checkout");
        };
        assert_eq!(checkout_url, "https://checkout.mock/pay/cs_mock_1");
        assert_eq!(updated.id, intent.id);
        assert_eq!(updated.status, PaymentIntentStatus::RequiresAction);
        assert_eq!(updated.provider_payment_intent_id.as_deref(), Some("pi_mock_1"));
        assert_eq!(registration.payment_status, PaymentStatus::RequiresAction);

        let request = &f.gateway.requests()[0];
        assert_eq!(request.idempotency_key, intent.idempotency_key);
        assert_eq!(request.application_fee_cents, Some(75));
        assert_eq!(request.success_url, "https://eventigare.app/participant/payment/success");
    }

    #[tokio::test]
    async fn second_request_reuses_the_open_session() {
        let event = paid_event(dec!(25));
        let (snapshot, reg, _) = pending_pair(&event, now().plus_minutes(15));
        let f = fixture_with(snapshot, now(), vec![event]);
        let h = handler(&f);

        h.handle(command(reg.id)).await.unwrap();
        let again = h.handle(command(reg.id)).await.unwrap();

        assert!(matches!(again, ParticipantCheckoutResult::Checkout { .. }));
        assert_eq!(f.gateway.call_count(), 1);
    }

    #[tokio::test]
    async fn terminal_registration_returns_final_state() {
        let event = paid_event(dec!(25));
        let (mut snapshot, mut reg, _) = pending_pair(&event, now().plus_minutes(15));
        reg.registration_status = RegistrationStatus::Cancelled;
        snapshot.upsert_registration(reg.clone());
        let f = fixture_with(snapshot, now(), vec![event]);

        let result = handler(&f).handle(command(reg.id)).await.unwrap();
        assert!(matches!(result, ParticipantCheckoutResult::Final { .. }));
        assert_eq!(f.gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn gateway_failure_fails_a_freshly_created_intent() {
        let event = paid_event(dec!(25));
        let (snapshot, mut reg, mut intent) = pending_pair(&event, now().plus_minutes(15));
        // Previous attempt expired on its own; registration session still running.
        intent.status = PaymentIntentStatus::Expired;
        reg.payment_session_expires_at = Some(now().plus_minutes(10));
        let mut snapshot: LedgerSnapshot = snapshot;
        snapshot.upsert_payment_intent(intent.clone());
        snapshot.upsert_registration(reg.clone());
        let f = fixture_with(snapshot, now(), vec![event]);
        f.gateway.set_error(GatewayError::network("connection reset"));

        let err = handler(&f).handle(command(reg.id)).await.unwrap_err();
        assert!(err.is_retryable());

        let current = f.ledger.current().unwrap();
        let fresh_id = current.registration(reg.id).unwrap().payment_intent_id.unwrap();
        assert_ne!(fresh_id, intent.id);
        let fresh = current.payment_intent(fresh_id).unwrap();
        assert_eq!(fresh.status, PaymentIntentStatus::Failed);
        assert!(fresh
            .failure_reason
            .as_deref()
            .unwrap()
            .starts_with(CHECKOUT_FAILED_PREFIX));
    }

    #[tokio::test]
    async fn amount_beyond_charge_ceiling_never_reaches_gateway() {
        let event = paid_event(dec!(100000000000000000000));
        let (snapshot, reg, intent) = pending_pair(&event, now().plus_minutes(15));
        let f = fixture_with(snapshot, now(), vec![event]);

        let err = handler(&f).handle(command(reg.id)).await.unwrap_err();

        assert!(matches!(err, PaymentError::Validation(_)));
        assert_eq!(f.gateway.call_count(), 0);
        let current = f.ledger.current().unwrap();
        assert_eq!(
            current.payment_intent(intent.id).unwrap().status,
            PaymentIntentStatus::Pending
        );
    }
}
