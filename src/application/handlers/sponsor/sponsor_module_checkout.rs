//! SponsorModuleCheckoutHandler - one-off activation of the sponsor module.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::application::{Commit, PaymentLedger, RedirectPolicy};
use crate::domain::foundation::{Currency, Money, OrganizerId};
use crate::domain::registration::PaymentError;
use crate::domain::sponsor::SponsorModuleActivation;
use crate::ports::{CheckoutGateway, CheckoutPurpose, CheckoutRequest};

#[derive(Debug, Clone)]
pub struct SponsorModuleCheckoutCommand {
    pub organizer_id: OrganizerId,
    pub payer_email: Option<String>,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SponsorModuleCheckoutResult {
    /// Module was enabled before; no checkout is opened.
    AlreadyActive,
    Checkout {
        checkout_url: String,
        amount: Money,
        currency: Currency,
    },
}

pub struct SponsorModuleCheckoutHandler {
    ledger: Arc<PaymentLedger>,
    gateway: Arc<dyn CheckoutGateway>,
    redirects: RedirectPolicy,
    activation_amount: Option<Money>,
    currency: Currency,
}

enum Plan {
    Done(SponsorModuleCheckoutResult),
    Open(SponsorModuleActivation),
}

impl SponsorModuleCheckoutHandler {
    pub fn new(
        ledger: Arc<PaymentLedger>,
        gateway: Arc<dyn CheckoutGateway>,
        redirects: RedirectPolicy,
        activation_amount: Option<Money>,
        currency: Currency,
    ) -> Self {
        Self {
            ledger,
            gateway,
            redirects,
            activation_amount,
            currency,
        }
    }

    pub fn redirects(&self) -> &RedirectPolicy {
        &self.redirects
    }

    pub async fn handle(
        &self,
        cmd: SponsorModuleCheckoutCommand,
    ) -> Result<SponsorModuleCheckoutResult, PaymentError> {
        let organizer_id = cmd.organizer_id;
        let (amount, currency) = (self.activation_amount, self.currency);

        let plan = self
            .ledger
            .commit(|snapshot, now| {
                let module = snapshot.sponsor_module(organizer_id).cloned();
                match module {
                    Some(m) if m.enabled => {
                        Ok(Commit::keep(Plan::Done(SponsorModuleCheckoutResult::AlreadyActive)))
                    }
                    Some(m) if m.has_open_checkout() => {
                        let checkout_url = m.checkout_url.clone().unwrap_or_default();
                        Ok(Commit::keep(Plan::Done(SponsorModuleCheckoutResult::Checkout {
                            checkout_url,
                            amount: m.activation_amount,
                            currency: m.currency,
                        })))
                    }
                    Some(m) => Ok(Commit::keep(Plan::Open(m))),
                    None => {
                        let module =
                            SponsorModuleActivation::disabled(organizer_id, amount, currency, now);
                        let mut next = snapshot.clone();
                        next.upsert_sponsor_module(module.clone());
                        Ok(Commit::write(next, Plan::Open(module)))
                    }
                }
            })
            .await?;

        let module = match plan {
            Plan::Done(result) => return Ok(result),
            Plan::Open(module) => module,
        };

        let request = CheckoutRequest {
            purpose: CheckoutPurpose::SponsorModule { organizer_id },
            idempotency_key: Uuid::new_v4().to_string(),
            product_name: "Sponsor module activation".to_string(),
            description: None,
            amount: module.activation_amount,
            currency: module.currency,
            application_fee_cents: None,
            destination_account: None,
            customer_email: cmd
                .payer_email
                .as_deref()
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_lowercase),
            success_url: self.redirects.success_url(cmd.success_url.as_deref()),
            cancel_url: self.redirects.cancel_url(cmd.cancel_url.as_deref()),
        };

        let session = self
            .gateway
            .create_checkout_session(request)
            .await
            .map_err(|e| {
                warn!(organizer_id = %organizer_id, error = %e, "Sponsor module checkout failed");
                PaymentError::from(e)
            })?;

        let module = self
            .ledger
            .commit(|snapshot, now| {
                let current = snapshot
                    .sponsor_module(organizer_id)
                    .cloned()
                    .unwrap_or(module);
                if current.enabled {
                    return Ok(Commit::keep(current));
                }
                let updated = current.with_checkout(session.id.clone(), session.url.clone(), now);
                let mut next = snapshot.clone();
                next.upsert_sponsor_module(updated.clone());
                Ok(Commit::write(next, updated))
            })
            .await?;

        if module.enabled {
            return Ok(SponsorModuleCheckoutResult::AlreadyActive);
        }

        info!(organizer_id = %organizer_id, "Sponsor module checkout opened");
        Ok(SponsorModuleCheckoutResult::Checkout {
            checkout_url: session.url,
            amount: module.activation_amount,
            currency: module.currency,
        })
    }
}
