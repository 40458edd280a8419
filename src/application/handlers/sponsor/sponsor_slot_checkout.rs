//! SponsorSlotCheckoutHandler - sells a sponsor slot through a hosted checkout.

use std::sync::Arc;

use tracing::{info, warn};

use crate::application::{Commit, PaymentLedger, RedirectPolicy};
use crate::domain::foundation::{Currency, EventId, Money, SponsorSlotId};
use crate::domain::ledger::LedgerEvent;
use crate::domain::registration::{EntityKind, PaymentError};
use crate::domain::sponsor::{SponsorDetails, SponsorSlot, SponsorSlotStatus};
use crate::ports::{CheckoutGateway, CheckoutPurpose, CheckoutRequest, EventCatalog};

/// Reason stored on a slot whose checkout could not be opened.
pub const SLOT_CHECKOUT_FAILED_PREFIX: &str = "Stripe checkout session creation failed";

#[derive(Debug, Clone, Default)]
pub struct SponsorSlotCheckoutCommand {
    pub event_id: EventId,
    pub sponsor_name: Option<String>,
    pub sponsor_name_it: Option<String>,
    pub sponsor_name_en: Option<String>,
    pub sponsor_url: Option<String>,
    pub sponsor_logo_url: Option<String>,
    pub payer_email: Option<String>,
    pub package_days: u32,
    pub amount: Money,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SponsorSlotCheckoutResult {
    pub checkout_url: String,
    pub slot: SponsorSlot,
    pub max_package_days: u32,
}

pub struct SponsorSlotCheckoutHandler {
    ledger: Arc<PaymentLedger>,
    catalog: Arc<dyn EventCatalog>,
    gateway: Arc<dyn CheckoutGateway>,
    redirects: RedirectPolicy,
    currency: Currency,
}

impl SponsorSlotCheckoutHandler {
    pub fn new(
        ledger: Arc<PaymentLedger>,
        catalog: Arc<dyn EventCatalog>,
        gateway: Arc<dyn CheckoutGateway>,
        redirects: RedirectPolicy,
        currency: Currency,
    ) -> Self {
        Self {
            ledger,
            catalog,
            gateway,
            redirects,
            currency,
        }
    }

    pub fn redirects(&self) -> &RedirectPolicy {
        &self.redirects
    }

    pub async fn handle(
        &self,
        cmd: SponsorSlotCheckoutCommand,
    ) -> Result<SponsorSlotCheckoutResult, PaymentError> {
        // 1. Validate and plan the window
        let event = self
            .catalog
            .event(cmd.event_id)
            .ok_or_else(|| PaymentError::not_found(EntityKind::Event, cmd.event_id))?;
        let details = SponsorDetails::new(
            cmd.sponsor_name.as_deref(),
            cmd.sponsor_name_it.as_deref(),
            cmd.sponsor_name_en.as_deref(),
            cmd.sponsor_url.as_deref(),
            cmd.sponsor_logo_url.as_deref(),
            cmd.payer_email.as_deref(),
        )?;

        // 2. Create the pending slot
        let currency = self.currency;
        let (slot, max_package_days) = self
            .ledger
            .commit(|snapshot, now| {
                let (slot, window) = SponsorSlot::create(
                    event.id,
                    event.organizer_id,
                    &event.name,
                    event.event_date,
                    details,
                    cmd.package_days,
                    cmd.amount,
                    currency,
                    now,
                )?;
                let mut next = snapshot.clone();
                next.upsert_sponsor_slot(slot.clone());
                Ok(Commit::write(next, (slot, window.max_package_days)))
            })
            .await?;

        // 3. Open the provider session
        let request = CheckoutRequest {
            purpose: CheckoutPurpose::SponsorSlot {
                sponsor_slot_id: slot.id,
                event_id: slot.event_id,
                organizer_id: slot.organizer_id,
            },
            idempotency_key: slot.id.to_string(),
            product_name: format!("Sponsor package - {}", event.name),
            description: Some(format!("{} day package", slot.package_days)),
            amount: slot.amount,
            currency: slot.currency,
            application_fee_cents: None,
            destination_account: None,
            customer_email: slot.payer_email.clone(),
            success_url: self.redirects.success_url(cmd.success_url.as_deref()),
            cancel_url: self.redirects.cancel_url(cmd.cancel_url.as_deref()),
        };

        let session = match self.gateway.create_checkout_session(request).await {
            Ok(session) => session,
            Err(e) => {
                warn!(sponsor_slot_id = %slot.id, error = %e, "Sponsor checkout failed");
                let reason = format!("{SLOT_CHECKOUT_FAILED_PREFIX}: {e}");
                self.mark_failed(slot.id, reason).await?;
                return Err(e.into());
            }
        };

        // 4. Record provider references
        let slot = self
            .ledger
            .commit(|snapshot, now| {
                let current = snapshot
                    .sponsor_slot(slot.id)
                    .ok_or_else(|| PaymentError::not_found(EntityKind::SponsorSlot, slot.id))?;
                let mut updated = current.clone();
                updated.checkout_session_id = Some(session.id.clone());
                updated.payment_link_url = Some(session.url.clone());
                updated.provider_payment_intent_id = session.provider_payment_intent_id.clone();
                updated.updated_at = now;
                let mut next = snapshot.clone();
                next.upsert_sponsor_slot(updated.clone());
                Ok(Commit::write(next, updated))
            })
            .await?;

        info!(
            sponsor_slot_id = %slot.id,
            event_id = %slot.event_id,
            package_days = slot.package_days,
            "Sponsor checkout opened"
        );

        Ok(SponsorSlotCheckoutResult {
            checkout_url: session.url,
            slot,
            max_package_days,
        })
    }

    async fn mark_failed(&self, slot_id: SponsorSlotId, reason: String) -> Result<(), PaymentError> {
        self.ledger
            .commit(|snapshot, now| {
                let Some(slot) = snapshot.sponsor_slot(slot_id) else {
                    return Ok(Commit::keep(()));
                };
                if slot.status != SponsorSlotStatus::PendingPayment {
                    return Ok(Commit::keep(()));
                }
                let mut failed = slot.transitioned(SponsorSlotStatus::PaymentFailed, now)?;
                failed.failure_reason = Some(reason);
                let event = LedgerEvent::for_sponsor_slot(&failed);
                let mut next = snapshot.clone();
                next.upsert_sponsor_slot(failed);
                Ok(Commit::write(next, ()).with_events(Some(event)))
            })
            .await
    }
}
