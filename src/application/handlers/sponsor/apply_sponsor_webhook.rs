//! ApplySponsorWebhookHandler - advances sponsor slots and module activations.

use std::sync::Arc;

use tracing::{info, warn};

use crate::application::{Commit, PaymentLedger};
use crate::domain::ledger::LedgerEvent;
use crate::domain::registration::PaymentError;
use crate::domain::sponsor::{
    apply_sponsor_webhook, SponsorChange, SponsorWebhook, SponsorWebhookApplication,
    SponsorWebhookPayload,
};

#[derive(Debug, Clone)]
pub struct ApplySponsorWebhookCommand {
    pub payload: SponsorWebhookPayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplySponsorWebhookResult {
    Applied(SponsorChange),
    AlreadyProcessed,
}

pub struct ApplySponsorWebhookHandler {
    ledger: Arc<PaymentLedger>,
}

impl ApplySponsorWebhookHandler {
    pub fn new(ledger: Arc<PaymentLedger>) -> Self {
        Self { ledger }
    }

    pub async fn handle(
        &self,
        cmd: ApplySponsorWebhookCommand,
    ) -> Result<ApplySponsorWebhookResult, PaymentError> {
        let webhook = SponsorWebhook::try_from(cmd.payload)?;

        let result = self
            .ledger
            .commit(|snapshot, _| match apply_sponsor_webhook(snapshot, &webhook)? {
                SponsorWebhookApplication::AlreadyProcessed => {
                    Ok(Commit::keep(ApplySponsorWebhookResult::AlreadyProcessed))
                }
                SponsorWebhookApplication::Applied(applied) => {
                    let applied = *applied;
                    let event = match &applied.change {
                        SponsorChange::Slot(slot) => Some(LedgerEvent::for_sponsor_slot(slot)),
                        SponsorChange::Module(module) => {
                            let was_enabled = snapshot
                                .sponsor_module(module.organizer_id)
                                .map_or(false, |m| m.enabled);
                            module
                                .activated_at
                                .filter(|_| module.enabled && !was_enabled)
                                .map(|occurred_at| LedgerEvent::SponsorModuleEnabled {
                                    organizer_id: module.organizer_id,
                                    occurred_at,
                                })
                        }
                    };
                    Ok(Commit::write(
                        applied.snapshot,
                        ApplySponsorWebhookResult::Applied(applied.change),
                    )
                    .with_events(event))
                }
            })
            .await
            .map_err(|e| {
                warn!(
                    webhook_event_id = %webhook.webhook_event_id,
                    error = %e,
                    "Sponsor webhook rejected"
                );
                e
            })?;

        info!(
            webhook_event_id = %webhook.webhook_event_id,
            event = webhook.event.as_str(),
            applied = matches!(result, ApplySponsorWebhookResult::Applied(_)),
            "Sponsor webhook handled"
        );
        Ok(result)
    }
}
