//! Immutable state snapshot and webhook dedup ledger.
//!
//! A snapshot is never mutated in place once published. Commands clone it,
//! apply their changes to the copy and hand the copy back to be swapped in
//! as one unit.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::domain::foundation::{
    EventId, OrganizerId, PaymentIntentId, RegistrationId, SponsorSlotId, WebhookEventId,
};
use crate::domain::registration::{PaymentIntent, Registration};
use crate::domain::sponsor::{SponsorModuleActivation, SponsorSlot};

use super::legacy::RawSnapshot;

/// Every registration, intent, slot and processed webhook id, as one unit.
///
/// Collections are ordered newest first. `processed_webhook_event_ids` is
/// mirrored by an index for constant-time dedup checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawSnapshot")]
pub struct LedgerSnapshot {
    registrations: Vec<Registration>,
    payment_intents: Vec<PaymentIntent>,
    sponsor_slots: Vec<SponsorSlot>,
    sponsor_modules: Vec<SponsorModuleActivation>,
    processed_webhook_event_ids: Vec<WebhookEventId>,
    #[serde(skip)]
    processed_index: HashSet<WebhookEventId>,
}

impl LedgerSnapshot {
    /// Builds a snapshot from already normalized parts.
    pub fn from_parts(
        registrations: Vec<Registration>,
        payment_intents: Vec<PaymentIntent>,
        sponsor_slots: Vec<SponsorSlot>,
        sponsor_modules: Vec<SponsorModuleActivation>,
        processed_webhook_event_ids: Vec<WebhookEventId>,
    ) -> Self {
        let mut seen = HashSet::with_capacity(processed_webhook_event_ids.len());
        let processed_webhook_event_ids: Vec<_> = processed_webhook_event_ids
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();

        Self {
            registrations,
            payment_intents,
            sponsor_slots,
            sponsor_modules,
            processed_webhook_event_ids,
            processed_index: seen,
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Reads
    // ════════════════════════════════════════════════════════════════════════════

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    pub fn payment_intents(&self) -> &[PaymentIntent] {
        &self.payment_intents
    }

    pub fn sponsor_slots(&self) -> &[SponsorSlot] {
        &self.sponsor_slots
    }

    pub fn sponsor_modules(&self) -> &[SponsorModuleActivation] {
        &self.sponsor_modules
    }

    /// Processed webhook ids, most recent first.
    pub fn processed_webhook_event_ids(&self) -> &[WebhookEventId] {
        &self.processed_webhook_event_ids
    }

    pub fn registration(&self, id: RegistrationId) -> Option<&Registration> {
        self.registrations.iter().find(|r| r.id == id)
    }

    pub fn payment_intent(&self, id: PaymentIntentId) -> Option<&PaymentIntent> {
        self.payment_intents.iter().find(|i| i.id == id)
    }

    pub fn sponsor_slot(&self, id: SponsorSlotId) -> Option<&SponsorSlot> {
        self.sponsor_slots.iter().find(|s| s.id == id)
    }

    pub fn sponsor_module(&self, organizer_id: OrganizerId) -> Option<&SponsorModuleActivation> {
        self.sponsor_modules
            .iter()
            .find(|m| m.organizer_id == organizer_id)
    }

    /// Looks an intent up by the provider's own payment intent id.
    pub fn find_intent_by_provider_id(&self, provider_id: &str) -> Option<&PaymentIntent> {
        self.payment_intents
            .iter()
            .find(|i| i.provider_payment_intent_id.as_deref() == Some(provider_id))
    }

    /// Looks an intent up by the checkout session that collects it.
    pub fn find_intent_by_checkout_session(&self, session_id: &str) -> Option<&PaymentIntent> {
        self.payment_intents
            .iter()
            .find(|i| i.checkout_session_id.as_deref() == Some(session_id))
    }

    /// Non-terminal registration for the event and (lower-cased) email.
    pub fn open_registration_for(&self, event_id: EventId, email: &str) -> Option<&Registration> {
        self.registrations.iter().find(|r| {
            r.event_id == event_id && r.participant.email == email && !r.is_terminal()
        })
    }

    /// The registration's intent that can still settle, if any.
    pub fn open_intent_for(&self, registration_id: RegistrationId) -> Option<&PaymentIntent> {
        self.payment_intents
            .iter()
            .find(|i| i.registration_id == registration_id && i.status.is_open())
    }

    /// Returns true if the webhook id is already in the dedup ledger.
    pub fn has_processed(&self, id: &WebhookEventId) -> bool {
        self.processed_index.contains(id)
    }

    /// Highest assigned number per event, used to seed numbering.
    pub fn max_assigned_numbers(&self) -> HashMap<EventId, u32> {
        let mut max: HashMap<EventId, u32> = HashMap::new();
        for r in &self.registrations {
            if let Some(n) = r.assigned_number {
                let entry = max.entry(r.event_id).or_insert(0);
                *entry = (*entry).max(n);
            }
        }
        max
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Writes (on an owned copy)
    // ════════════════════════════════════════════════════════════════════════════

    /// Replaces the registration with the same id, or prepends it.
    pub fn upsert_registration(&mut self, registration: Registration) {
        upsert(&mut self.registrations, registration, |a, b| a.id == b.id);
    }

    pub fn upsert_payment_intent(&mut self, intent: PaymentIntent) {
        upsert(&mut self.payment_intents, intent, |a, b| a.id == b.id);
    }

    pub fn upsert_sponsor_slot(&mut self, slot: SponsorSlot) {
        upsert(&mut self.sponsor_slots, slot, |a, b| a.id == b.id);
    }

    pub fn upsert_sponsor_module(&mut self, module: SponsorModuleActivation) {
        upsert(&mut self.sponsor_modules, module, |a, b| {
            a.organizer_id == b.organizer_id
        });
    }

    /// Prepends the id to the dedup ledger.
    ///
    /// Returns false, leaving the ledger untouched, if it was already present.
    pub fn record_webhook(&mut self, id: WebhookEventId) -> bool {
        if !self.processed_index.insert(id.clone()) {
            return false;
        }
        self.processed_webhook_event_ids.insert(0, id);
        true
    }
}

fn upsert<T>(items: &mut Vec<T>, item: T, same: impl Fn(&T, &T) -> bool) {
    match items.iter().position(|existing| same(existing, &item)) {
        Some(index) => items[index] = item,
        None => items.insert(0, item),
    }
}
