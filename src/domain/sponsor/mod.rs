//! Sponsor module - advertising slots sold per event.
//!
//! Slots follow a lifecycle parallel to registrations: created pending by
//! an organizer checkout, advanced by provider webhooks, expired by the
//! sweeper when their window closes.

mod module;
pub(crate) mod slot;
mod status;
mod webhook;

pub use module::{SponsorModuleActivation, DEFAULT_ACTIVATION_AMOUNT};
pub use slot::{plan_window, ContractTerms, SlotWindow, SponsorDetails, SponsorSlot};
pub use status::SponsorSlotStatus;
pub use webhook::{
    apply_sponsor_webhook, AppliedSponsorWebhook, CheckoutReferences, SponsorChange,
    SponsorEvent, SponsorTarget, SponsorWebhook, SponsorWebhookApplication,
    SponsorWebhookPayload, KIND_SPONSOR_MODULE, KIND_SPONSOR_SLOT,
};
