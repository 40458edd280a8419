//! Sponsor handlers.
//!
//! - `SponsorSlotCheckoutHandler` - sells a sponsor slot
//! - `SponsorModuleCheckoutHandler` - unlocks the sponsor module
//! - `ApplySponsorWebhookHandler` - applies provider callbacks

mod apply_sponsor_webhook;
mod sponsor_module_checkout;
mod sponsor_slot_checkout;

pub use apply_sponsor_webhook::{
    ApplySponsorWebhookCommand, ApplySponsorWebhookHandler, ApplySponsorWebhookResult,
};
pub use sponsor_module_checkout::{
    SponsorModuleCheckoutCommand, SponsorModuleCheckoutHandler, SponsorModuleCheckoutResult,
};
pub use sponsor_slot_checkout::{
    SponsorSlotCheckoutCommand, SponsorSlotCheckoutHandler, SponsorSlotCheckoutResult,
    SLOT_CHECKOUT_FAILED_PREFIX,
};
