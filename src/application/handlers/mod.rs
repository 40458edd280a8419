//! Application handlers.
//!
//! Command handlers that run domain transitions through the payment ledger
//! and talk to the checkout provider outside of it.

pub mod registration;
pub mod sponsor;

pub use registration::{
    ApplyPaymentWebhookCommand, ApplyPaymentWebhookHandler, ApplyPaymentWebhookResult,
    CancelRegistrationCommand, CancelRegistrationHandler, CancelRegistrationResult,
    ChooseCashPaymentCommand, ChooseCashPaymentHandler, ChooseCashPaymentResult,
    ConfirmCashPaymentCommand, ConfirmCashPaymentHandler, ConfirmCashPaymentResult,
    ParticipantCheckoutCommand, ParticipantCheckoutHandler, ParticipantCheckoutResult,
    SubmitRegistrationCommand, SubmitRegistrationHandler, SubmitRegistrationResult,
};
pub use sponsor::{
    ApplySponsorWebhookCommand, ApplySponsorWebhookHandler, ApplySponsorWebhookResult,
    SponsorModuleCheckoutCommand, SponsorModuleCheckoutHandler, SponsorModuleCheckoutResult,
    SponsorSlotCheckoutCommand, SponsorSlotCheckoutHandler, SponsorSlotCheckoutResult,
    SLOT_CHECKOUT_FAILED_PREFIX,
};
