//! Application layer - the payment ledger and the command handlers.
//!
//! Every state change goes through [`PaymentLedger::commit`], which sweeps
//! expired records, applies one transition and persists the result as a
//! single composite write. Provider calls happen between commits.

pub mod handlers;
mod ledger;
mod redirect;

pub use handlers::{
    ApplyPaymentWebhookCommand, ApplyPaymentWebhookHandler, ApplyPaymentWebhookResult,
    ApplySponsorWebhookCommand, ApplySponsorWebhookHandler, ApplySponsorWebhookResult,
    CancelRegistrationCommand, CancelRegistrationHandler, CancelRegistrationResult,
    ChooseCashPaymentCommand, ChooseCashPaymentHandler, ChooseCashPaymentResult,
    ConfirmCashPaymentCommand, ConfirmCashPaymentHandler, ConfirmCashPaymentResult,
    ParticipantCheckoutCommand, ParticipantCheckoutHandler, ParticipantCheckoutResult,
    SponsorModuleCheckoutCommand, SponsorModuleCheckoutHandler, SponsorModuleCheckoutResult,
    SponsorSlotCheckoutCommand, SponsorSlotCheckoutHandler, SponsorSlotCheckoutResult,
    SubmitRegistrationCommand, SubmitRegistrationHandler, SubmitRegistrationResult,
};
pub use ledger::{Commit, PaymentLedger};
pub use redirect::RedirectPolicy;
