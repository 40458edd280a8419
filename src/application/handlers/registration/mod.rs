//! Registration handlers.
//!
//! ## Commands
//! - Submitting a registration (free or paid)
//! - Applying normalized payment webhooks
//! - Opening a participant checkout
//! - Choosing and confirming cash payment
//! - Cancelling an unpaid registration

mod apply_payment_webhook;
mod cancel_registration;
mod choose_cash_payment;
mod confirm_cash_payment;
mod participant_checkout;
mod submit_registration;

pub use apply_payment_webhook::{
    ApplyPaymentWebhookCommand, ApplyPaymentWebhookHandler, ApplyPaymentWebhookResult,
};
pub use cancel_registration::{
    CancelRegistrationCommand, CancelRegistrationHandler, CancelRegistrationResult,
};
pub use choose_cash_payment::{
    ChooseCashPaymentCommand, ChooseCashPaymentHandler, ChooseCashPaymentResult,
};
pub use confirm_cash_payment::{
    ConfirmCashPaymentCommand, ConfirmCashPaymentHandler, ConfirmCashPaymentResult,
};
pub use participant_checkout::{
    ParticipantCheckoutCommand, ParticipantCheckoutHandler, ParticipantCheckoutResult,
};
pub use submit_registration::{
    SubmitRegistrationCommand, SubmitRegistrationHandler, SubmitRegistrationResult,
};
