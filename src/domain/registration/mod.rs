//! Registration module - participant registrations and their payments.
//!
//! # Lifecycle
//!
//! A paid registration is created `pending_payment` together with its first
//! payment intent. From there it moves only through validated pair
//! transitions: webhooks, the lazy sweeper, or explicit cash/cancel
//! commands. Free registrations start `paid` with no intent.

pub(crate) mod aggregate;
mod checkout;
mod commands;
mod commission;
mod errors;
mod payment_intent;
mod status;
mod sweeper;
mod transition;
mod webhook;
mod webhook_processor;

pub use aggregate::{Consents, Participant, PaymentMethod, Registration, RegistrationCode};
pub use checkout::{
    attach_checkout, fail_checkout, plan_checkout, CheckoutPlan, OpenedSession,
    CHECKOUT_FAILED_PREFIX,
};
pub use commands::{
    cancel_registration, choose_cash_payment, confirm_cash_payment, submit_registration,
    RegistrationChange, RegistrationPricing, CANCELLED_REASON,
};
pub use commission::{
    application_fee_cents, compute_commission, CommissionBreakdown, CommissionInput,
    DEFAULT_COMMISSION_RATE,
};
pub use errors::{EntityKind, PaymentError};
pub use payment_intent::{PaymentIntent, PaymentProvider};
pub use status::{PaymentIntentStatus, PaymentStatus, RegistrationStatus};
pub use sweeper::{sweep_expired, SweepReport, CASH_DEADLINE_REASON, SESSION_EXPIRED_REASON};
pub use transition::{PairTransition, TransitionedPair};
pub use webhook::{
    PaymentOutcome, PaymentWebhook, PaymentWebhookPayload, DEFAULT_EXPIRED_REASON,
    DEFAULT_FAILED_REASON,
};
pub use webhook_processor::{apply_payment_webhook, AppliedWebhook, WebhookApplication};
