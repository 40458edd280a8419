//! Axum router configuration for the payment endpoints.

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{
    cancel_registration, choose_cash_payment, confirm_cash_payment, get_registration,
    participant_checkout, payment_webhook, sponsor_module_checkout, sponsor_slot_checkout,
    sponsor_webhook, stripe_webhook, submit_registration, PaymentsAppState,
};

/// Registration lifecycle routes.
///
/// - `POST /` - Submit a registration
/// - `GET /:id` - Registration with its linked intent
/// - `POST /:id/cash` - Choose cash payment
/// - `POST /:id/cash/confirm` - Confirm collected cash
/// - `POST /:id/cancel` - Cancel an unpaid registration
pub fn registration_routes() -> Router<PaymentsAppState> {
    Router::new()
        .route("/", post(submit_registration))
        .route("/:id", get(get_registration))
        .route("/:id/cash", post(choose_cash_payment))
        .route("/:id/cash/confirm", post(confirm_cash_payment))
        .route("/:id/cancel", post(cancel_registration))
}

/// Hosted checkout routes. Browser origins are checked against the redirect allow-list.
pub fn checkout_routes() -> Router<PaymentsAppState> {
    Router::new()
        .route("/participant", post(participant_checkout))
        .route("/sponsor-module", post(sponsor_module_checkout))
        .route("/sponsor-slot", post(sponsor_slot_checkout))
}

/// Provider callbacks. Signatures are verified before requests reach these routes.
pub fn webhook_routes() -> Router<PaymentsAppState> {
    Router::new()
        .route("/payments", post(payment_webhook))
        .route("/sponsors", post(sponsor_webhook))
        .route("/stripe", post(stripe_webhook))
}

/// All payment routes, ready to be given a state.
pub fn payments_router() -> Router<PaymentsAppState> {
    Router::new()
        .nest("/registrations", registration_routes())
        .nest("/checkout", checkout_routes())
        .nest("/webhooks", webhook_routes())
}
