//! HTTP adapter for the payment endpoints.
//!
//! - `POST /registrations` - Submit a registration
//! - `GET /registrations/:id` - Read a registration
//! - `POST /registrations/:id/cash` - Choose cash payment
//! - `POST /registrations/:id/cash/confirm` - Confirm cash payment
//! - `POST /registrations/:id/cancel` - Cancel an unpaid registration
//! - `POST /checkout/participant` - Participant hosted checkout
//! - `POST /checkout/sponsor-module` - Sponsor module activation checkout
//! - `POST /checkout/sponsor-slot` - Sponsor slot checkout
//! - `POST /webhooks/payments` - Normalized payment webhook
//! - `POST /webhooks/sponsors` - Normalized sponsor webhook
//! - `POST /webhooks/stripe` - Raw Stripe event

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{PaymentsApiError, PaymentsAppState, SponsorSettings};
pub use routes::payments_router;
