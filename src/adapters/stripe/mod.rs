//! Stripe checkout adapter.
//!
//! - `StripeCheckoutGateway` - Hosted Checkout Sessions over the REST API
//! - `MockCheckoutGateway` - In-process gateway for tests and local runs
//! - `StripeWebhookEvent` - Event envelope and routing to normalized payloads
//!
//! Webhook signatures are verified upstream; events reaching this crate
//! are trusted.
//!
//! # Security
//!
//! The secret key is held in a `secrecy::SecretString` and only exposed
//! when building the request's basic-auth header.

mod mock_checkout_gateway;
mod stripe_checkout_gateway;
mod webhook_types;

pub use mock_checkout_gateway::MockCheckoutGateway;
pub use stripe_checkout_gateway::{StripeCheckoutGateway, StripeConfig};
pub use webhook_types::{
    RegistrationPaymentEvent, StripeCharge, StripeCheckoutSession, StripeEventError,
    StripeEventRoute, StripePaymentIntent, StripeWebhookEvent,
};
