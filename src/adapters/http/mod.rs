//! HTTP adapters - REST API implementations.

mod app;
pub mod payments;

pub use app::{app_router, HttpSettings};
pub use payments::{payments_router, PaymentsAppState, SponsorSettings};
