//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the payment core to external systems:
//! - `catalog` - Event catalog loaded from JSON
//! - `events` - Ledger event publishers (in-memory, tracing)
//! - `http` - Axum REST surface
//! - `numbering` - Per-event participant numbers
//! - `storage` - Snapshot repositories (file, in-memory)
//! - `stripe` - Stripe checkout gateway, mock gateway and webhook routing

pub mod catalog;
pub mod events;
pub mod http;
pub mod numbering;
pub mod storage;
pub mod stripe;

pub use catalog::InMemoryEventCatalog;
pub use events::{InMemoryEventBus, TracingEventPublisher};
pub use http::{app_router, payments_router, HttpSettings, PaymentsAppState, SponsorSettings};
pub use numbering::SequenceNumberAssigner;
pub use storage::{FileSnapshotRepository, InMemorySnapshotRepository};
pub use stripe::{MockCheckoutGateway, StripeCheckoutGateway, StripeConfig};
