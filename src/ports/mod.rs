//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Synchronous Ports
//!
//! Called from inside the ledger's commit section, so they never await.
//!
//! - `NumberAssigner` - Sequential participant numbers per event
//! - `EventCatalog` - Read-only event facts (fee, dates, cash policy)
//! - `Clock` - Current time
//!
//! ## Boundary Ports
//!
//! Called outside the commit section, with their own retry policy.
//!
//! - `CheckoutGateway` - Hosted checkout sessions at the payment provider
//! - `SnapshotRepository` - Durable storage of the ledger snapshot
//! - `EventPublisher` - Post-commit notifications

mod checkout_gateway;
mod clock;
mod event_catalog;
mod event_publisher;
mod number_assigner;
mod snapshot_repository;

pub use checkout_gateway::{
    CheckoutGateway, CheckoutPurpose, CheckoutRequest, CheckoutSession, GatewayError,
    GatewayErrorCode, KIND_REGISTRATION, METADATA_PAYMENT_INTENT_ID,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use event_catalog::{EventCatalog, EventInfo};
pub use event_publisher::EventPublisher;
pub use number_assigner::NumberAssigner;
pub use snapshot_repository::{SnapshotRepository, SnapshotStorageError};
