//! Ledger module - the persisted unit of state.
//!
//! One [`LedgerSnapshot`] holds every registration, payment intent, sponsor
//! slot and processed webhook id. It is saved and loaded as a whole.

mod events;
mod legacy;
mod snapshot;

pub use events::LedgerEvent;
pub use legacy::legacy_uuid;
pub use snapshot::LedgerSnapshot;
