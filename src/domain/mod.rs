//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (ids, money, timestamps, errors)
//! - `registration` - Registration and payment intent lifecycles, webhooks, sweeper
//! - `sponsor` - Sponsor slot lifecycle and sponsor module activation
//! - `ledger` - The persisted snapshot, dedup ledger and post-commit events

pub mod foundation;
pub mod ledger;
pub mod registration;
pub mod sponsor;
