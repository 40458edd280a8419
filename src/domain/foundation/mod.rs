//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, money and error types
//! that form the vocabulary of the registration payments domain.

mod errors;
mod ids;
mod money;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{EventId, OrganizerId, PaymentIntentId, RegistrationId, SponsorSlotId, WebhookEventId};
pub use money::{round2, Currency, Money};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
