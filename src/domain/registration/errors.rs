//! Payment lifecycle error taxonomy.
//!
//! Shared by registrations, payment intents, sponsor slots and the
//! sponsor module toggle.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status | Retryable |
//! |-------|-------------|-----------|
//! | Validation | 400 | no |
//! | PackageExceedsEventLifetime | 422 | no |
//! | NotFound | 404 | no |
//! | InvalidTransition | 409 | no |
//! | DuplicateRegistration | 409 | no |
//! | DuplicateWebhook | 200 | no |
//! | ExternalCollaborator | 502 | yes |
//! | Persistence | 503 | yes |

use axum::http::StatusCode;
use std::fmt;
use thiserror::Error;

use crate::domain::foundation::{
    DomainError, ErrorCode, RegistrationId, ValidationError, WebhookEventId,
};

/// Entity kinds named in not-found and transition errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Registration,
    PaymentIntent,
    SponsorSlot,
    SponsorModule,
    Event,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Registration => "registration",
            EntityKind::PaymentIntent => "payment intent",
            EntityKind::SponsorSlot => "sponsor slot",
            EntityKind::SponsorModule => "sponsor module",
            EntityKind::Event => "event",
        };
        f.write_str(s)
    }
}

/// Errors raised by the payment lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    /// Malformed or missing input, rejected before any lookup.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Unknown id. Nothing is auto-created.
    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: String },

    /// Illegal `current → attempted` transition. Nothing was mutated.
    #[error("Invalid {entity} transition: {current} -> {attempted}")]
    InvalidTransition {
        entity: EntityKind,
        current: String,
        attempted: String,
    },

    /// Webhook id already in the dedup ledger. Success-shaped at the HTTP surface.
    #[error("Webhook {0} already processed")]
    DuplicateWebhook(WebhookEventId),

    /// A non-terminal registration already exists for this event and email.
    #[error("Participant already registered: {existing}")]
    DuplicateRegistration { existing: RegistrationId },

    /// Sponsor package longer than the event's remaining lifetime.
    #[error("Package of {requested} days exceeds the event lifetime (max {max_package_days})")]
    PackageExceedsEventLifetime { requested: u32, max_package_days: u32 },

    /// Numbering or checkout provider failure. The dependent transition was not committed.
    #[error("{collaborator} failed: {message}")]
    ExternalCollaborator {
        collaborator: &'static str,
        message: String,
    },

    /// Snapshot could not be persisted after an in-memory commit.
    #[error("Persistence failed: {0}")]
    Persistence(String),
}

impl PaymentError {
    pub fn not_found(entity: EntityKind, id: impl fmt::Display) -> Self {
        PaymentError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid_transition(
        entity: EntityKind,
        current: impl fmt::Display,
        attempted: impl fmt::Display,
    ) -> Self {
        PaymentError::InvalidTransition {
            entity,
            current: current.to_string(),
            attempted: attempted.to_string(),
        }
    }

    pub fn checkout_provider(message: impl Into<String>) -> Self {
        PaymentError::ExternalCollaborator {
            collaborator: "checkout provider",
            message: message.into(),
        }
    }

    pub fn numbering(message: impl Into<String>) -> Self {
        PaymentError::ExternalCollaborator {
            collaborator: "number assigner",
            message: message.into(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        PaymentError::Persistence(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            PaymentError::Validation(_) => ErrorCode::ValidationFailed,
            PaymentError::NotFound { entity, .. } => match entity {
                EntityKind::Registration => ErrorCode::RegistrationNotFound,
                EntityKind::PaymentIntent => ErrorCode::PaymentIntentNotFound,
                EntityKind::SponsorSlot | EntityKind::SponsorModule => {
                    ErrorCode::SponsorSlotNotFound
                }
                EntityKind::Event => ErrorCode::EventNotFound,
            },
            PaymentError::InvalidTransition { .. } => ErrorCode::InvalidStateTransition,
            PaymentError::DuplicateWebhook(_) => ErrorCode::DuplicateWebhook,
            PaymentError::DuplicateRegistration { .. } => ErrorCode::DuplicateRegistration,
            PaymentError::PackageExceedsEventLifetime { .. } => {
                ErrorCode::PackageExceedsEventLifetime
            }
            PaymentError::ExternalCollaborator { collaborator, .. } => {
                if *collaborator == "number assigner" {
                    ErrorCode::NumberingError
                } else {
                    ErrorCode::CheckoutProviderError
                }
            }
            PaymentError::Persistence(_) => ErrorCode::StorageError,
        }
    }

    /// Returns true if the caller may retry the same request.
    ///
    /// Validation, not-found and transition failures are deterministic.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentError::ExternalCollaborator { .. } | PaymentError::Persistence(_)
        )
    }

    /// Maps the error to an HTTP status code.
    ///
    /// Duplicate webhooks acknowledge with 200 so the provider stops retrying.
    pub fn status_code(&self) -> StatusCode {
        match self {
            PaymentError::Validation(_) => StatusCode::BAD_REQUEST,
            PaymentError::PackageExceedsEventLifetime { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            PaymentError::NotFound { .. } => StatusCode::NOT_FOUND,
            PaymentError::InvalidTransition { .. }
            | PaymentError::DuplicateRegistration { .. } => StatusCode::CONFLICT,
            PaymentError::DuplicateWebhook(_) => StatusCode::OK,
            PaymentError::ExternalCollaborator { .. } => StatusCode::BAD_GATEWAY,
            PaymentError::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        DomainError::new(err.code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_carries_both_states() {
        let err = PaymentError::invalid_transition(EntityKind::PaymentIntent, "captured", "captured");
        assert_eq!(
            err.to_string(),
            "Invalid payment intent transition: captured -> captured"
        );
        assert_eq!(err.code(), ErrorCode::InvalidStateTransition);
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn duplicate_webhook_is_success_shaped() {
        let err = PaymentError::DuplicateWebhook(WebhookEventId::new("evt_1").unwrap());
        assert_eq!(err.status_code(), StatusCode::OK);
        assert!(!err.is_retryable());
    }

    #[test]
    fn collaborator_failures_are_retryable() {
        assert!(PaymentError::checkout_provider("timeout").is_retryable());
        assert!(PaymentError::numbering("poisoned").is_retryable());
        assert!(PaymentError::persistence("disk full").is_retryable());
        assert_eq!(
            PaymentError::numbering("poisoned").code(),
            ErrorCode::NumberingError
        );
    }

    #[test]
    fn deterministic_failures_are_not_retryable() {
        assert!(!PaymentError::not_found(EntityKind::Registration, "r1").is_retryable());
        assert!(!PaymentError::from(ValidationError::empty_field("email")).is_retryable());
    }

    #[test]
    fn package_error_reports_maximum_days() {
        let err = PaymentError::PackageExceedsEventLifetime {
            requested: 10,
            max_package_days: 3,
        };
        assert!(err.to_string().contains("max 3"));
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn converts_to_domain_error_with_code() {
        let err: DomainError = PaymentError::not_found(EntityKind::PaymentIntent, "pi").into();
        assert_eq!(err.code, ErrorCode::PaymentIntentNotFound);
    }
}
