//! Sponsor slot status state machine.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a sponsor advertising slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SponsorSlotStatus {
    /// Created by the organizer, checkout not yet completed.
    #[default]
    PendingPayment,

    /// Paid. Visible only while inside its window.
    Active,

    /// Window ended, or checkout session expired before payment.
    Expired,

    /// Withdrawn by the organizer.
    Cancelled,

    /// Checkout could not be created or the payment was declined.
    PaymentFailed,

    /// Paid and then refunded.
    Refunded,
}

impl SponsorSlotStatus {
    pub const ALL: [SponsorSlotStatus; 6] = [
        SponsorSlotStatus::PendingPayment,
        SponsorSlotStatus::Active,
        SponsorSlotStatus::Expired,
        SponsorSlotStatus::Cancelled,
        SponsorSlotStatus::PaymentFailed,
        SponsorSlotStatus::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SponsorSlotStatus::PendingPayment => "pending_payment",
            SponsorSlotStatus::Active => "active",
            SponsorSlotStatus::Expired => "expired",
            SponsorSlotStatus::Cancelled => "cancelled",
            SponsorSlotStatus::PaymentFailed => "payment_failed",
            SponsorSlotStatus::Refunded => "refunded",
        }
    }
}

impl StateMachine for SponsorSlotStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SponsorSlotStatus::*;
        matches!(
            (self, target),
            (PendingPayment, Active)
                | (PendingPayment, Expired)
                | (PendingPayment, Cancelled)
                | (PendingPayment, PaymentFailed)
                | (Active, Expired)
                | (Active, Cancelled)
                | (Active, Refunded)
                | (Expired, Refunded)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SponsorSlotStatus::*;
        match self {
            PendingPayment => vec![Active, Expired, Cancelled, PaymentFailed],
            Active => vec![Expired, Cancelled, Refunded],
            Expired => vec![Refunded],
            Cancelled => vec![],
            PaymentFailed => vec![],
            Refunded => vec![],
        }
    }
}

impl fmt::Display for SponsorSlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
