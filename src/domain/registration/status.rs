//! Registration and payment intent status state machines.
//!
//! Both tables are enumerated exhaustively. A pair absent from a table is
//! illegal, including self-transitions such as `captured → captured`.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a participant registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    /// Waiting for an online payment to settle.
    PendingPayment,

    /// Participant chose to pay cash on site before the cash deadline.
    PendingCash,

    /// Confirmed. Free registrations start here.
    Paid,

    /// Payment declined, session expired or cash deadline missed.
    PaymentFailed,

    /// Withdrawn before payment settled.
    Cancelled,

    /// Paid and then refunded in full.
    Refunded,
}

impl RegistrationStatus {
    pub const ALL: [RegistrationStatus; 6] = [
        RegistrationStatus::PendingPayment,
        RegistrationStatus::PendingCash,
        RegistrationStatus::Paid,
        RegistrationStatus::PaymentFailed,
        RegistrationStatus::Cancelled,
        RegistrationStatus::Refunded,
    ];

    /// Returns the wire name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::PendingPayment => "pending_payment",
            RegistrationStatus::PendingCash => "pending_cash",
            RegistrationStatus::Paid => "paid",
            RegistrationStatus::PaymentFailed => "payment_failed",
            RegistrationStatus::Cancelled => "cancelled",
            RegistrationStatus::Refunded => "refunded",
        }
    }

    /// Returns true while a payment session or cash deadline is running.
    pub fn is_awaiting_payment(&self) -> bool {
        matches!(
            self,
            RegistrationStatus::PendingPayment | RegistrationStatus::PendingCash
        )
    }
}

impl StateMachine for RegistrationStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use RegistrationStatus::*;
        matches!(
            (self, target),
            (PendingPayment, PendingCash)
                | (PendingPayment, Paid)
                | (PendingPayment, PaymentFailed)
                | (PendingPayment, Cancelled)
                | (PendingCash, Paid)
                | (PendingCash, PaymentFailed)
                | (PendingCash, Cancelled)
                | (Paid, Refunded)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use RegistrationStatus::*;
        match self {
            PendingPayment => vec![PendingCash, Paid, PaymentFailed, Cancelled],
            PendingCash => vec![Paid, PaymentFailed, Cancelled],
            Paid => vec![Refunded],
            PaymentFailed => vec![],
            Cancelled => vec![],
            Refunded => vec![],
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of one attempt to collect money for a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentIntentStatus {
    Pending,
    RequiresAction,
    Authorized,
    Captured,
    Failed,
    Expired,
    Refunded,
    Cancelled,
}

impl PaymentIntentStatus {
    pub const ALL: [PaymentIntentStatus; 8] = [
        PaymentIntentStatus::Pending,
        PaymentIntentStatus::RequiresAction,
        PaymentIntentStatus::Authorized,
        PaymentIntentStatus::Captured,
        PaymentIntentStatus::Failed,
        PaymentIntentStatus::Expired,
        PaymentIntentStatus::Refunded,
        PaymentIntentStatus::Cancelled,
    ];

    /// Returns the wire name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentIntentStatus::Pending => "pending",
            PaymentIntentStatus::RequiresAction => "requires_action",
            PaymentIntentStatus::Authorized => "authorized",
            PaymentIntentStatus::Captured => "captured",
            PaymentIntentStatus::Failed => "failed",
            PaymentIntentStatus::Expired => "expired",
            PaymentIntentStatus::Refunded => "refunded",
            PaymentIntentStatus::Cancelled => "cancelled",
        }
    }

    /// Open intents can still settle and may be force-expired.
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            PaymentIntentStatus::Pending
                | PaymentIntentStatus::RequiresAction
                | PaymentIntentStatus::Authorized
        )
    }
}

impl StateMachine for PaymentIntentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentIntentStatus::*;
        matches!(
            (self, target),
            (Pending, RequiresAction)
                | (Pending, Authorized)
                | (Pending, Captured)
                | (Pending, Failed)
                | (Pending, Expired)
                | (Pending, Cancelled)
                | (RequiresAction, Authorized)
                | (RequiresAction, Captured)
                | (RequiresAction, Failed)
                | (RequiresAction, Expired)
                | (RequiresAction, Cancelled)
                | (Authorized, Captured)
                | (Authorized, Failed)
                | (Authorized, Cancelled)
                | (Captured, Refunded)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PaymentIntentStatus::*;
        match self {
            Pending => vec![RequiresAction, Authorized, Captured, Failed, Expired, Cancelled],
            RequiresAction => vec![Authorized, Captured, Failed, Expired, Cancelled],
            Authorized => vec![Captured, Failed, Cancelled],
            Captured => vec![Refunded],
            Failed => vec![],
            Expired => vec![],
            Refunded => vec![],
            Cancelled => vec![],
        }
    }
}

impl fmt::Display for PaymentIntentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment status mirrored onto the registration for display and export.
///
/// Either the linked intent's status or `not_required` for free events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    NotRequired,
    Pending,
    RequiresAction,
    Authorized,
    Captured,
    Failed,
    Expired,
    Refunded,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::NotRequired => "not_required",
            PaymentStatus::Pending => "pending",
            PaymentStatus::RequiresAction => "requires_action",
            PaymentStatus::Authorized => "authorized",
            PaymentStatus::Captured => "captured",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Expired => "expired",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Cancelled => "cancelled",
        }
    }
}

impl From<PaymentIntentStatus> for PaymentStatus {
    fn from(status: PaymentIntentStatus) -> Self {
        match status {
            PaymentIntentStatus::Pending => PaymentStatus::Pending,
            PaymentIntentStatus::RequiresAction => PaymentStatus::RequiresAction,
            PaymentIntentStatus::Authorized => PaymentStatus::Authorized,
            PaymentIntentStatus::Captured => PaymentStatus::Captured,
            PaymentIntentStatus::Failed => PaymentStatus::Failed,
            PaymentIntentStatus::Expired => PaymentStatus::Expired,
            PaymentIntentStatus::Refunded => PaymentStatus::Refunded,
            PaymentIntentStatus::Cancelled => PaymentStatus::Cancelled,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn registration_status() -> impl Strategy<Value = RegistrationStatus> {
        prop::sample::select(RegistrationStatus::ALL.to_vec())
    }

    fn intent_status() -> impl Strategy<Value = PaymentIntentStatus> {
        prop::sample::select(PaymentIntentStatus::ALL.to_vec())
    }

    // ══════════════════════════════════════════════════════════════
    // RegistrationStatus
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn pending_payment_reaches_every_listed_target() {
        let from = RegistrationStatus::PendingPayment;
        for to in [
            RegistrationStatus::PendingCash,
            RegistrationStatus::Paid,
            RegistrationStatus::PaymentFailed,
            RegistrationStatus::Cancelled,
        ] {
            assert_eq!(from.transition_to(to), Ok(to));
        }
    }

    #[test]
    fn pending_cash_cannot_return_to_pending_payment() {
        assert!(!RegistrationStatus::PendingCash
            .can_transition_to(&RegistrationStatus::PendingPayment));
    }

    #[test]
    fn paid_only_moves_to_refunded() {
        assert_eq!(
            RegistrationStatus::Paid.valid_transitions(),
            vec![RegistrationStatus::Refunded]
        );
        assert!(!RegistrationStatus::Paid.can_transition_to(&RegistrationStatus::Cancelled));
    }

    #[test]
    fn registration_terminal_states_have_no_exits() {
        assert!(RegistrationStatus::PaymentFailed.is_terminal());
        assert!(RegistrationStatus::Cancelled.is_terminal());
        assert!(RegistrationStatus::Refunded.is_terminal());
        assert!(!RegistrationStatus::Paid.is_terminal());
    }

    #[test]
    fn registration_status_serializes_snake_case() {
        let json = serde_json::to_string(&RegistrationStatus::PendingCash).unwrap();
        assert_eq!(json, "\"pending_cash\"");
    }

    // ══════════════════════════════════════════════════════════════
    // PaymentIntentStatus
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn captured_to_captured_is_rejected() {
        let err = PaymentIntentStatus::Captured
            .transition_to(PaymentIntentStatus::Captured)
            .unwrap_err();
        assert!(err.to_string().contains("Captured"));
    }

    #[test]
    fn authorized_cannot_expire() {
        assert!(!PaymentIntentStatus::Authorized.can_transition_to(&PaymentIntentStatus::Expired));
    }

    #[test]
    fn open_statuses_are_exactly_the_pre_settlement_ones() {
        let open: Vec<_> = PaymentIntentStatus::ALL
            .into_iter()
            .filter(|s| s.is_open())
            .collect();
        assert_eq!(
            open,
            vec![
                PaymentIntentStatus::Pending,
                PaymentIntentStatus::RequiresAction,
                PaymentIntentStatus::Authorized
            ]
        );
    }

    #[test]
    fn intent_terminal_states_have_no_exits() {
        for status in [
            PaymentIntentStatus::Failed,
            PaymentIntentStatus::Expired,
            PaymentIntentStatus::Refunded,
            PaymentIntentStatus::Cancelled,
        ] {
            assert!(status.is_terminal(), "{status} should be terminal");
        }
    }

    #[test]
    fn payment_status_mirrors_intent_names() {
        for status in PaymentIntentStatus::ALL {
            assert_eq!(PaymentStatus::from(status).as_str(), status.as_str());
        }
    }

    proptest! {
        #[test]
        fn registration_table_and_predicate_agree(from in registration_status(), to in registration_status()) {
            prop_assert_eq!(
                from.can_transition_to(&to),
                from.valid_transitions().contains(&to)
            );
            prop_assert_eq!(from.transition_to(to).is_ok(), from.can_transition_to(&to));
        }

        #[test]
        fn intent_table_and_predicate_agree(from in intent_status(), to in intent_status()) {
            prop_assert_eq!(
                from.can_transition_to(&to),
                from.valid_transitions().contains(&to)
            );
            prop_assert_eq!(from.transition_to(to).is_ok(), from.can_transition_to(&to));
        }

        #[test]
        fn no_status_transitions_to_itself(from in intent_status(), reg in registration_status()) {
            prop_assert!(!from.can_transition_to(&from));
            prop_assert!(!reg.can_transition_to(&reg));
        }
    }
}
