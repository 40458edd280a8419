//! EventCatalog port - read-only facts about events.
//!
//! Events are published and edited elsewhere; this core only reads the
//! fields that drive pricing, cash payment and numbering.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{EventId, Money, OrganizerId, Timestamp};

/// What the payment core needs to know about one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInfo {
    pub id: EventId,
    pub organizer_id: OrganizerId,
    pub name: String,
    /// Day of the event; it stays open until 23:59:59.999 UTC.
    pub event_date: NaiveDate,
    /// Zero for free events.
    #[serde(default)]
    pub fee_amount: Money,
    #[serde(default)]
    pub accepts_cash: bool,
    /// Last day on which a cash payment may be confirmed.
    #[serde(default)]
    pub cash_deadline: Option<NaiveDate>,
    #[serde(default = "default_assign_numbers")]
    pub assign_numbers: bool,
    /// Provider account receiving the organizer's share, if connected.
    #[serde(default)]
    pub payout_account_id: Option<String>,
}

fn default_assign_numbers() -> bool {
    true
}

impl EventInfo {
    pub fn is_free(&self) -> bool {
        !self.fee_amount.is_positive()
    }

    pub fn ends_at(&self) -> Timestamp {
        Timestamp::end_of_day(self.event_date)
    }

    /// End of the cash deadline day, when cash is accepted at all.
    pub fn cash_deadline_at(&self) -> Option<Timestamp> {
        if !self.accepts_cash {
            return None;
        }
        self.cash_deadline.map(Timestamp::end_of_day)
    }
}

/// Synchronous lookup; implementations hold the catalog in memory.
pub trait EventCatalog: Send + Sync {
    fn event(&self, id: EventId) -> Option<EventInfo>;
}
