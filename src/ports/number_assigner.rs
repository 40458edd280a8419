//! NumberAssigner port - sequential participant numbers (bib numbers).

use crate::domain::foundation::{EventId, RegistrationId};
use crate::domain::registration::PaymentError;

/// Hands out the next participant number for an event.
///
/// Called only from inside the ledger's commit section, which serializes
/// calls; implementations must still be safe to share across threads.
/// Numbers per event are `1, 2, 3, ...` with no gaps and no repeats.
///
/// Returns `Ok(None)` when the event does not number its participants.
pub trait NumberAssigner: Send + Sync {
    fn assign_number(
        &self,
        registration_id: RegistrationId,
        event_id: EventId,
    ) -> Result<Option<u32>, PaymentError>;
}
