//! Per-event sequential participant numbers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::domain::foundation::{EventId, RegistrationId};
use crate::domain::ledger::LedgerSnapshot;
use crate::domain::registration::PaymentError;
use crate::ports::{EventCatalog, NumberAssigner};

/// Counter per event, seeded from the highest number already issued.
///
/// Unknown events are numbered too; only an event explicitly configured
/// with `assign_numbers = false` gets `None`.
pub struct SequenceNumberAssigner {
    catalog: Arc<dyn EventCatalog>,
    counters: Mutex<HashMap<EventId, u32>>,
}

impl SequenceNumberAssigner {
    pub fn new(catalog: Arc<dyn EventCatalog>) -> Self {
        Self {
            catalog,
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Continues after the highest number present in `snapshot`.
    pub fn seeded_from(catalog: Arc<dyn EventCatalog>, snapshot: &LedgerSnapshot) -> Self {
        Self {
            catalog,
            counters: Mutex::new(snapshot.max_assigned_numbers()),
        }
    }

    /// Last number issued for `event_id`, zero if none.
    pub fn current(&self, event_id: EventId) -> u32 {
        self.counters
            .lock()
            .ok()
            .and_then(|c| c.get(&event_id).copied())
            .unwrap_or(0)
    }
}

impl NumberAssigner for SequenceNumberAssigner {
    fn assign_number(
        &self,
        registration_id: RegistrationId,
        event_id: EventId,
    ) -> Result<Option<u32>, PaymentError> {
        if let Some(event) = self.catalog.event(event_id) {
            if !event.assign_numbers {
                return Ok(None);
            }
        }

        let mut counters = self
            .counters
            .lock()
            .map_err(|_| PaymentError::numbering("counter lock poisoned"))?;
        let counter = counters.entry(event_id).or_insert(0);
        let next = counter
            .checked_add(1)
            .ok_or_else(|| PaymentError::numbering("participant numbers exhausted"))?;
        *counter = next;

        debug!(%registration_id, %event_id, number = next, "Assigned participant number");
        Ok(Some(next))
    }
}
