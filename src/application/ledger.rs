//! PaymentLedger - the single writer over the current snapshot.
//!
//! Every mutation runs as a closure over the current snapshot inside one
//! critical section, after the lazy expiry sweep. The closure never awaits;
//! persistence and event publication happen after the lock is released.

use std::sync::{Arc, Mutex};

use tracing::{debug, error, info, warn};

use crate::domain::foundation::Timestamp;
use crate::domain::ledger::{LedgerEvent, LedgerSnapshot};
use crate::domain::registration::{sweep_expired, PaymentError, SweepReport};
use crate::ports::{Clock, EventPublisher, SnapshotRepository};

/// Outcome of a commit closure.
#[derive(Debug)]
pub struct Commit<T> {
    next: Option<LedgerSnapshot>,
    value: T,
    events: Vec<LedgerEvent>,
}

impl<T> Commit<T> {
    /// Swap in `next` and return `value`.
    pub fn write(next: LedgerSnapshot, value: T) -> Self {
        Self {
            next: Some(next),
            value,
            events: Vec::new(),
        }
    }

    /// Leave the snapshot untouched.
    pub fn keep(value: T) -> Self {
        Self {
            next: None,
            value,
            events: Vec::new(),
        }
    }

    /// Events published once the commit is persisted.
    pub fn with_events(mut self, events: impl IntoIterator<Item = LedgerEvent>) -> Self {
        self.events.extend(events);
        self
    }
}

struct LedgerState {
    snapshot: Arc<LedgerSnapshot>,
    version: u64,
}

/// Holds the current `Arc<LedgerSnapshot>` and serializes every change to it.
pub struct PaymentLedger {
    state: Mutex<LedgerState>,
    saved_version: tokio::sync::Mutex<u64>,
    repository: Arc<dyn SnapshotRepository>,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
}

impl PaymentLedger {
    pub fn new(
        initial: LedgerSnapshot,
        repository: Arc<dyn SnapshotRepository>,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                snapshot: Arc::new(initial),
                version: 0,
            }),
            saved_version: tokio::sync::Mutex::new(0),
            repository,
            publisher,
            clock,
        }
    }

    /// Loads the persisted snapshot and starts from it.
    pub async fn load(
        repository: Arc<dyn SnapshotRepository>,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, PaymentError> {
        let snapshot = repository.load().await?;
        info!(
            registrations = snapshot.registrations().len(),
            payment_intents = snapshot.payment_intents().len(),
            sponsor_slots = snapshot.sponsor_slots().len(),
            processed_webhooks = snapshot.processed_webhook_event_ids().len(),
            "Ledger loaded"
        );
        Ok(Self::new(snapshot, repository, publisher, clock))
    }

    /// Current snapshot. Readers never block writers for longer than a clone of the `Arc`.
    pub fn current(&self) -> Result<Arc<LedgerSnapshot>, PaymentError> {
        let state = self.lock()?;
        Ok(Arc::clone(&state.snapshot))
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, LedgerState>, PaymentError> {
        self.state
            .lock()
            .map_err(|_| PaymentError::persistence("ledger lock poisoned"))
    }

    /// Sweeps expired sessions and windows, then runs `apply` on the result.
    ///
    /// The sweep is kept even when `apply` fails. `apply` receives the
    /// time used for the sweep so both observe the same instant.
    pub async fn commit<T, F>(&self, apply: F) -> Result<T, PaymentError>
    where
        F: FnOnce(&LedgerSnapshot, Timestamp) -> Result<Commit<T>, PaymentError> + Send,
        T: Send,
    {
        let (result, _) = self.commit_inner(apply).await;
        result
    }

    /// Runs only the sweep.
    pub async fn sweep(&self) -> Result<SweepReport, PaymentError> {
        let (result, report) = self.commit_inner(|_, _| Ok(Commit::keep(()))).await;
        result.map(|()| report.unwrap_or_default())
    }

    async fn commit_inner<T, F>(&self, apply: F) -> (Result<T, PaymentError>, Option<SweepReport>)
    where
        F: FnOnce(&LedgerSnapshot, Timestamp) -> Result<Commit<T>, PaymentError> + Send,
        T: Send,
    {
        let now = self.clock.now();
        let mut events = Vec::new();

        let (result, report, dirty) = {
            let mut state = match self.lock() {
                Ok(state) => state,
                Err(e) => return (Err(e), None),
            };
            let mut dirty = None;

            let report = match sweep_expired(&state.snapshot, now) {
                Some((swept, report)) => {
                    events.extend(sweep_events(&swept, &report));
                    state.snapshot = Arc::new(swept);
                    state.version += 1;
                    dirty = Some((Arc::clone(&state.snapshot), state.version));
                    debug!(
                        failed_registrations = report.failed_registrations.len(),
                        expired_intents = report.expired_intents.len(),
                        expired_sponsor_slots = report.expired_sponsor_slots.len(),
                        "Expired sessions swept"
                    );
                    Some(report)
                }
                None => None,
            };

            let result = match apply(&state.snapshot, now) {
                Ok(commit) => {
                    if let Some(next) = commit.next {
                        state.snapshot = Arc::new(next);
                        state.version += 1;
                        dirty = Some((Arc::clone(&state.snapshot), state.version));
                    }
                    events.extend(commit.events);
                    Ok(commit.value)
                }
                Err(e) => Err(e),
            };
            (result, report, dirty)
        };

        if let Some((snapshot, version)) = dirty {
            if let Err(e) = self.persist(&snapshot, version).await {
                return (Err(e), report);
            }
        }

        if !events.is_empty() {
            if let Err(e) = self.publisher.publish_all(events).await {
                warn!(error = %e, "Ledger event publication failed");
            }
        }

        (result, report)
    }

    /// Saves `snapshot` unless a newer version was already written.
    async fn persist(&self, snapshot: &LedgerSnapshot, version: u64) -> Result<(), PaymentError> {
        let mut saved = self.saved_version.lock().await;
        if *saved >= version {
            return Ok(());
        }
        self.repository.save(snapshot).await.map_err(|e| {
            error!(error = %e, version, "Snapshot save failed");
            PaymentError::from(e)
        })?;
        *saved = version;
        Ok(())
    }
}

fn sweep_events(snapshot: &LedgerSnapshot, report: &SweepReport) -> Vec<LedgerEvent> {
    let registrations = report
        .failed_registrations
        .iter()
        .filter_map(|id| snapshot.registration(*id))
        .filter_map(LedgerEvent::for_registration);
    let slots = report
        .expired_sponsor_slots
        .iter()
        .filter_map(|id| snapshot.sponsor_slot(*id))
        .map(LedgerEvent::for_sponsor_slot);
    registrations.chain(slots).collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::adapters::events::InMemoryEventBus;
    use crate::adapters::storage::InMemorySnapshotRepository;
    use crate::ports::FixedClock;

    pub fn now() -> Timestamp {
        Timestamp::parse_rfc3339("t", "2025-05-01T10:00:00Z").unwrap()
    }

    pub struct TestLedger {
        pub ledger: Arc<PaymentLedger>,
        pub repository: Arc<InMemorySnapshotRepository>,
        pub events: Arc<InMemoryEventBus>,
    }

    pub fn ledger_at(snapshot: LedgerSnapshot, at: Timestamp) -> TestLedger {
        let repository = Arc::new(InMemorySnapshotRepository::new());
        let events = Arc::new(InMemoryEventBus::new());
        let ledger = Arc::new(PaymentLedger::new(
            snapshot,
            repository.clone(),
            events.clone(),
            Arc::new(FixedClock::at(at)),
        ));
        TestLedger {
            ledger,
            repository,
            events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::domain::foundation::{Currency, EventId, Money, OrganizerId};
    use crate::domain::registration::aggregate::test_support::{consents, participant};
    use crate::domain::registration::{
        PaymentIntent, PaymentProvider, Registration, RegistrationCode, RegistrationStatus,
    };

    fn pending_snapshot(expires_at: Timestamp) -> (LedgerSnapshot, Registration) {
        let mut reg = Registration::pending_payment(
            EventId::new(),
            OrganizerId::new(),
            participant("a@b.it"),
            consents(),
            RegistrationCode::from_string("RUN-00001"),
            Money::from_cents(2500),
            Money::from_cents(75),
            expires_at,
            now(),
        );
        let intent = PaymentIntent::open(&reg, PaymentProvider::Stripe, Currency::Eur, expires_at, now());
        reg.payment_intent_id = Some(intent.id);
        let mut snapshot = LedgerSnapshot::default();
        snapshot.upsert_registration(reg.clone());
        snapshot.upsert_payment_intent(intent);
        (snapshot, reg)
    }

    #[tokio::test]
    async fn keep_does_not_write_or_swap() {
        let t = ledger_at(LedgerSnapshot::default(), now());
        let before = t.ledger.current().unwrap();

        let value = t.ledger.commit(|_, _| Ok(Commit::keep(7))).await.unwrap();

        assert_eq!(value, 7);
        assert!(Arc::ptr_eq(&before, &t.ledger.current().unwrap()));
        assert_eq!(t.repository.save_count(), 0);
    }

    #[tokio::test]
    async fn write_swaps_persists_and_publishes() {
        let t = ledger_at(LedgerSnapshot::default(), now());
        let (snapshot, reg) = pending_snapshot(now().plus_minutes(15));

        t.ledger
            .commit(|_, at| {
                let event = LedgerEvent::RegistrationSubmitted {
                    registration_id: reg.id,
                    event_id: reg.event_id,
                    payment_intent_id: reg.payment_intent_id,
                    occurred_at: at,
                };
                Ok(Commit::write(snapshot.clone(), ()).with_events([event]))
            })
            .await
            .unwrap();

        assert!(t.ledger.current().unwrap().registration(reg.id).is_some());
        assert_eq!(t.repository.save_count(), 1);
        assert!(t.repository.stored().unwrap().registration(reg.id).is_some());
        assert!(t.events.has_event("registration.submitted"));
    }

    #[tokio::test]
    async fn sweep_runs_before_the_command_and_survives_its_failure() {
        let (snapshot, reg) = pending_snapshot(now().plus_minutes(15));
        let t = ledger_at(snapshot, now().plus_minutes(20));

        let seen = t
            .ledger
            .commit(|s, _| -> Result<Commit<()>, PaymentError> {
                assert_eq!(
                    s.registration(reg.id).unwrap().registration_status,
                    RegistrationStatus::PaymentFailed
                );
                Err(PaymentError::persistence("command failed"))
            })
            .await;

        assert!(seen.is_err());
        let current = t.ledger.current().unwrap();
        assert_eq!(
            current.registration(reg.id).unwrap().registration_status,
            RegistrationStatus::PaymentFailed
        );
        assert_eq!(t.repository.save_count(), 1);
        assert!(t.events.has_event("registration.payment_failed"));
    }

    #[tokio::test]
    async fn sweeping_twice_writes_once() {
        let (snapshot, reg) = pending_snapshot(now().plus_minutes(15));
        let t = ledger_at(snapshot, now().plus_minutes(20));

        let first = t.ledger.sweep().await.unwrap();
        let after_first = t.ledger.current().unwrap();
        let second = t.ledger.sweep().await.unwrap();

        assert_eq!(first.failed_registrations, vec![reg.id]);
        assert!(second.is_empty());
        assert!(Arc::ptr_eq(&after_first, &t.ledger.current().unwrap()));
        assert_eq!(t.repository.save_count(), 1);
    }

    #[tokio::test]
    async fn save_failure_surfaces_as_retryable_persistence_error() {
        let t = ledger_at(LedgerSnapshot::default(), now());
        t.repository.fail_saves(true);
        let (snapshot, _) = pending_snapshot(now().plus_minutes(15));

        let err = t
            .ledger
            .commit(|_, _| Ok(Commit::write(snapshot.clone(), ())))
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::Persistence(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn publish_failure_does_not_roll_back() {
        let t = ledger_at(LedgerSnapshot::default(), now());
        t.events.fail_publishing();
        let (snapshot, reg) = pending_snapshot(now().plus_minutes(15));

        t.ledger
            .commit(|_, at| {
                Ok(Commit::write(snapshot.clone(), ()).with_events([
                    LedgerEvent::RegistrationCancelled {
                        registration_id: reg.id,
                        occurred_at: at,
                    },
                ]))
            })
            .await
            .unwrap();

        assert!(t.ledger.current().unwrap().registration(reg.id).is_some());
    }
}
