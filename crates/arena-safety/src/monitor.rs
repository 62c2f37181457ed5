//! Serialized entry point shared by transport tasks.
//!
//! Every update runs all reconciliation steps, arena calls and the notify
//! signal under one mutex. Snapshots take the same mutex, so a snapshot never
//! observes a partially applied update.
//!
//! Lock order: monitor, then whatever the arena takes internally.

use chrono::Utc;
use parking_lot::Mutex;
use tracing::debug;

use crate::{
    build_snapshot, Alliance, AllianceSafetyStatus, ApplyOutcome, ChangeNotifier, EStops,
    NotifierSnapshot, Reconciler, SafetyError, SafetyUpdate, StationEstops, StatusStore,
};

pub struct SafetyMonitor<A, N> {
    reconciler: Mutex<Reconciler>,
    arena: A,
    notifier: N,
}

impl<A, N> SafetyMonitor<A, N>
where
    A: StationEstops,
    N: ChangeNotifier,
{
    /// Boot the monitor with a fresh [`StatusStore`].
    pub fn new(arena: A, notifier: N) -> Self {
        Self {
            reconciler: Mutex::new(Reconciler::new(StatusStore::new())),
            arena,
            notifier,
        }
    }

    pub fn apply_update(&self, update: SafetyUpdate) -> ApplyOutcome {
        let mut rec = self.reconciler.lock();
        rec.apply_update_at(update, Utc::now(), &self.arena, &self.notifier)
    }

    /// Raw-key ingress with an explicit rejection for unknown alliances.
    pub fn apply_raw(&self, alliance: &str, estops: EStops) -> Result<ApplyOutcome, SafetyError> {
        let mut rec = self.reconciler.lock();
        rec.apply_raw_at(alliance, estops, Utc::now(), &self.arena, &self.notifier)
    }

    /// Default transport wiring: unknown alliance keys are dropped silently.
    /// Returns `true` if the update changed visible state.
    pub fn ingest(&self, alliance: &str, estops: EStops) -> bool {
        match self.apply_raw(alliance, estops) {
            Ok(outcome) => outcome.changed,
            Err(err) => {
                debug!(%err, "safety update dropped");
                false
            }
        }
    }

    pub fn snapshot(&self) -> NotifierSnapshot {
        build_snapshot(self.reconciler.lock().store())
    }

    pub fn status(&self, alliance: Alliance) -> AllianceSafetyStatus {
        self.reconciler.lock().store().get(alliance).clone()
    }

    /// Run `f` against the store under the update lock, for views that need
    /// more than one field consistent with each other.
    pub fn read<R>(&self, f: impl FnOnce(&StatusStore) -> R) -> R {
        f(self.reconciler.lock().store())
    }

    /// Forget all safety-unit state (both alliances back to disconnected).
    pub fn reset(&self) -> bool {
        self.reconciler.lock().reset(Utc::now(), &self.notifier)
    }

    pub fn arena(&self) -> &A {
        &self.arena
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }
}
