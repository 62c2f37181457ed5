//! Update reconciliation.
//!
//! # Contract of [`Reconciler::apply_update`]
//!
//! 1. `changed` = the alliance was disconnected, or any station flag differs.
//! 2. The record is overwritten unconditionally: `connected = true`, full
//!    e-stop vector replace, `last_update = now`.
//! 3. Each station is offered to the arena through
//!    [`StationEstops::propagate_estop`], which applies
//!    [`should_propagate_estop`] atomically with the write.
//! 4. If `changed`, the notifier fires exactly once, after step 3, so any
//!    observer reading a snapshot sees the post-update state.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::policy::should_propagate_estop;
use crate::{AllianceSafetyStatus, EStops, SafetyError, SafetyUpdate, StationCode, StatusStore};

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// The arena's per-station e-stop state.
///
/// Methods take `&self`; implementations synchronize internally.
pub trait StationEstops {
    /// Current e-stop flag the arena holds for `code`.
    fn station_estop(&self, code: StationCode) -> bool;

    /// Arena e-stop handler for one station.
    fn set_station_estop(&self, code: StationCode, value: bool);

    /// Offer a safety-unit report for `code`. Writes it iff
    /// [`should_propagate_estop`] allows it against the current flag, and
    /// returns whether it was written.
    ///
    /// The default reads and writes separately. An arena that other paths
    /// also write to must override this so the read and the write happen
    /// under one lock; otherwise a stop landing in between can be cleared.
    fn propagate_estop(&self, code: StationCode, reported: bool) -> bool {
        let allowed = should_propagate_estop(self.station_estop(code), reported);
        if allowed {
            self.set_station_estop(code, reported);
        }
        allowed
    }
}

/// Zero-argument "safety state changed" signal. Must not block.
pub trait ChangeNotifier {
    fn notify(&self);
}

impl<T: StationEstops + ?Sized> StationEstops for &T {
    fn station_estop(&self, code: StationCode) -> bool {
        (**self).station_estop(code)
    }

    fn set_station_estop(&self, code: StationCode, value: bool) {
        (**self).set_station_estop(code, value)
    }

    fn propagate_estop(&self, code: StationCode, reported: bool) -> bool {
        (**self).propagate_estop(code, reported)
    }
}

impl<T: ChangeNotifier + ?Sized> ChangeNotifier for &T {
    fn notify(&self) {
        (**self).notify()
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// What one applied update did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// A visible field changed and the notifier fired.
    pub changed: bool,
    /// Arena calls made, in station order.
    pub propagated: Vec<(StationCode, bool)>,
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Applies safety-unit updates to a [`StatusStore`].
#[derive(Clone, Debug, Default)]
pub struct Reconciler {
    store: StatusStore,
}

impl Reconciler {
    pub fn new(store: StatusStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &StatusStore {
        &self.store
    }

    pub fn apply_update<A, N>(
        &mut self,
        update: SafetyUpdate,
        arena: &A,
        notifier: &N,
    ) -> ApplyOutcome
    where
        A: StationEstops + ?Sized,
        N: ChangeNotifier + ?Sized,
    {
        self.apply_update_at(update, Utc::now(), arena, notifier)
    }

    pub fn apply_update_at<A, N>(
        &mut self,
        update: SafetyUpdate,
        now: DateTime<Utc>,
        arena: &A,
        notifier: &N,
    ) -> ApplyOutcome
    where
        A: StationEstops + ?Sized,
        N: ChangeNotifier + ?Sized,
    {
        let status = self.store.get_mut(update.alliance);
        let changed = visible_change(status, &update.estops);

        status.connected = true;
        status.estops = update.estops;
        status.last_update = now;

        let mut propagated = Vec::new();
        for (code, reported) in update.alliance.stations().into_iter().zip(update.estops) {
            if arena.propagate_estop(code, reported) {
                propagated.push((code, reported));
            } else {
                debug!(station = %code, "clear withheld; arena still holds e-stop");
            }
        }

        if changed {
            info!(
                alliance = %update.alliance,
                estops = ?update.estops,
                "safety unit state changed"
            );
            notifier.notify();
        }

        ApplyOutcome {
            changed,
            propagated,
        }
    }

    /// Raw-key ingress. Unknown alliances leave all state untouched and
    /// return [`SafetyError::UnknownAlliance`]; nothing is notified.
    pub fn apply_raw_at<A, N>(
        &mut self,
        alliance: &str,
        estops: EStops,
        now: DateTime<Utc>,
        arena: &A,
        notifier: &N,
    ) -> Result<ApplyOutcome, SafetyError>
    where
        A: StationEstops + ?Sized,
        N: ChangeNotifier + ?Sized,
    {
        let update = SafetyUpdate::from_raw(alliance, estops)?;
        Ok(self.apply_update_at(update, now, arena, notifier))
    }

    /// Reset both alliances to disconnected / clear. The arena is not
    /// touched. Notifies if anything visible changed.
    pub fn reset<N>(&mut self, now: DateTime<Utc>, notifier: &N) -> bool
    where
        N: ChangeNotifier + ?Sized,
    {
        let changed = self.store.reset(now);
        if changed {
            info!("safety unit state reset");
            notifier.notify();
        }
        changed
    }
}

fn visible_change(prev: &AllianceSafetyStatus, next: &EStops) -> bool {
    !prev.connected || prev.estops != *next
}
