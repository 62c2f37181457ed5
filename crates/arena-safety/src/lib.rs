//! arena-safety
//!
//! Safety-unit state aggregation and e-stop propagation.
//!
//! Architectural decisions:
//! - Exactly two alliance records exist for the process lifetime (Red, Blue)
//! - Every update replaces the full e-stop vector; connectivity always refreshes
//! - Transitions into e-stop always reach the arena; clears only when the
//!   arena still reports the station stopped
//! - At most one change notification per update, after all station writes
//!
//! `StatusStore`, `Reconciler` and `build_snapshot` are pure and single-threaded.
//! `SafetyMonitor` is the serialized entry point shared across transport tasks.

mod error;
mod monitor;
pub mod policy;
mod reconcile;
mod snapshot;
mod store;
mod types;

pub use error::SafetyError;
pub use monitor::SafetyMonitor;
pub use policy::should_propagate_estop;
pub use reconcile::{ApplyOutcome, ChangeNotifier, Reconciler, StationEstops};
pub use snapshot::{build_snapshot, NotifierSnapshot};
pub use store::StatusStore;
pub use types::*;
