//! E-stop propagation policy.
//!
//! Decides whether a safety-unit report for one station is handed to the
//! arena station model:
//!
//! | arena flag | reported | forwarded |
//! |------------|----------|-----------|
//! | false      | false    | yes (no-op refresh at the arena) |
//! | false      | true     | yes (stop)                       |
//! | true       | true     | yes (idempotent at the arena)    |
//! | true       | false    | **no**                           |
//!
//! Stops always reach the arena. A unit cannot clear a stop the arena still
//! holds; that stop may have been set through another path (manual override)
//! and must be cleared there.

/// `true` if a reported e-stop value must be handed to the arena.
pub fn should_propagate_estop(arena_stopped: bool, reported: bool) -> bool {
    !arena_stopped || reported
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_always_propagates() {
        assert!(should_propagate_estop(false, true));
        assert!(should_propagate_estop(true, true));
    }

    #[test]
    fn clear_blocked_while_arena_stopped() {
        assert!(!should_propagate_estop(true, false));
    }

    #[test]
    fn clear_refresh_propagates_when_arena_clear() {
        assert!(should_propagate_estop(false, false));
    }
}
