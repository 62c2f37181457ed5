use chrono::{DateTime, Utc};

use crate::{Alliance, AllianceSafetyStatus, SafetyError};

/// Owns the two per-alliance safety records.
///
/// Records are created once and mutated in place; there is no way to add or
/// remove an alliance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusStore {
    red: AllianceSafetyStatus,
    blue: AllianceSafetyStatus,
}

impl StatusStore {
    /// Both alliances disconnected with no stations stopped.
    pub fn new() -> Self {
        Self::initialize(Utc::now())
    }

    pub fn initialize(now: DateTime<Utc>) -> Self {
        Self {
            red: AllianceSafetyStatus::disconnected(now),
            blue: AllianceSafetyStatus::disconnected(now),
        }
    }

    pub fn get(&self, alliance: Alliance) -> &AllianceSafetyStatus {
        match alliance {
            Alliance::Red => &self.red,
            Alliance::Blue => &self.blue,
        }
    }

    /// Look up a record by raw wire key.
    pub fn lookup(&self, key: &str) -> Result<&AllianceSafetyStatus, SafetyError> {
        Ok(self.get(key.parse()?))
    }

    pub(crate) fn get_mut(&mut self, alliance: Alliance) -> &mut AllianceSafetyStatus {
        match alliance {
            Alliance::Red => &mut self.red,
            Alliance::Blue => &mut self.blue,
        }
    }

    /// Return both records to the boot state. Returns `true` if any visible
    /// field (connectivity or e-stop) changed.
    pub fn reset(&mut self, now: DateTime<Utc>) -> bool {
        let mut changed = false;
        for alliance in Alliance::ALL {
            let status = self.get_mut(alliance);
            let fresh = AllianceSafetyStatus::disconnected(now);
            changed |= status.connected || status.estops != fresh.estops;
            *status = fresh;
        }
        changed
    }
}

impl Default for StatusStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_store_is_disconnected() {
        let store = StatusStore::new();
        for alliance in Alliance::ALL {
            let st = store.get(alliance);
            assert!(!st.connected);
            assert_eq!(st.estops, [false, false, false]);
        }
    }

    #[test]
    fn lookup_rejects_unknown_key() {
        let store = StatusStore::new();
        assert!(store.lookup("red").is_ok());
        assert_eq!(
            store.lookup("green"),
            Err(SafetyError::UnknownAlliance("green".to_string()))
        );
    }

    #[test]
    fn reset_reports_visible_change_only() {
        let now = Utc::now();
        let mut store = StatusStore::initialize(now);
        assert!(!store.reset(now), "boot state reset is not a change");

        store.get_mut(Alliance::Blue).estops[2] = true;
        assert!(store.reset(now));
        assert_eq!(store.get(Alliance::Blue).estops, [false; 3]);
    }
}
