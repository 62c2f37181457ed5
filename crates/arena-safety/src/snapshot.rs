use serde::{Deserialize, Serialize};

use crate::{Alliance, StatusStore};

/// Flat, transport-ready view of both alliances. Produced on demand, never
/// stored.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifierSnapshot {
    pub red_connected: bool,
    pub red_estop1: bool,
    pub red_estop2: bool,
    pub red_estop3: bool,
    pub blue_connected: bool,
    pub blue_estop1: bool,
    pub blue_estop2: bool,
    pub blue_estop3: bool,
}

/// Project the store into a [`NotifierSnapshot`].
pub fn build_snapshot(store: &StatusStore) -> NotifierSnapshot {
    let red = store.get(Alliance::Red);
    let blue = store.get(Alliance::Blue);
    let [red_estop1, red_estop2, red_estop3] = red.estops;
    let [blue_estop1, blue_estop2, blue_estop3] = blue.estops;

    NotifierSnapshot {
        red_connected: red.connected,
        red_estop1,
        red_estop2,
        red_estop3,
        blue_connected: blue.connected,
        blue_estop1,
        blue_estop2,
        blue_estop3,
    }
}
