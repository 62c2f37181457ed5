//! In-memory arena station model.
//!
//! Holds the authoritative per-station e-stop flag. The safety monitor
//! writes through [`StationEstops`]; operators write through
//! [`ArenaStations::override_estop`]. Every change is published on the bus.

use std::collections::BTreeMap;

use arena_safety::{should_propagate_estop, StationCode, StationEstops};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::state::BusMsg;

/// Which path set a station's e-stop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstopSource {
    SafetyUnit,
    Manual,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationView {
    pub station: StationCode,
    pub estop: bool,
}

pub struct ArenaStations {
    estops: Mutex<BTreeMap<StationCode, bool>>,
    bus: broadcast::Sender<BusMsg>,
}

impl ArenaStations {
    /// All six stations start clear.
    pub fn new(bus: broadcast::Sender<BusMsg>) -> Self {
        Self {
            estops: Mutex::new(StationCode::all().map(|c| (c, false)).collect()),
            bus,
        }
    }

    pub fn stations(&self) -> Vec<StationView> {
        self.estops
            .lock()
            .iter()
            .map(|(station, estop)| StationView {
                station: *station,
                estop: *estop,
            })
            .collect()
    }

    /// Operator path. Bypasses the safety-unit propagation policy.
    pub fn override_estop(&self, code: StationCode, value: bool) -> StationView {
        self.handle_estop(code, value, EstopSource::Manual);
        StationView {
            station: code,
            estop: value,
        }
    }

    fn handle_estop(&self, code: StationCode, value: bool, source: EstopSource) {
        let previous = self.estops.lock().insert(code, value).unwrap_or(false);
        self.publish_transition(code, previous, value, source);
    }

    fn publish_transition(
        &self,
        code: StationCode,
        previous: bool,
        value: bool,
        source: EstopSource,
    ) {
        if previous == value {
            return;
        }

        if value {
            warn!(station = %code, ?source, "station e-stopped");
        } else {
            info!(station = %code, ?source, "station e-stop cleared");
        }
        let _ = self.bus.send(BusMsg::StationEstop {
            station: code,
            estop: value,
            source,
        });
    }
}

impl StationEstops for ArenaStations {
    fn station_estop(&self, code: StationCode) -> bool {
        self.estops.lock().get(&code).copied().unwrap_or(false)
    }

    fn set_station_estop(&self, code: StationCode, value: bool) {
        self.handle_estop(code, value, EstopSource::SafetyUnit);
    }

    /// Policy check and write under one guard, so a manual stop cannot land
    /// between them.
    fn propagate_estop(&self, code: StationCode, reported: bool) -> bool {
        let previous = {
            let mut estops = self.estops.lock();
            let current = estops.get(&code).copied().unwrap_or(false);
            if !should_propagate_estop(current, reported) {
                return false;
            }
            estops.insert(code, reported);
            current
        };
        self.publish_transition(code, previous, reported, EstopSource::SafetyUnit);
        true
    }
}
