//! Request and response types for all arena-daemon HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded
//! by Axum and decoded by tests. No business logic lives here.

use arena_lights::LightState;
use arena_safety::{EStops, NotifierSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
}

// ---------------------------------------------------------------------------
// /v1/safety
// ---------------------------------------------------------------------------

/// Flat snapshot plus per-alliance report times, read under one lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyResponse {
    #[serde(flatten)]
    pub snapshot: NotifierSnapshot,
    pub red_last_update: DateTime<Utc>,
    pub blue_last_update: DateTime<Utc>,
}

/// Safety-unit report. Field names match what the units send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyUpdateRequest {
    pub alliance: String,
    #[serde(rename = "eStop1")]
    pub estop1: bool,
    #[serde(rename = "eStop2")]
    pub estop2: bool,
    #[serde(rename = "eStop3")]
    pub estop3: bool,
}

impl SafetyUpdateRequest {
    pub fn estops(&self) -> EStops {
        [self.estop1, self.estop2, self.estop3]
    }
}

/// Response for update / reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyChangeResponse {
    pub changed: bool,
    pub snapshot: NotifierSnapshot,
}

// ---------------------------------------------------------------------------
// /v1/arena/stations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EstopOverrideRequest {
    pub estop: bool,
}

// ---------------------------------------------------------------------------
// /v1/lights
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightsResponse {
    /// State the caller asked for, if this was a set request.
    pub requested: Option<LightState>,
    /// Cached state after the request.
    pub state: LightState,
}
