//! Shared runtime state for arena-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The safety monitor is
//! synchronous and lock-protected; nothing here holds a lock across `.await`.

use std::time::Duration;

use anyhow::Result;
use arena_config::ControllerConfig;
use arena_lights::{ColorEndpoint, FieldLights, HttpColorEndpoint, NullColorEndpoint};
use arena_safety::{ChangeNotifier, SafetyMonitor, StationCode};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::info;

use crate::arena::{ArenaStations, EstopSource};

// ---------------------------------------------------------------------------
// BusMsg: internal event bus payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE /
/// websocket events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat {
        ts_millis: i64,
    },
    /// Safety-unit state changed; subscribers read a fresh snapshot.
    SafetyChanged,
    StationEstop {
        station: StationCode,
        estop: bool,
        source: EstopSource,
    },
}

/// Turns the safety monitor's change signal into a bus message.
#[derive(Clone)]
pub struct BusNotifier {
    bus: broadcast::Sender<BusMsg>,
}

impl ChangeNotifier for BusNotifier {
    fn notify(&self) {
        // No receivers is normal when nobody is watching.
        let _ = self.bus.send(BusMsg::SafetyChanged);
    }
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in health responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

pub type Safety = SafetyMonitor<ArenaStations, BusNotifier>;
pub type Lights = FieldLights<Box<dyn ColorEndpoint>>;

pub struct AppState {
    /// Broadcast bus for SSE and watch websockets.
    pub bus: broadcast::Sender<BusMsg>,
    pub build: BuildInfo,
    /// Safety-unit state; owns the arena station model.
    pub safety: Safety,
    pub lights: Lights,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    /// Lights disabled; no outbound I/O. Used by tests.
    pub fn new() -> Self {
        Self::with_lights(Box::new(NullColorEndpoint))
    }

    pub fn from_config(cfg: &ControllerConfig) -> Result<Self> {
        let endpoint: Box<dyn ColorEndpoint> = if cfg.lights.enabled {
            info!(
                base_url = %cfg.lights.base_url,
                timeout_ms = cfg.lights.timeout_ms,
                "field lights enabled"
            );
            Box::new(HttpColorEndpoint::new(
                cfg.lights.base_url.clone(),
                cfg.lights.timeout(),
            )?)
        } else {
            info!("field lights disabled");
            Box::new(NullColorEndpoint)
        };
        Ok(Self::with_lights(endpoint))
    }

    pub fn with_lights(endpoint: Box<dyn ColorEndpoint>) -> Self {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);
        let arena = ArenaStations::new(bus.clone());
        let notifier = BusNotifier { bus: bus.clone() };

        Self {
            bus,
            build: BuildInfo {
                service: "arena-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            safety: SafetyMonitor::new(arena, notifier),
            lights: FieldLights::new(endpoint),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusMsg> {
        self.bus.subscribe()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Spawn a background task that emits a heartbeat every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = chrono::Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}

