//! arena-lights
//!
//! Field-lights control: a cached light state in front of an external color
//! endpoint.
//!
//! - Requests for the state already cached are no-ops (no I/O).
//! - The cache only moves when the endpoint reports `status == "success"`.
//! - Failures are logged and swallowed; nothing is retried.

pub mod endpoint;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

pub use endpoint::{ColorEndpoint, HttpColorEndpoint, LightApiStatus, NullColorEndpoint};

/// Status string the endpoint returns on success.
pub const STATUS_SUCCESS: &str = "success";

// ---------------------------------------------------------------------------
// LightState
// ---------------------------------------------------------------------------

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightState {
    #[default]
    Off,
    Green,
    Red,
    Purple,
}

impl LightState {
    pub const ALL: [LightState; 4] = [
        LightState::Off,
        LightState::Green,
        LightState::Red,
        LightState::Purple,
    ];

    /// Color string understood by the endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            LightState::Off => "off",
            LightState::Green => "green",
            LightState::Red => "red",
            LightState::Purple => "purple",
        }
    }
}

impl fmt::Display for LightState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown light color: {0:?}")]
pub struct UnknownColor(pub String);

impl FromStr for LightState {
    type Err = UnknownColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LightState::ALL
            .into_iter()
            .find(|l| l.as_str() == s)
            .ok_or_else(|| UnknownColor(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// FieldLights
// ---------------------------------------------------------------------------

/// Cached field-light state. Concurrent requests are serialized.
pub struct FieldLights<E> {
    state: Mutex<LightState>,
    endpoint: E,
}

impl<E: ColorEndpoint> FieldLights<E> {
    /// Lights start `Off`; nothing is sent at construction.
    pub fn new(endpoint: E) -> Self {
        Self {
            state: Mutex::new(LightState::Off),
            endpoint,
        }
    }

    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    pub async fn current_state(&self) -> LightState {
        *self.state.lock().await
    }

    pub async fn current_state_str(&self) -> &'static str {
        self.current_state().await.as_str()
    }

    pub async fn set_off(&self) -> LightState {
        self.set(LightState::Off).await
    }

    pub async fn set_green(&self) -> LightState {
        self.set(LightState::Green).await
    }

    pub async fn set_red(&self) -> LightState {
        self.set(LightState::Red).await
    }

    pub async fn set_purple(&self) -> LightState {
        self.set(LightState::Purple).await
    }

    /// Request `wanted`; returns the cached state afterwards.
    pub async fn set(&self, wanted: LightState) -> LightState {
        let mut current = self.state.lock().await;
        if *current == wanted {
            return *current;
        }

        match self.endpoint.set_color(wanted).await {
            Ok(resp) if resp.status == STATUS_SUCCESS => {
                info!(from = %*current, to = %wanted, "field lights set");
                *current = wanted;
            }
            Ok(resp) => {
                warn!(
                    color = %wanted,
                    status = %resp.status,
                    "failed to set field lights"
                );
            }
            Err(err) => {
                warn!(color = %wanted, error = %format!("{err:#}"), "field lights request failed");
            }
        }
        *current
    }
}
