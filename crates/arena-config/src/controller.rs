use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Typed daemon configuration. Absent keys take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub daemon: DaemonConfig,
    pub lights: LightsConfig,
}

impl ControllerConfig {
    /// Reject values that decode but cannot work at runtime.
    pub fn validate(&self) -> Result<()> {
        if self.lights.timeout_ms == 0 {
            bail!("lights.timeout_ms must be greater than 0");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub addr: SocketAddr,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightsConfig {
    /// When false the daemon never contacts the light controller.
    pub enabled: bool,
    /// Color endpoint; the color goes in the `color` query parameter.
    pub base_url: String,
    /// Per-request bound, in milliseconds.
    pub timeout_ms: u64,
}

impl LightsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for LightsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "http://10.0.100.100:3000/color".to_string(),
            timeout_ms: 2_000,
        }
    }
}
