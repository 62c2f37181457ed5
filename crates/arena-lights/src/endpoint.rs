//! Color endpoint boundary.
//!
//! `HttpColorEndpoint` is the only implementation that performs I/O. Every
//! request carries an explicit timeout so a dead light controller cannot
//! stall the caller.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::{LightState, STATUS_SUCCESS};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Body returned by the light controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightApiStatus {
    pub status: String,
    pub color: String,
}

#[async_trait::async_trait]
pub trait ColorEndpoint: Send + Sync {
    /// Ask the controller to show `state`. Transport and decode failures are
    /// errors; a decoded non-success body is not.
    async fn set_color(&self, state: LightState) -> Result<LightApiStatus>;
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// `GET <base_url>?color=<color>` against the light controller.
#[derive(Debug, Clone)]
pub struct HttpColorEndpoint {
    http: reqwest::Client,
    base_url: String,
}

impl HttpColorEndpoint {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("field lights http client build failed")?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait::async_trait]
impl ColorEndpoint for HttpColorEndpoint {
    async fn set_color(&self, state: LightState) -> Result<LightApiStatus> {
        let resp = self
            .http
            .get(&self.base_url)
            .query(&[("color", state.as_str())])
            .send()
            .await
            .context("field lights request failed")?;

        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("field lights http error status={}", status.as_u16()));
        }

        resp.json::<LightApiStatus>()
            .await
            .context("field lights response json decode failed")
    }
}

// ---------------------------------------------------------------------------
// Null
// ---------------------------------------------------------------------------

/// Accepts every color without I/O. Wired when lights are disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullColorEndpoint;

#[async_trait::async_trait]
impl ColorEndpoint for NullColorEndpoint {
    async fn set_color(&self, state: LightState) -> Result<LightApiStatus> {
        Ok(LightApiStatus {
            status: STATUS_SUCCESS.to_string(),
            color: state.as_str().to_string(),
        })
    }
}

#[async_trait::async_trait]
impl<T: ColorEndpoint + ?Sized> ColorEndpoint for Box<T> {
    async fn set_color(&self, state: LightState) -> Result<LightApiStatus> {
        (**self).set_color(state).await
    }
}
