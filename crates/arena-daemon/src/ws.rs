//! Websocket endpoints.
//!
//! - `GET /ws/safety/units`: safety units push `sccupdate` messages. Each
//!   malformed message is answered with an `error` message; the connection
//!   stays open. Unknown alliance keys are dropped silently.
//! - `GET /ws/safety/watch`: observers receive a `safety` snapshot on
//!   connect and after every change signal.
//!
//! Every message in either direction is a JSON `{ "type": ..., "data": ... }`
//! envelope.

use std::sync::Arc;

use arena_safety::{EStops, NotifierSnapshot};
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::state::{AppState, BusMsg};

/// Message type safety units send.
pub const UNIT_UPDATE_TYPE: &str = "sccupdate";

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct InboundEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

/// Server-to-client messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum OutboundMsg {
    Safety(NotifierSnapshot),
    Error(String),
}

impl OutboundMsg {
    fn into_message(self) -> Option<Message> {
        match serde_json::to_string(&self) {
            Ok(json) => Some(Message::Text(json)),
            Err(e) => {
                warn!("failed to serialize websocket message: {e}");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Ingress parsing
// ---------------------------------------------------------------------------

/// Rejections for safety-unit messages. Display text is sent to the unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngressError {
    #[error("Invalid message: {0}")]
    Malformed(String),

    #[error("Invalid message type '{0}'.")]
    InvalidType(String),

    #[error("Missing alliance string")]
    MissingAlliance,

    #[error("Missing eStop{0} boolean")]
    MissingEstop(u8),
}

/// A structurally valid unit report. The alliance key is still raw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitReport {
    pub alliance: String,
    pub estops: EStops,
}

/// Decode one text frame from a safety unit.
pub fn parse_unit_message(text: &str) -> Result<UnitReport, IngressError> {
    let envelope: InboundEnvelope =
        serde_json::from_str(text).map_err(|e| IngressError::Malformed(e.to_string()))?;

    if envelope.kind != UNIT_UPDATE_TYPE {
        return Err(IngressError::InvalidType(envelope.kind));
    }

    let data = &envelope.data;
    let alliance = data
        .get("alliance")
        .and_then(Value::as_str)
        .ok_or(IngressError::MissingAlliance)?;

    let mut estops = [false; 3];
    for (i, slot) in estops.iter_mut().enumerate() {
        let n = i as u8 + 1;
        *slot = data
            .get(format!("eStop{n}"))
            .and_then(Value::as_bool)
            .ok_or(IngressError::MissingEstop(n))?;
    }

    Ok(UnitReport {
        alliance: alliance.to_string(),
        estops,
    })
}

// ---------------------------------------------------------------------------
// GET /ws/safety/units
// ---------------------------------------------------------------------------

pub async fn ws_units(ws: WebSocketUpgrade, State(st): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_units(socket, st))
}

async fn handle_units(mut socket: WebSocket, st: Arc<AppState>) {
    debug!("safety unit connected");

    while let Some(msg) = socket.recv().await {
        let reply = match msg {
            Ok(Message::Text(text)) => match parse_unit_message(&text) {
                Ok(report) => {
                    st.safety.ingest(&report.alliance, report.estops);
                    None
                }
                Err(e) => {
                    warn!(error = %e, "rejected safety unit message");
                    Some(OutboundMsg::Error(e.to_string()))
                }
            },
            Ok(Message::Ping(data)) => {
                if socket.send(Message::Pong(data)).await.is_err() {
                    break;
                }
                None
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => None,
            Err(e) => {
                debug!("safety unit websocket error: {e}");
                break;
            }
        };

        if let Some(m) = reply.and_then(OutboundMsg::into_message) {
            if socket.send(m).await.is_err() {
                break;
            }
        }
    }

    debug!("safety unit disconnected");
}

// ---------------------------------------------------------------------------
// GET /ws/safety/watch
// ---------------------------------------------------------------------------

pub async fn ws_watch(ws: WebSocketUpgrade, State(st): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_watch(socket, st))
}

async fn handle_watch(mut socket: WebSocket, st: Arc<AppState>) {
    debug!("safety watcher connected");

    // Subscribe before the initial snapshot so no change slips between them.
    let mut rx = st.subscribe();

    if !send_snapshot(&mut socket, &st).await {
        return;
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(BusMsg::SafetyChanged) => {
                        if !send_snapshot(&mut socket, &st).await {
                            return;
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(n)) => {
                        // Skipped signals collapse into one fresh snapshot.
                        debug!(skipped = n, "safety watcher lagged");
                        if !send_snapshot(&mut socket, &st).await {
                            return;
                        }
                    }
                    Err(RecvError::Closed) => return,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("safety watcher disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("safety watcher websocket error: {e}");
                        return;
                    }
                    _ => {}
                }
            }
        }
    }
}

async fn send_snapshot(socket: &mut WebSocket, st: &AppState) -> bool {
    let Some(msg) = OutboundMsg::Safety(st.safety.snapshot()).into_message() else {
        return true;
    };
    socket.send(msg).await.is_ok()
}
