//! Axum router and all HTTP handlers for arena-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Websocket handlers live in `ws.rs`.

use std::{convert::Infallible, sync::Arc};

use arena_lights::LightState;
use arena_safety::{Alliance, StationCode};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{debug, info};

use crate::{
    api_types::{
        EstopOverrideRequest, HealthResponse, LightsResponse, SafetyChangeResponse,
        SafetyResponse, SafetyUpdateRequest,
    },
    arena::StationView,
    error::ApiError,
    state::{AppState, BusMsg},
    ws,
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/safety", get(safety_status))
        .route("/v1/safety/update", post(safety_update))
        .route("/v1/safety/reset", post(safety_reset))
        .route("/v1/stream", get(stream))
        .route("/v1/arena/stations", get(arena_stations))
        .route("/v1/arena/stations/:code/estop", post(arena_estop_override))
        .route("/v1/lights", get(lights_status))
        .route("/v1/lights/:color", post(lights_set))
        .route("/ws/safety/units", get(ws::ws_units))
        .route("/ws/safety/watch", get(ws::ws_watch))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
        }),
    )
}

// ---------------------------------------------------------------------------
// /v1/safety
// ---------------------------------------------------------------------------

pub(crate) async fn safety_status(State(st): State<Arc<AppState>>) -> Json<SafetyResponse> {
    let resp = st.safety.read(|store| SafetyResponse {
        snapshot: arena_safety::build_snapshot(store),
        red_last_update: store.get(Alliance::Red).last_update,
        blue_last_update: store.get(Alliance::Blue).last_update,
    });
    Json(resp)
}

/// JSON ingress for units that cannot hold a websocket open.
///
/// Unlike the websocket path, an unknown alliance is answered with 400 so
/// the caller learns about it.
pub(crate) async fn safety_update(
    State(st): State<Arc<AppState>>,
    Json(req): Json<SafetyUpdateRequest>,
) -> Result<Json<SafetyChangeResponse>, ApiError> {
    let outcome = st.safety.apply_raw(&req.alliance, req.estops())?;
    Ok(Json(SafetyChangeResponse {
        changed: outcome.changed,
        snapshot: st.safety.snapshot(),
    }))
}

pub(crate) async fn safety_reset(State(st): State<Arc<AppState>>) -> Json<SafetyChangeResponse> {
    let changed = st.safety.reset();
    info!(changed, "safety/reset");
    Json(SafetyChangeResponse {
        changed,
        snapshot: st.safety.snapshot(),
    })
}

// ---------------------------------------------------------------------------
// /v1/arena/stations
// ---------------------------------------------------------------------------

pub(crate) async fn arena_stations(State(st): State<Arc<AppState>>) -> Json<Vec<StationView>> {
    Json(st.safety.arena().stations())
}

/// Manual e-stop set / clear. This is the only way to clear a stop the
/// arena holds while the safety unit reports clear.
pub(crate) async fn arena_estop_override(
    State(st): State<Arc<AppState>>,
    Path(code): Path<String>,
    Json(req): Json<EstopOverrideRequest>,
) -> Result<Json<StationView>, ApiError> {
    let code: StationCode = code.parse()?;
    info!(station = %code, estop = req.estop, "arena/estop override");
    Ok(Json(st.safety.arena().override_estop(code, req.estop)))
}

// ---------------------------------------------------------------------------
// /v1/lights
// ---------------------------------------------------------------------------

pub(crate) async fn lights_status(State(st): State<Arc<AppState>>) -> Json<LightsResponse> {
    Json(LightsResponse {
        requested: None,
        state: st.lights.current_state().await,
    })
}

pub(crate) async fn lights_set(
    State(st): State<Arc<AppState>>,
    Path(color): Path<String>,
) -> Result<Json<LightsResponse>, ApiError> {
    let requested: LightState = color.parse()?;
    let state = st.lights.set(requested).await;
    Ok(Json(LightsResponse {
        requested: Some(requested),
        state,
    }))
}

// ---------------------------------------------------------------------------
// GET /v1/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let events = bus_to_sse(st);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

/// The stream opens with a `safety` event. After that, every `SafetyChanged`
/// signal, and every lag gap, becomes a `safety` event carrying the snapshot
/// read at send time.
fn bus_to_sse(st: Arc<AppState>) -> impl Stream<Item = Result<Event, Infallible>> {
    // Subscribe before the initial snapshot so no change slips between them.
    let rx = st.subscribe();
    let initial = safety_event(&st).map(Ok::<_, Infallible>);

    let updates = BroadcastStream::new(rx).filter_map(move |msg| {
        let st = Arc::clone(&st);
        async move {
            let event = match msg {
                Ok(BusMsg::SafetyChanged) => safety_event(&st)?,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    debug!(skipped, "sse subscriber lagged");
                    safety_event(&st)?
                }
                Ok(m @ BusMsg::Heartbeat { .. }) => bus_event("heartbeat", &m)?,
                Ok(m @ BusMsg::StationEstop { .. }) => bus_event("station_estop", &m)?,
            };
            Some(Ok::<_, Infallible>(event))
        }
    });

    futures_util::stream::iter(initial).chain(updates)
}

fn safety_event(st: &AppState) -> Option<Event> {
    let data = serde_json::to_string(&st.safety.snapshot()).ok()?;
    Some(Event::default().event("safety").data(data))
}

fn bus_event(name: &str, msg: &BusMsg) -> Option<Event> {
    let data = serde_json::to_string(msg).ok()?;
    Some(Event::default().event(name).data(data))
}
