//! In-process scenario tests for arena-daemon HTTP endpoints.
//!
//! These tests spin up the Axum router **without** binding a TCP socket.
//! Each test calls `routes::build_router` and drives it via
//! `tower::ServiceExt::oneshot`; lights use the null endpoint, so no
//! network I/O is required.

use std::sync::Arc;
use std::time::Duration;

use arena_daemon::{routes, state};
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt; // oneshot

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn call(router: axum::Router, req: Request<axum::body::Body>) -> (StatusCode, bytes::Bytes) {
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (status, body)
}

fn parse_json(b: bytes::Bytes) -> Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

async fn get(st: &Arc<state::AppState>, uri: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, body) = call(routes::build_router(Arc::clone(st)), req).await;
    (status, parse_json(body))
}

async fn post(st: &Arc<state::AppState>, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method("POST").uri(uri);
    let req = match body {
        Some(v) => builder
            .header("content-type", "application/json")
            .body(axum::body::Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(axum::body::Body::empty()).unwrap(),
    };
    let (status, body) = call(routes::build_router(Arc::clone(st)), req).await;
    (status, parse_json(body))
}

/// Incremental reader over a `text/event-stream` body.
struct SseReader {
    body: axum::body::Body,
    buf: String,
}

impl SseReader {
    async fn open(st: &Arc<state::AppState>) -> Self {
        let req = Request::builder()
            .method("GET")
            .uri("/v1/stream")
            .body(axum::body::Body::empty())
            .unwrap();
        let resp = routes::build_router(Arc::clone(st))
            .oneshot(req)
            .await
            .expect("oneshot failed");
        assert_eq!(resp.status(), StatusCode::OK);
        Self {
            body: resp.into_body(),
            buf: String::new(),
        }
    }

    /// Next `(event, data)` pair, skipping keep-alive comments.
    async fn next_event(&mut self) -> (String, String) {
        loop {
            while let Some(end) = self.buf.find("\n\n") {
                let block: String = self.buf.drain(..end + 2).collect();
                let mut name = String::new();
                let mut data = String::new();
                for line in block.lines() {
                    if let Some(v) = line.strip_prefix("event:") {
                        name = v.trim_start().to_string();
                    } else if let Some(v) = line.strip_prefix("data:") {
                        data.push_str(v.trim_start());
                    }
                }
                if !name.is_empty() || !data.is_empty() {
                    return (name, data);
                }
            }

            let frame = tokio::time::timeout(Duration::from_secs(5), self.body.frame())
                .await
                .expect("timed out waiting for sse frame")
                .expect("sse stream ended")
                .expect("sse body error");
            if let Ok(chunk) = frame.into_data() {
                self.buf
                    .push_str(std::str::from_utf8(&chunk).expect("sse body is not utf-8"));
            }
        }
    }

    /// Skip events until the next `safety` one and decode its snapshot.
    async fn next_safety(&mut self) -> Value {
        loop {
            let (name, data) = self.next_event().await;
            if name == "safety" {
                return serde_json::from_str(&data).expect("safety data is not JSON");
            }
        }
    }
}

fn unit(alliance: &str, e1: bool, e2: bool, e3: bool) -> Option<Value> {
    Some(json!({ "alliance": alliance, "eStop1": e1, "eStop2": e2, "eStop3": e3 }))
}

fn station(stations: &Value, code: &str) -> bool {
    stations
        .as_array()
        .expect("stations array")
        .iter()
        .find(|s| s["station"] == code)
        .map(|s| s["estop"] == true)
        .expect("station present")
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_returns_200_ok_true() {
    let st = Arc::new(state::AppState::new());
    let (status, json) = get(&st, "/v1/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ok"], true);
    assert_eq!(json["service"], "arena-daemon");
}

// ---------------------------------------------------------------------------
// /v1/safety
// ---------------------------------------------------------------------------

#[tokio::test]
async fn boot_snapshot_is_disconnected_and_clear() {
    let st = Arc::new(state::AppState::new());
    let (status, json) = get(&st, "/v1/safety").await;

    assert_eq!(status, StatusCode::OK);
    for key in [
        "red_connected",
        "red_estop1",
        "red_estop2",
        "red_estop3",
        "blue_connected",
        "blue_estop1",
        "blue_estop2",
        "blue_estop3",
    ] {
        assert_eq!(json[key], false, "{key} must start false");
    }
    assert!(json["red_last_update"].is_string());
}

#[tokio::test]
async fn red_station_one_stop_end_to_end() {
    let st = Arc::new(state::AppState::new());

    let (status, json) = post(&st, "/v1/safety/update", unit("red", true, false, false)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["changed"], true);
    assert_eq!(
        json["snapshot"],
        json!({
            "red_connected": true,
            "red_estop1": true,
            "red_estop2": false,
            "red_estop3": false,
            "blue_connected": false,
            "blue_estop1": false,
            "blue_estop2": false,
            "blue_estop3": false,
        })
    );

    let (_, stations) = get(&st, "/v1/arena/stations").await;
    assert!(station(&stations, "R1"));
    for code in ["R2", "R3", "B1", "B2", "B3"] {
        assert!(!station(&stations, code), "{code} must stay clear");
    }
}

#[tokio::test]
async fn repeated_update_reports_no_change() {
    let st = Arc::new(state::AppState::new());

    let (_, first) = post(&st, "/v1/safety/update", unit("blue", false, true, false)).await;
    let (_, second) = post(&st, "/v1/safety/update", unit("blue", false, true, false)).await;

    assert_eq!(first["changed"], true);
    assert_eq!(second["changed"], false);
    assert_eq!(second["snapshot"]["blue_estop2"], true);
}

#[tokio::test]
async fn unknown_alliance_is_400_and_changes_nothing() {
    let st = Arc::new(state::AppState::new());
    let (_, before) = get(&st, "/v1/safety").await;

    let (status, json) = post(&st, "/v1/safety/update", unit("green", true, true, true)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap_or("").contains("green"));
    let (_, after) = get(&st, "/v1/safety").await;
    assert_eq!(before, after);
}

#[tokio::test]
async fn missing_estop_field_is_rejected_by_transport() {
    let st = Arc::new(state::AppState::new());
    let (status, _) = {
        let req = Request::builder()
            .method("POST")
            .uri("/v1/safety/update")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(
                json!({ "alliance": "red", "eStop1": true }).to_string(),
            ))
            .unwrap();
        call(routes::build_router(Arc::clone(&st)), req).await
    };
    assert!(status.is_client_error(), "got {status}");

    let (_, snap) = get(&st, "/v1/safety").await;
    assert_eq!(snap["red_connected"], false);
}

#[tokio::test]
async fn reset_disconnects_but_keeps_arena_stops() {
    let st = Arc::new(state::AppState::new());
    post(&st, "/v1/safety/update", unit("blue", false, false, true)).await;

    let (status, json) = post(&st, "/v1/safety/reset", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["changed"], true);
    assert_eq!(json["snapshot"]["blue_connected"], false);
    assert_eq!(json["snapshot"]["blue_estop3"], false);

    let (_, stations) = get(&st, "/v1/arena/stations").await;
    assert!(station(&stations, "B3"), "reset must not clear arena stops");

    let (_, again) = post(&st, "/v1/safety/reset", None).await;
    assert_eq!(again["changed"], false);
}

// ---------------------------------------------------------------------------
// GET /v1/stream
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stream_opens_with_current_snapshot() {
    let st = Arc::new(state::AppState::new());
    st.safety.ingest("blue", [false, true, false]);

    let mut sse = SseReader::open(&st).await;
    let (name, data) = sse.next_event().await;

    assert_eq!(name, "safety", "first event must be the snapshot");
    let snap: Value = serde_json::from_str(&data).expect("safety data is not JSON");
    assert_eq!(snap["blue_connected"], true);
    assert_eq!(snap["blue_estop2"], true);
    assert_eq!(snap["red_connected"], false);
}

#[tokio::test]
async fn stream_follows_each_change() {
    let st = Arc::new(state::AppState::new());
    let mut sse = SseReader::open(&st).await;
    assert_eq!(sse.next_safety().await["red_estop1"], false);

    post(&st, "/v1/safety/update", unit("red", true, false, false)).await;

    let snap = sse.next_safety().await;
    assert_eq!(snap["red_connected"], true);
    assert_eq!(snap["red_estop1"], true);
}

#[tokio::test]
async fn lagged_stream_catches_up_with_fresh_snapshot() {
    let st = Arc::new(state::AppState::new());
    let mut sse = SseReader::open(&st).await;

    // The change signal is pushed out of the bus by the heartbeat flood.
    st.safety.ingest("red", [false, false, true]);
    for ts in 0..2_000 {
        let _ = st.bus.send(state::BusMsg::Heartbeat { ts_millis: ts });
    }

    let (name, data) = sse.next_event().await;
    assert_eq!(name, "safety");
    let initial: Value = serde_json::from_str(&data).expect("safety data is not JSON");
    assert_eq!(initial["red_connected"], false);

    let (name, data) = sse.next_event().await;
    assert_eq!(name, "safety", "a lag gap must resend the snapshot");
    let caught_up: Value = serde_json::from_str(&data).expect("safety data is not JSON");
    assert_eq!(caught_up["red_estop3"], true);
}

// ---------------------------------------------------------------------------
// /v1/arena/stations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unit_clear_is_withheld_until_manual_override() {
    let st = Arc::new(state::AppState::new());

    post(&st, "/v1/safety/update", unit("red", false, true, false)).await;
    post(&st, "/v1/safety/update", unit("red", false, false, false)).await;

    let (_, stations) = get(&st, "/v1/arena/stations").await;
    assert!(station(&stations, "R2"), "unit clear must not release the arena stop");

    let (status, view) =
        post(&st, "/v1/arena/stations/R2/estop", Some(json!({ "estop": false }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view, json!({ "station": "R2", "estop": false }));

    let (_, stations) = get(&st, "/v1/arena/stations").await;
    assert!(!station(&stations, "R2"));
}

#[tokio::test]
async fn manual_stop_survives_unit_clear() {
    let st = Arc::new(state::AppState::new());

    post(&st, "/v1/arena/stations/B1/estop", Some(json!({ "estop": true }))).await;
    post(&st, "/v1/safety/update", unit("blue", false, false, false)).await;

    let (_, stations) = get(&st, "/v1/arena/stations").await;
    assert!(station(&stations, "B1"));
}

#[tokio::test]
async fn bad_station_code_is_400() {
    let st = Arc::new(state::AppState::new());
    let (status, json) =
        post(&st, "/v1/arena/stations/R7/estop", Some(json!({ "estop": true }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], 400);
}

// ---------------------------------------------------------------------------
// /v1/lights
// ---------------------------------------------------------------------------

#[tokio::test]
async fn lights_start_off_and_follow_requests() {
    let st = Arc::new(state::AppState::new());

    let (_, json) = get(&st, "/v1/lights").await;
    assert_eq!(json["state"], "off");
    assert!(json["requested"].is_null());

    let (status, json) = post(&st, "/v1/lights/purple", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["requested"], "purple");
    assert_eq!(json["state"], "purple");

    let (_, json) = get(&st, "/v1/lights").await;
    assert_eq!(json["state"], "purple");
}

#[tokio::test]
async fn unknown_light_color_is_400() {
    let st = Arc::new(state::AppState::new());
    let (status, json) = post(&st, "/v1/lights/blue", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap_or("").contains("blue"));
}
