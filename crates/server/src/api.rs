//! Wire-level request records and response builders for the display API.
//!
//! Responses carry an `ok` flag distinct from transport success: a core
//! validation failure is HTTP 200 with `ok:false` plus an error kind,
//! never a transport error.

use serde::Deserialize;
use serde_json::{json, Value};

use pids_core::{
    BroadcastReport, Command, CoreError, DisplayInfo, Mutation, Phase, RtUpdate, Snapshot,
    Timetable,
};

/// Body of `POST /api/display/sync`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    /// Full timetable replacement pushed by the driving application.
    pub app_data: Timetable,
    /// Optional run-state to apply after the replace; `{}` means absent.
    #[serde(default)]
    pub rt_state: Option<RtUpdate>,
}

/// Body of `POST /api/display/control`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlRequest {
    /// Command tag: next, prev, arrive, depart, or key.
    pub command: String,
    /// Raw key code, required iff `command` is `key`.
    #[serde(default)]
    pub key_code: Option<String>,
}

/// Body of `POST /api/display/open`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenRequest {
    /// Display id; generated when absent.
    pub display_id: Option<String>,
    /// Window width; configured default when absent.
    pub width: Option<u32>,
    /// Window height; configured default when absent.
    pub height: Option<u32>,
    /// Horizontal window position.
    pub x: Option<i32>,
    /// Vertical window position.
    pub y: Option<i32>,
}

/// Body of `POST /api/display/close`. An absent id closes every display.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseRequest {
    /// Display id to close; all displays when absent.
    pub display_id: Option<String>,
}

/// Body of `POST /api/display/edit`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRequest {
    /// Display id to reconfigure.
    pub display_id: String,
    /// Opaque configuration payload, merged into the stored one.
    pub display_data: Value,
}

/// `ok:false` envelope for a core-level failure.
pub fn error_body(err: &CoreError) -> Value {
    json!({
        "ok": false,
        "error": err.to_string(),
        "kind": err.kind(),
    })
}

/// `GET /api/display/info` body.
pub fn info_response() -> Value {
    json!({
        "name": "Metro-PIDS Display API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "GET /api/display/info",
            "GET /api/display/status",
            "GET /api/display/stations",
            "POST /api/display/sync",
            "POST /api/display/control",
            "POST /api/display/open",
            "POST /api/display/close",
            "POST /api/display/edit",
        ],
    })
}

/// `GET /api/display/status` body.
pub fn status_response(displays: &[DisplayInfo]) -> Value {
    json!({
        "count": displays.len(),
        "displays": displays,
    })
}

/// `GET /api/display/stations` body.
pub fn stations_response(snapshot: &Snapshot) -> Value {
    let timetable = &snapshot.timetable;
    if timetable.is_empty() {
        return json!({
            "ok": false,
            "message": "no line loaded",
        });
    }

    json!({
        "ok": true,
        "lineName": timetable.line_name,
        "direction": String::from(timetable.direction.clone()),
        "trainNumber": timetable.train_number,
        "stations": timetable.stations,
        "currentIdx": snapshot.run.idx,
        "currentState": snapshot.run.state,
    })
}

/// `POST /api/display/sync` success body.
pub fn sync_response(outcome: &Mutation) -> Value {
    let timetable = &outcome.snapshot.timetable;
    let message = if timetable.is_empty() {
        "line cleared".to_string()
    } else {
        format!(
            "line '{}' synced with {} stations",
            timetable.line_name,
            timetable.len()
        )
    };

    let mut body = json!({ "ok": true, "message": message });
    attach_failures(&mut body, &outcome.broadcast);
    body
}

/// `POST /api/display/control` success body.
pub fn control_response(command: &Command, outcome: &Mutation) -> Value {
    let message = match command {
        Command::Next if !outcome.changed => {
            format!("already at the last station ({})", position(&outcome.snapshot))
        }
        Command::Prev if !outcome.changed => {
            format!("already at the first station ({})", position(&outcome.snapshot))
        }
        Command::Key(code) => format!(
            "key '{}' forwarded to {} display(s)",
            code, outcome.broadcast.attempted
        ),
        _ => format!("{}: {}", command.tag(), position(&outcome.snapshot)),
    };

    let mut body = json!({ "ok": true, "message": message });
    attach_failures(&mut body, &outcome.broadcast);
    body
}

/// `POST /api/display/open` success body.
pub fn open_response(id: &str) -> Value {
    json!({ "ok": true, "id": id })
}

/// `POST /api/display/close` success body.
pub fn close_response(closed: &[String]) -> Value {
    json!({ "ok": true, "closed": closed })
}

/// `POST /api/display/edit` success body.
pub fn edit_response() -> Value {
    json!({ "ok": true })
}

fn position(snapshot: &Snapshot) -> String {
    let len = snapshot.timetable.len();
    if len == 0 {
        return "no line loaded".to_string();
    }
    let station = &snapshot.timetable.stations[snapshot.run.idx];
    let phase = match snapshot.run.state {
        Phase::Arrived => "arrived",
        Phase::Departed => "departed",
    };
    format!("{} {}/{}, {}", station.name, snapshot.run.idx + 1, len, phase)
}

fn attach_failures(body: &mut Value, report: &BroadcastReport) {
    if !report.all_delivered() {
        body["failedDisplays"] = json!(report.failed);
    }
}
