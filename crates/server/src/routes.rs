//! HTTP routes for the display control API.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tracing::debug;

use pids_core::{Command, DisplayFeed, OpenOptions, PidsState};

use crate::api::{self, CloseRequest, ControlRequest, EditRequest, OpenRequest, SyncRequest};

/// Assemble the API router around a shared state instance.
pub fn create_router(state: Arc<PidsState>) -> Router {
    Router::new()
        .route("/api/display/info", get(info))
        .route("/api/display/status", get(status))
        .route("/api/display/stations", get(stations))
        .route("/api/display/sync", post(sync))
        .route("/api/display/control", post(control))
        .route("/api/display/open", post(open))
        .route("/api/display/close", post(close))
        .route("/api/display/edit", post(edit))
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}

async fn info() -> Json<Value> {
    Json(api::info_response())
}

async fn status(State(state): State<Arc<PidsState>>) -> Json<Value> {
    Json(api::status_response(&state.display_status()))
}

async fn stations(State(state): State<Arc<PidsState>>) -> Json<Value> {
    Json(api::stations_response(&state.snapshot()))
}

async fn sync(
    State(state): State<Arc<PidsState>>,
    Json(request): Json<SyncRequest>,
) -> Json<Value> {
    match state.sync(request.app_data, request.rt_state) {
        Ok(outcome) => Json(api::sync_response(&outcome)),
        Err(err) => Json(api::error_body(&err)),
    }
}

async fn control(
    State(state): State<Arc<PidsState>>,
    Json(request): Json<ControlRequest>,
) -> Json<Value> {
    let command = match Command::parse(&request.command, request.key_code) {
        Ok(command) => command,
        Err(err) => return Json(api::error_body(&err)),
    };
    let outcome = state.control(&command);
    Json(api::control_response(&command, &outcome))
}

async fn open(
    State(state): State<Arc<PidsState>>,
    Json(request): Json<OpenRequest>,
) -> Json<Value> {
    let opts = OpenOptions {
        id: request.display_id,
        width: request.width,
        height: request.height,
        x: request.x,
        y: request.y,
    };
    match state.open_display(opts) {
        Ok(feed) => {
            let id = feed.id.clone();
            tokio::spawn(drain_feed(feed));
            Json(api::open_response(&id))
        }
        Err(err) => Json(api::error_body(&err)),
    }
}

async fn close(
    State(state): State<Arc<PidsState>>,
    request: Option<Json<CloseRequest>>,
) -> Json<Value> {
    let Json(request) = request.unwrap_or_default();
    match state.close_display(request.display_id.as_deref()) {
        Ok(closed) => Json(api::close_response(&closed)),
        Err(err) => Json(api::error_body(&err)),
    }
}

async fn edit(
    State(state): State<Arc<PidsState>>,
    Json(request): Json<EditRequest>,
) -> Json<Value> {
    match state.edit_display(&request.display_id, request.display_data) {
        Ok(()) => Json(api::edit_response()),
        Err(err) => Json(api::error_body(&err)),
    }
}

/// Stand-in renderer: log feed updates until the display closes.
async fn drain_feed(mut feed: DisplayFeed) {
    while let Some(update) = feed.updates.recv().await {
        debug!(id = %feed.id, ?update, "display update");
    }
    debug!(id = %feed.id, "display feed closed");
}
