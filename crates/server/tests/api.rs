//! End-to-end tests driving the HTTP surface the way the driving
//! applications do: a real listener, real JSON bodies.

use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use pids_core::{AppConfig, PidsState};
use pids_server::routes;

async fn spawn_server() -> Result<String> {
    let state = Arc::new(PidsState::new(&AppConfig::default()));
    let router = routes::create_router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    Ok(format!("http://{addr}/api/display"))
}

async fn get(base: &str, path: &str) -> Result<Value> {
    let response = reqwest::get(format!("{base}{path}")).await?;
    assert!(response.status().is_success());
    Ok(response.json().await?)
}

async fn post(base: &str, path: &str, body: Value) -> Result<Value> {
    let response = reqwest::Client::new()
        .post(format!("{base}{path}"))
        .json(&body)
        .send()
        .await?;
    assert!(response.status().is_success());
    Ok(response.json().await?)
}

fn line_with_three_stations() -> Value {
    json!({
        "stations": [
            {"name": "West Terminal", "en": "West Terminal", "dock": "left"},
            {"name": "Central", "dock": "both"},
            {"name": "East Terminal", "en": "East Terminal", "dock": "right"}
        ],
        "lineName": "Line 1",
        "direction": "up",
        "trainNumber": "T101",
        "meta": {"operator": "metro"}
    })
}

#[tokio::test]
async fn info_names_the_api_and_its_endpoints() -> Result<()> {
    let base = spawn_server().await?;
    let info = get(&base, "/info").await?;

    assert_eq!(info["name"], "Metro-PIDS Display API");
    assert!(info["version"].as_str().is_some());
    assert_eq!(info["endpoints"].as_array().unwrap().len(), 8);
    Ok(())
}

#[tokio::test]
async fn opened_display_shows_up_in_status() -> Result<()> {
    let base = spawn_server().await?;

    let opened = post(
        &base,
        "/open",
        json!({"displayId": "d1", "width": 800, "height": 600}),
    )
    .await?;
    assert_eq!(opened["ok"], true);
    assert_eq!(opened["id"], "d1");

    let status = get(&base, "/status").await?;
    assert_eq!(status["count"], 1);
    assert_eq!(status["displays"][0]["id"], "d1");
    assert_eq!(status["displays"][0]["width"], 800);
    assert_eq!(status["displays"][0]["height"], 600);
    Ok(())
}

#[tokio::test]
async fn sync_then_advance_moves_the_cursor() -> Result<()> {
    let base = spawn_server().await?;

    let synced = post(
        &base,
        "/sync",
        json!({"appData": line_with_three_stations(), "rtState": {"idx": 0, "state": 0}}),
    )
    .await?;
    assert_eq!(synced["ok"], true);

    let advanced = post(&base, "/control", json!({"command": "next"})).await?;
    assert_eq!(advanced["ok"], true);

    let stations = get(&base, "/stations").await?;
    assert_eq!(stations["ok"], true);
    assert_eq!(stations["lineName"], "Line 1");
    assert_eq!(stations["direction"], "up");
    assert_eq!(stations["trainNumber"], "T101");
    assert_eq!(stations["stations"].as_array().unwrap().len(), 3);
    assert_eq!(stations["currentIdx"], 1);
    assert_eq!(stations["currentState"], 0);
    Ok(())
}

#[tokio::test]
async fn key_command_without_key_code_is_rejected() -> Result<()> {
    let base = spawn_server().await?;

    let body = post(&base, "/control", json!({"command": "key"})).await?;
    assert_eq!(body["ok"], false);
    assert_eq!(body["kind"], "missing_key_code");
    Ok(())
}

#[tokio::test]
async fn unknown_command_is_rejected() -> Result<()> {
    let base = spawn_server().await?;

    let body = post(&base, "/control", json!({"command": "teleport"})).await?;
    assert_eq!(body["ok"], false);
    assert_eq!(body["kind"], "unknown_command");
    Ok(())
}

#[tokio::test]
async fn close_without_id_empties_the_registry() -> Result<()> {
    let base = spawn_server().await?;

    post(&base, "/open", json!({"displayId": "d1"})).await?;
    post(&base, "/open", json!({"displayId": "d2"})).await?;

    let closed = post(&base, "/close", json!({})).await?;
    assert_eq!(closed["ok"], true);
    assert_eq!(closed["closed"].as_array().unwrap().len(), 2);

    let status = get(&base, "/status").await?;
    assert_eq!(status["count"], 0);
    Ok(())
}

#[tokio::test]
async fn stations_without_a_line_reports_not_ok() -> Result<()> {
    let base = spawn_server().await?;

    let stations = get(&base, "/stations").await?;
    assert_eq!(stations["ok"], false);
    Ok(())
}

#[tokio::test]
async fn sync_with_a_blank_station_name_is_a_core_level_failure() -> Result<()> {
    let base = spawn_server().await?;

    let body = post(
        &base,
        "/sync",
        json!({"appData": {"stations": [{"name": "  "}], "lineName": "Bad"}}),
    )
    .await?;
    assert_eq!(body["ok"], false);
    assert_eq!(body["kind"], "validation");

    // The rejected push left nothing behind.
    let stations = get(&base, "/stations").await?;
    assert_eq!(stations["ok"], false);
    Ok(())
}

#[tokio::test]
async fn duplicate_display_id_is_rejected() -> Result<()> {
    let base = spawn_server().await?;

    post(&base, "/open", json!({"displayId": "d1"})).await?;
    let body = post(&base, "/open", json!({"displayId": "d1"})).await?;
    assert_eq!(body["ok"], false);
    assert_eq!(body["kind"], "duplicate_id");
    Ok(())
}

#[tokio::test]
async fn edit_reaches_an_open_display_and_rejects_unknown_ids() -> Result<()> {
    let base = spawn_server().await?;

    post(&base, "/open", json!({"displayId": "d1"})).await?;
    let edited = post(
        &base,
        "/edit",
        json!({"displayId": "d1", "displayData": {"theme": "dark"}}),
    )
    .await?;
    assert_eq!(edited["ok"], true);

    let missing = post(
        &base,
        "/edit",
        json!({"displayId": "ghost", "displayData": {}}),
    )
    .await?;
    assert_eq!(missing["ok"], false);
    assert_eq!(missing["kind"], "not_found");
    Ok(())
}

#[tokio::test]
async fn clamp_on_shrink_keeps_the_cursor_in_bounds() -> Result<()> {
    let base = spawn_server().await?;

    post(
        &base,
        "/sync",
        json!({
            "appData": {
                "stations": [
                    {"name": "a"}, {"name": "b"}, {"name": "c"},
                    {"name": "d"}, {"name": "e"}
                ],
                "lineName": "Long"
            },
            "rtState": {"idx": 4, "state": 0}
        }),
    )
    .await?;

    post(
        &base,
        "/sync",
        json!({
            "appData": {"stations": [{"name": "a"}, {"name": "b"}], "lineName": "Short"},
            "rtState": {"idx": 4, "state": 0}
        }),
    )
    .await?;

    let stations = get(&base, "/stations").await?;
    assert_eq!(stations["currentIdx"], 1);
    Ok(())
}
