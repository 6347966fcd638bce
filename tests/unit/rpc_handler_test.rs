//! Unit tests for the RPC handler: the JSON-RPC methods dispatched by `handle_method`.
//!
//! These tests exercise the methods through the same code path used by the
//! real `autoscroll-rpc` binary, with the defaults record in a temporary
//! directory and a paused tokio clock.

use std::time::Duration;

use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::Mutex;

use autoscroll::app::AutoscrollHost;
use autoscroll::rpc_handler::handle_method;
use autoscroll::services::settings_store::DefaultSettingsStore;
use autoscroll::types::settings::TimingConfig;

/// Create a fresh host whose defaults live in a temp directory.
async fn setup() -> (Mutex<AutoscrollHost>, TempDir) {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let path = tmp.path().join("settings.json").to_string_lossy().to_string();
    let host = AutoscrollHost::new(DefaultSettingsStore::new(Some(path)), TimingConfig::default())
        .await
        .expect("Failed to start host");
    (Mutex::new(host), tmp)
}

async fn open(host: &Mutex<AutoscrollHost>) -> String {
    let res = handle_method(host, "page.open", &json!({"extent": 100000, "viewport": 800}))
        .await
        .unwrap();
    res["page_id"].as_str().unwrap().to_string()
}

async fn teardown(host: Mutex<AutoscrollHost>) {
    host.into_inner().shutdown().await;
}

// ─── Ping ───

#[tokio::test(start_paused = true)]
async fn test_ping() {
    let (host, _tmp) = setup().await;
    let res = handle_method(&host, "ping", &json!({})).await.unwrap();
    assert_eq!(res, json!({"pong": true}));
    teardown(host).await;
}

// ─── Unknown method ───

#[tokio::test(start_paused = true)]
async fn test_unknown_method_returns_error() {
    let (host, _tmp) = setup().await;
    let res = handle_method(&host, "nonexistent.method", &json!({})).await;
    assert!(res.unwrap_err().contains("unknown method"));
    teardown(host).await;
}

// ─── Pages ───

#[tokio::test(start_paused = true)]
async fn test_page_open_and_list() {
    let (host, _tmp) = setup().await;
    let page_id = open(&host).await;

    let list = handle_method(&host, "page.list", &json!({})).await.unwrap();
    assert_eq!(list, json!([page_id]));

    let info = handle_method(&host, "page.info", &json!({"page_id": page_id})).await.unwrap();
    assert_eq!(info["extent"], 100000.0);
    assert_eq!(info["offset"], 0.0);
    teardown(host).await;
}

#[tokio::test(start_paused = true)]
async fn test_page_open_rejects_bad_geometry_and_kind() {
    let (host, _tmp) = setup().await;

    let res = handle_method(&host, "page.open", &json!({"viewport": 0})).await;
    assert!(res.unwrap_err().contains("Invalid page geometry"));

    let res = handle_method(&host, "page.open", &json!({"kind": "canvas"})).await;
    assert_eq!(res.unwrap_err(), "unknown page kind: canvas");
    teardown(host).await;
}

#[tokio::test(start_paused = true)]
async fn test_page_close_unknown_page() {
    let (host, _tmp) = setup().await;
    let res = handle_method(&host, "page.close", &json!({"page_id": "nope"})).await;
    assert_eq!(res.unwrap_err(), "Page not found: nope");
    teardown(host).await;
}

#[tokio::test(start_paused = true)]
async fn test_missing_page_id() {
    let (host, _tmp) = setup().await;
    let res = handle_method(&host, "scroll.status", &json!({})).await;
    assert_eq!(res.unwrap_err(), "missing page_id");
    teardown(host).await;
}

// ─── Scrolling ───

#[tokio::test(start_paused = true)]
async fn test_scroll_start_status_and_stop() {
    let (host, _tmp) = setup().await;
    let page_id = open(&host).await;

    let res = handle_method(
        &host,
        "scroll.start",
        &json!({"page_id": page_id, "pixels": "8", "interval": 20, "loop": true}),
    )
    .await
    .unwrap();
    assert_eq!(res["success"], true);
    assert_eq!(res["settings"]["pixelsPerStep"], 8);
    assert_eq!(res["settings"]["loop"], true);

    tokio::time::sleep(Duration::from_millis(100)).await;

    let status = handle_method(&host, "scroll.status", &json!({"page_id": page_id})).await.unwrap();
    assert_eq!(status["active"], true);
    assert_eq!(status["session"]["driverMode"], "orchestrator-driven");

    let mode = handle_method(&host, "scroll.mode", &json!({"page_id": page_id})).await.unwrap();
    assert_eq!(mode, json!({"mode": "scrolling", "label": "Scrolling"}));

    let info = handle_method(&host, "page.info", &json!({"page_id": page_id})).await.unwrap();
    assert!(info["offset"].as_f64().unwrap() > 0.0);

    handle_method(&host, "scroll.stop", &json!({"page_id": page_id})).await.unwrap();
    let status = handle_method(&host, "scroll.status", &json!({"page_id": page_id})).await.unwrap();
    assert_eq!(status, json!({"active": false, "session": null}));
    teardown(host).await;
}

#[tokio::test(start_paused = true)]
async fn test_scroll_start_invalid_form() {
    let (host, _tmp) = setup().await;
    let page_id = open(&host).await;

    let res = handle_method(
        &host,
        "scroll.start",
        &json!({"page_id": page_id, "pixels": "0", "interval": "25"}),
    )
    .await;

    assert_eq!(res.unwrap_err(), "Scroll pixels must be a non-zero number");
    let status = handle_method(&host, "scroll.status", &json!({"page_id": page_id})).await.unwrap();
    assert_eq!(status["active"], false);
    teardown(host).await;
}

#[tokio::test(start_paused = true)]
async fn test_scroll_throttle_switches_page_to_local_mode() {
    let (host, _tmp) = setup().await;
    let page_id = open(&host).await;
    handle_method(&host, "scroll.start", &json!({"page_id": page_id})).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let res = handle_method(&host, "scroll.throttle", &json!({"throttled": true})).await.unwrap();
    assert_eq!(res, json!({"throttled": true}));
    tokio::time::sleep(Duration::from_millis(300)).await;

    let mode = handle_method(&host, "scroll.mode", &json!({"page_id": page_id})).await.unwrap();
    assert_eq!(mode["label"], "Scrolling (Local Mode)");
    teardown(host).await;
}

#[tokio::test(start_paused = true)]
async fn test_scroll_toggle_and_command() {
    let (host, _tmp) = setup().await;
    let page_id = open(&host).await;

    handle_method(&host, "scroll.toggle", &json!({"page_id": page_id})).await.unwrap();
    let status = handle_method(&host, "scroll.status", &json!({"page_id": page_id})).await.unwrap();
    assert_eq!(status["active"], true);

    handle_method(&host, "command", &json!({"name": "toggle-autoscroll", "page_id": page_id}))
        .await
        .unwrap();
    let status = handle_method(&host, "scroll.status", &json!({"page_id": page_id})).await.unwrap();
    assert_eq!(status["active"], false);

    let res = handle_method(&host, "command", &json!({"name": "bogus", "page_id": page_id})).await;
    assert_eq!(res.unwrap_err(), "Unknown command: bogus");
    teardown(host).await;
}

// ─── Settings ───

#[tokio::test(start_paused = true)]
async fn test_settings_get_returns_defaults() {
    let (host, _tmp) = setup().await;
    let res = handle_method(&host, "settings.get", &json!({})).await.unwrap();
    assert_eq!(res, json!({"pixelsPerStep": 5, "stepIntervalMs": 25, "loop": false}));
    teardown(host).await;
}

#[tokio::test(start_paused = true)]
async fn test_settings_save_and_get() {
    let (host, _tmp) = setup().await;

    let saved = handle_method(&host, "settings.save", &json!({"pixels": -12, "interval": "90"}))
        .await
        .unwrap();
    let res = handle_method(&host, "settings.get", &json!({})).await.unwrap();

    assert_eq!(saved, res);
    assert_eq!(res["pixelsPerStep"], -12);
    assert_eq!(res["stepIntervalMs"], 90);
    teardown(host).await;
}

#[tokio::test(start_paused = true)]
async fn test_settings_save_invalid_keeps_previous() {
    let (host, _tmp) = setup().await;

    let res = handle_method(&host, "settings.save", &json!({"pixels": 5, "interval": 700000})).await;
    assert_eq!(
        res.unwrap_err(),
        "Duration should not exceed 600,000 milliseconds (10 minutes)"
    );

    let res = handle_method(&host, "settings.save", &json!({})).await;
    assert_eq!(res.unwrap_err(), "missing pixels and interval");

    let current: Value = handle_method(&host, "settings.get", &json!({})).await.unwrap();
    assert_eq!(current["stepIntervalMs"], 25);
    teardown(host).await;
}
