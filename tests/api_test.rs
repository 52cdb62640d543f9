// Integration tests for the REST surface

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use homewire::{
    api::{create_app, AppState},
    coordinator::Coordinator,
    storage::Database,
    subscription::BroadcastHub,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn create_test_app() -> (Router, Arc<Coordinator>) {
    let coordinator = Arc::new(Coordinator::new(
        Arc::new(Database::open_in_memory().unwrap()),
        Arc::new(BroadcastHub::new()),
    ));
    coordinator.seed_default_sensors().unwrap();

    let app = create_app(Arc::new(AppState {
        coordinator: Arc::clone(&coordinator),
        default_event_limit: 50,
    }));
    (app, coordinator)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let (app, _) = create_test_app();

    let (status, body) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_create_and_list_devices() {
    let (app, _) = create_test_app();

    let (status, created) = send(
        &app,
        "POST",
        "/devices",
        Some(json!({"name": "Lamp", "type": "light", "state": {"on": false}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, devices) = send(&app, "GET", "/devices", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(devices.as_array().unwrap().len(), 1);
    assert_eq!(devices[0]["id"], json!(id));
    assert_eq!(devices[0]["name"], "Lamp");
    assert_eq!(devices[0]["type"], "light");
    assert_eq!(devices[0]["state"], json!({"on": false}));
    assert!(devices[0]["created_at"].is_string());
}

#[tokio::test]
async fn test_create_device_without_state() {
    let (app, _) = create_test_app();

    send(&app, "POST", "/devices", Some(json!({"name": "Cam", "type": "camera"}))).await;

    let (_, devices) = send(&app, "GET", "/devices", None).await;
    assert_eq!(devices[0]["state"], json!({}));
}

#[tokio::test]
async fn test_patch_device_merges_and_logs() {
    let (app, coordinator) = create_test_app();
    let id = coordinator
        .create_device(
            "Lamp",
            "light",
            Some(json!({"on": false, "level": 2}).as_object().unwrap().clone()),
        )
        .unwrap();

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/devices/{}", id),
        Some(json!({"on": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true}));

    let (_, devices) = send(&app, "GET", "/devices", None).await;
    assert_eq!(devices[0]["state"], json!({"on": true, "level": 2}));

    let (_, events) = send(&app, "GET", "/events", None).await;
    assert_eq!(events.as_array().unwrap().len(), 1);
    assert_eq!(events[0]["level"], "info");
    assert_eq!(events[0]["source"], "Device Update: Lamp");
    assert_eq!(events[0]["payload"], json!({"on": true, "level": 2}));
}

#[tokio::test]
async fn test_patch_unknown_device_returns_404() {
    let (app, coordinator) = create_test_app();

    let (status, body) = send(
        &app,
        "PATCH",
        "/devices/unknown-id",
        Some(json!({"on": true})),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
    assert_eq!(coordinator.event_count().unwrap(), 0);
}

#[tokio::test]
async fn test_list_seeded_sensors() {
    let (app, _) = create_test_app();

    let (status, sensors) = send(&app, "GET", "/sensors", None).await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = sensors
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec!["Front Door", "Living Room Motion", "Kitchen Window", "Smoke Detector"]
    );
    assert_eq!(sensors[0]["is_triggered"], false);
    assert_eq!(sensors[0]["sensitivity"], 1.0);
}

#[tokio::test]
async fn test_trigger_sensor() {
    let (app, coordinator) = create_test_app();
    let sensor_id = coordinator.list_sensors().unwrap()[0].id.clone();

    let (status, _) = send(
        &app,
        "POST",
        &format!("/sensors/{}/trigger", sensor_id),
        Some(json!({"value": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, sensors) = send(&app, "GET", "/sensors", None).await;
    assert_eq!(sensors[0]["is_triggered"], true);

    let (_, events) = send(&app, "GET", "/events?limit=1", None).await;
    assert_eq!(events[0]["level"], "warn");
    assert_eq!(events[0]["source"], "Sensor Update");
    assert_eq!(
        events[0]["payload"],
        json!({"sensor_id": sensor_id, "triggered": true})
    );
}

#[tokio::test]
async fn test_trigger_defaults_to_true() {
    let (app, coordinator) = create_test_app();
    let sensor_id = coordinator.list_sensors().unwrap()[2].id.clone();

    let (status, _) = send(
        &app,
        "POST",
        &format!("/sensors/{}/trigger", sensor_id),
        Some(json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(coordinator.list_sensors().unwrap()[2].is_triggered);
}

#[tokio::test]
async fn test_trigger_unknown_sensor_is_accepted() {
    let (app, coordinator) = create_test_app();

    let (status, _) = send(
        &app,
        "POST",
        "/sensors/no-such-sensor/trigger",
        Some(json!({"value": false})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(coordinator.event_count().unwrap(), 1);
}

#[tokio::test]
async fn test_events_limit() {
    let (app, _) = create_test_app();
    for i in 0..5 {
        send(
            &app,
            "POST",
            "/logs",
            Some(json!({"source": format!("sim-{}", i)})),
        )
        .await;
    }

    let (status, events) = send(&app, "GET", "/events?limit=2", None).await;

    assert_eq!(status, StatusCode::OK);
    let sources: Vec<&str> = events
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["source"].as_str().unwrap())
        .collect();
    assert_eq!(sources, vec!["sim-4", "sim-3"]);
}

#[tokio::test]
async fn test_events_limit_zero_rejected() {
    let (app, _) = create_test_app();

    let (status, body) = send(&app, "GET", "/events?limit=0", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_manual_log_defaults() {
    let (app, _) = create_test_app();

    let (status, body) = send(&app, "POST", "/logs", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true}));

    let (_, events) = send(&app, "GET", "/events", None).await;
    assert_eq!(events[0]["level"], "info");
    assert_eq!(events[0]["source"], "Manual");
    assert!(events[0]["payload"].is_null());
}

#[tokio::test]
async fn test_manual_log_with_payload() {
    let (app, _) = create_test_app();

    send(
        &app,
        "POST",
        "/logs",
        Some(json!({"level": "critical", "source": "Simulator", "payload": {"zone": 3}})),
    )
    .await;

    let (_, events) = send(&app, "GET", "/events", None).await;
    assert_eq!(events[0]["level"], "critical");
    assert_eq!(events[0]["source"], "Simulator");
    assert_eq!(events[0]["payload"], json!({"zone": 3}));
}

#[tokio::test]
async fn test_manual_log_unknown_level_rejected() {
    let (app, coordinator) = create_test_app();

    let (status, _) = send(&app, "POST", "/logs", Some(json!({"level": "debug"}))).await;

    assert!(status.is_client_error());
    assert_eq!(coordinator.event_count().unwrap(), 0);
}

#[tokio::test]
async fn test_ws_route_requires_upgrade() {
    let (app, _) = create_test_app();

    let (status, _) = send(&app, "GET", "/ws", None).await;

    // Plain GET without upgrade headers is refused by the WebSocket extractor
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_storage_fault_returns_500() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("home.db");
    let coordinator = Arc::new(Coordinator::new(
        Arc::new(Database::open(&path).unwrap()),
        Arc::new(BroadcastHub::new()),
    ));
    let app = create_app(Arc::new(AppState {
        coordinator: Arc::clone(&coordinator),
        default_event_limit: 50,
    }));
    let id = coordinator.create_device("Lamp", "light", None).unwrap();
    let mut observer = coordinator.connect();

    // Break the event log from outside the service
    rusqlite::Connection::open(&path)
        .unwrap()
        .execute_batch("DROP TABLE events")
        .unwrap();

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/devices/{}", id),
        Some(json!({"on": true})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
    assert!(observer.try_recv().is_none());

    let (status, _) = send(&app, "GET", "/events", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_trigger_accepts_truthy_values() {
    let (app, coordinator) = create_test_app();
    let sensor_id = coordinator.list_sensors().unwrap()[0].id.clone();
    let uri = format!("/sensors/{}/trigger", sensor_id);

    let (status, _) = send(&app, "POST", &uri, Some(json!({"value": 1}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(coordinator.list_sensors().unwrap()[0].is_triggered);

    let (status, _) = send(&app, "POST", &uri, Some(json!({"value": 0}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!coordinator.list_sensors().unwrap()[0].is_triggered);
}
