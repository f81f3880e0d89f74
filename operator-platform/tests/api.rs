use actix_web::{http::StatusCode, test, web, App};
use sentinel_monitor::config::CameraConfig;
use sentinel_monitor::{build_monitor, MonitorConfig, MonitorHandle};
use sentinel_operator::{api, AppState};
use serde_json::{json, Value};
use std::time::Duration;

async fn spawn_monitor(dir: &tempfile::TempDir) -> MonitorHandle {
    let mut config = MonitorConfig::default();
    config.gateway.simulated = true;
    config.storage.labels_path = dir.path().join("labels.json");
    config.cameras = ["dock", "press"]
        .iter()
        .map(|id| CameraConfig {
            id: id.to_string(),
            label: id.to_uppercase(),
            snapshot_url: None,
            active: true,
        })
        .collect();

    let (engine, handle) = build_monitor(&config).await.unwrap();
    tokio::spawn(engine.run());
    handle
}

macro_rules! operator_app {
    ($handle:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::new($handle.clone())))
                .configure(api::configure),
        )
        .await
    };
}

#[actix_web::test]
async fn status_reports_idle_monitor() {
    let dir = tempfile::tempdir().unwrap();
    let handle = spawn_monitor(&dir).await;
    let app = operator_app!(handle);

    let req = test::TestRequest::get().uri("/api/v1/status").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["running"], false);
    assert_eq!(body["busy"], false);
    assert_eq!(body["alert_state"], "IDLE");
    assert_eq!(body["cameras"].as_array().unwrap().len(), 2);
    assert_eq!(body["cameras"][0]["id"], "dock");
}

#[actix_web::test]
async fn start_and_stop_monitoring() {
    let dir = tempfile::tempdir().unwrap();
    let handle = spawn_monitor(&dir).await;
    let app = operator_app!(handle);

    let req = test::TestRequest::post().uri("/api/v1/monitoring/start").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    tokio::time::timeout(Duration::from_secs(5), handle.wait_for(|s| s.running))
        .await
        .unwrap()
        .unwrap();

    let req = test::TestRequest::post().uri("/api/v1/monitoring/stop").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let snapshot = tokio::time::timeout(Duration::from_secs(5), handle.wait_for(|s| !s.running))
        .await
        .unwrap()
        .unwrap();
    assert!(!snapshot.busy);
}

#[actix_web::test]
async fn unknown_camera_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let handle = spawn_monitor(&dir).await;
    let app = operator_app!(handle);

    let req = test::TestRequest::post()
        .uri("/api/v1/cameras/ghost/deactivate")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn deactivated_camera_is_listed_inactive() {
    let dir = tempfile::tempdir().unwrap();
    let handle = spawn_monitor(&dir).await;
    let app = operator_app!(handle);

    let req = test::TestRequest::post()
        .uri("/api/v1/cameras/press/deactivate")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let req = test::TestRequest::get().uri("/api/v1/cameras").to_request();
    let cameras: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(cameras[0]["active"], true);
    assert_eq!(cameras[1]["active"], false);
}

#[actix_web::test]
async fn rename_persists_label() {
    let dir = tempfile::tempdir().unwrap();
    let handle = spawn_monitor(&dir).await;
    let app = operator_app!(handle);

    let req = test::TestRequest::put()
        .uri("/api/v1/cameras/dock/label")
        .set_json(json!({ "label": "  Loading Dock  " }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["label"], "Loading Dock");

    let saved = std::fs::read_to_string(dir.path().join("labels.json")).unwrap();
    let saved: Value = serde_json::from_str(&saved).unwrap();
    assert_eq!(saved["dock"], "Loading Dock");

    let req = test::TestRequest::put()
        .uri("/api/v1/cameras/dock/label")
        .set_json(json!({ "label": "   " }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn settings_are_validated() {
    let dir = tempfile::tempdir().unwrap();
    let handle = spawn_monitor(&dir).await;
    let app = operator_app!(handle);

    let req = test::TestRequest::put()
        .uri("/api/v1/settings")
        .set_json(json!({ "min_safety_score": 140 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::put()
        .uri("/api/v1/settings")
        .set_json(json!({ "sms_enabled": true, "phone_number": "" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::put()
        .uri("/api/v1/settings")
        .set_json(json!({ "min_safety_score": 75, "min_severity_trigger": "MEDIUM" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let snapshot = tokio::time::timeout(
        Duration::from_secs(5),
        handle.wait_for(|s| s.settings.min_safety_score == 75),
    )
    .await
    .unwrap()
    .unwrap();
    assert!(snapshot.settings.sound_enabled);
}

#[actix_web::test]
async fn acknowledge_without_alarm_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let handle = spawn_monitor(&dir).await;
    let app = operator_app!(handle);

    let req = test::TestRequest::post().uri("/api/v1/alarm/acknowledge").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    assert_eq!(handle.snapshot().alert_state, sentinel_common::AlertState::Idle);
}

#[actix_web::test]
async fn history_and_predictions_start_empty() {
    let dir = tempfile::tempdir().unwrap();
    let handle = spawn_monitor(&dir).await;
    let app = operator_app!(handle);

    let req = test::TestRequest::get().uri("/api/v1/history?limit=5").to_request();
    let history: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(history, json!([]));

    let req = test::TestRequest::get().uri("/api/v1/predictions").to_request();
    let predictions: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(predictions["predictions"], json!([]));
}

#[actix_web::test]
async fn metrics_are_exposed_as_text() {
    let dir = tempfile::tempdir().unwrap();
    let handle = spawn_monitor(&dir).await;
    let app = operator_app!(handle);

    let req = test::TestRequest::get().uri("/api/v1/metrics").to_request();
    let body = test::call_and_read_body(&app, req).await;
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("sentinel_cycles_started_total"));
    assert!(text.contains("sentinel_alert_state 0"));
}
