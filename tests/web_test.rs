//! HTTP接口集成测试：在随机端口上启动路由，用 reqwest 访问

mod common;

use common::{fast_buy_closes, slow_up_closes, MockSource, RecordingNotifier};
use ema_signal_server::klcommon::AppConfig;
use ema_signal_server::klserver::build_router;
use ema_signal_server::service::SignalService;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;

async fn spawn_server(notifier: Arc<RecordingNotifier>) -> String {
    let mut config = AppConfig::default();
    config.scan.inter_batch_delay_ms = 0;

    let source = MockSource::new().with("AAAUSDT", fast_buy_closes(), slow_up_closes());
    let service = Arc::new(SignalService::new(&config, Arc::new(source), notifier));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(service)).await.unwrap();
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn test_progress_run_state_and_scan() {
    let base = spawn_server(Arc::new(RecordingNotifier::default())).await;
    let client = reqwest::Client::new();

    let progress: Value = client.get(format!("{}/api/progress", base)).send().await.unwrap().json().await.unwrap();
    assert_eq!(progress["success"], true);
    assert_eq!(progress["running"], true);
    assert_eq!(progress["done"], 0);

    // 暂停后扫描被拒绝
    let paused: Value = client
        .post(format!("{}/api/run-state", base))
        .json(&json!({ "running": false }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(paused, json!({ "success": true, "running": false }));

    let response = client.get(format!("{}/api/scan", base)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error_type"], "scan_request_rejected");

    client
        .post(format!("{}/api/run-state", base))
        .json(&json!({ "running": true }))
        .send()
        .await
        .unwrap();

    // 无法解析的 pairCount 按默认数量处理
    let response = client.post(format!("{}/api/scan?pairCount=abc", base)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let report: Value = response.json().await.unwrap();
    assert_eq!(report, json!({ "success": true, "accepted": 1, "signals": 1, "failed": 0, "skipped": 0 }));

    let progress: Value = client.get(format!("{}/api/progress", base)).send().await.unwrap().json().await.unwrap();
    assert_eq!(progress["done"], 1);
    assert_eq!(progress["total"], 1);
    assert_eq!(progress["scanning"], false);
}

#[tokio::test]
async fn test_run_state_rejects_invalid_body_with_json_envelope() {
    let base = spawn_server(Arc::new(RecordingNotifier::default())).await;
    let client = reqwest::Client::new();

    // 缺少 running 字段
    let response = client.post(format!("{}/api/run-state", base)).json(&json!({})).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error_type"], "request_body_invalid");
    assert!(body["error"].as_str().unwrap().contains("running"));

    // JSON 语法错误
    let response = client
        .post(format!("{}/api/run-state", base))
        .header("content-type", "application/json")
        .body("{\"running\":")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);

    // 没有 Content-Type
    let response = client.post(format!("{}/api/run-state", base)).body("running").send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);

    // 状态没有被改变
    let progress: Value = client.get(format!("{}/api/progress", base)).send().await.unwrap().json().await.unwrap();
    assert_eq!(progress["running"], true);
    assert_eq!(progress["epoch"], 1);
}

#[tokio::test]
async fn test_telegram_endpoint() {
    let notifier = Arc::new(RecordingNotifier::default());
    let base = spawn_server(notifier.clone()).await;
    let client = reqwest::Client::new();

    let body: Value = client
        .post(format!("{}/api/test-telegram", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({ "success": true }));
    assert_eq!(notifier.messages().len(), 1);

    let failing_base = spawn_server(Arc::new(RecordingNotifier::failing())).await;
    let response = client.post(format!("{}/api/test-telegram", failing_base)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error_type"], "signal_notification_failed");
}
