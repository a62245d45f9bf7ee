//! 币安行情客户端与 Telegram 渠道的集成测试
//!
//! 使用本地 axum 服务模拟上游接口，不访问真实网络

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use ema_signal_server::klcommon::config::{ApiConfig, TelegramConfig};
use ema_signal_server::klcommon::{AppError, BinanceApi, MarketDataSource};
use ema_signal_server::notify::{Notifier, TelegramNotifier};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Upstream {
    exchange_info_calls: Mutex<usize>,
    telegram_bodies: Mutex<Vec<(String, Value)>>,
}

async fn exchange_info(State(state): State<Arc<Upstream>>) -> (StatusCode, Json<Value>) {
    let mut calls = state.exchange_info_calls.lock().unwrap();
    *calls += 1;

    // 第一次请求模拟限流
    if *calls == 1 {
        return (StatusCode::TOO_MANY_REQUESTS, Json(json!({ "code": -1003, "msg": "Too many requests" })));
    }

    (
        StatusCode::OK,
        Json(json!({
            "timezone": "UTC",
            "symbols": [
                { "symbol": "BTCUSDT", "status": "TRADING", "quoteAsset": "USDT" },
                { "symbol": "ETHBTC", "status": "TRADING", "quoteAsset": "BTC" },
                { "symbol": "LUNAUSDT", "status": "BREAK", "quoteAsset": "USDT" },
                { "symbol": "ETHUSDT", "status": "TRADING", "quoteAsset": "USDT" }
            ]
        })),
    )
}

async fn klines(Query(params): Query<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
    match params.get("symbol").map(String::as_str) {
        Some("BTCUSDT") => {
            let limit: i64 = params.get("limit").and_then(|l| l.parse().ok()).unwrap_or(3);
            let rows: Vec<Value> = (0..limit)
                .map(|i| {
                    let open_time = 1_700_000_000_000i64 + i * 900_000;
                    json!([open_time, "100.0", "101.0", "99.0", format!("{}", 100 + i), "12.5", open_time + 899_999, "0", 1, "0", "0", "0"])
                })
                .collect();
            (StatusCode::OK, Json(Value::Array(rows)))
        }
        Some("EMPTYUSDT") => (StatusCode::OK, Json(json!([]))),
        _ => (StatusCode::BAD_REQUEST, Json(json!({ "code": -1121, "msg": "Invalid symbol." }))),
    }
}

async fn sentiment() -> Json<Value> {
    Json(json!([
        { "symbol": "BTCUSDT", "longShortRatio": "1.8105", "longAccount": "0.6442", "shortAccount": "0.3558", "timestamp": 1583139600000i64 }
    ]))
}

async fn send_message(
    State(state): State<Arc<Upstream>>,
    Path(bot): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if bot != "botTEST_TOKEN" {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "ok": false })));
    }
    state.telegram_bodies.lock().unwrap().push((bot, body));
    (StatusCode::OK, Json(json!({ "ok": true })))
}

async fn spawn_upstream() -> (String, Arc<Upstream>) {
    let state = Arc::new(Upstream::default());
    let app = Router::new()
        .route("/api/v3/exchangeInfo", get(exchange_info))
        .route("/api/v3/klines", get(klines))
        .route("/futures/data/globalLongShortAccountRatio", get(sentiment))
        .route("/:bot/sendMessage", post(send_message))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), state)
}

fn api_config(base: &str) -> ApiConfig {
    ApiConfig {
        spot_api_url: base.to_string(),
        futures_api_url: base.to_string(),
        max_retries: 3,
        retry_interval_ms: 10,
        ..ApiConfig::default()
    }
}

#[tokio::test]
async fn test_list_pairs_retries_and_filters() {
    let (base, upstream) = spawn_upstream().await;
    let api = BinanceApi::new(&api_config(&base)).unwrap();

    let pairs = api.list_pairs("USDT", 1000).await.unwrap();
    assert_eq!(pairs, vec!["BTCUSDT", "ETHUSDT"]);
    assert_eq!(*upstream.exchange_info_calls.lock().unwrap(), 2);

    let capped = api.list_pairs("USDT", 1).await.unwrap();
    assert_eq!(capped, vec!["BTCUSDT"]);
}

#[tokio::test]
async fn test_fetch_candles_and_sentiment() {
    let (base, _) = spawn_upstream().await;
    let api = BinanceApi::new(&api_config(&base)).unwrap();

    let series = api.fetch_candles("BTCUSDT", "15m", 120).await.unwrap();
    assert_eq!(series.len(), 120);
    assert_eq!(series.symbol(), "BTCUSDT");
    assert_eq!(series.interval(), "15m");
    assert_eq!(series.last().unwrap().close, 219.0);
    assert_eq!(series.candles()[0].volume, 12.5);

    let ratio = api.fetch_sentiment("BTCUSDT", "15m").await.unwrap();
    assert_eq!(ratio.long_short_ratio, 1.8105);

    assert!(matches!(
        api.fetch_candles("EMPTYUSDT", "15m", 120).await,
        Err(AppError::DataError(_))
    ));

    let err = api.fetch_candles("NOPEUSDT", "15m", 120).await.unwrap_err();
    assert!(matches!(err, AppError::UpstreamFetchError(_)));
    assert!(err.is_upstream());
}

#[tokio::test]
async fn test_telegram_notifier_posts_chat_and_text() {
    let (base, upstream) = spawn_upstream().await;

    let telegram = TelegramConfig {
        api_url: base.clone(),
        bot_token: Some("TEST_TOKEN".to_string()),
        chat_id: Some("12345".to_string()),
    };
    let notifier = TelegramNotifier::new(&telegram, &ApiConfig::default()).unwrap();
    assert!(notifier.is_configured());
    notifier.send_text("BUY SIGNAL: BTCUSDT (15m)").await.unwrap();

    let bodies = upstream.telegram_bodies.lock().unwrap().clone();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0].1, json!({ "chat_id": "12345", "text": "BUY SIGNAL: BTCUSDT (15m)" }));

    let wrong_token = TelegramNotifier::new(
        &TelegramConfig { bot_token: Some("WRONG".to_string()), ..telegram.clone() },
        &ApiConfig::default(),
    )
    .unwrap();
    assert!(matches!(wrong_token.send_text("x").await, Err(AppError::DispatchFailure(_))));

    let unconfigured = TelegramNotifier::new(
        &TelegramConfig { api_url: base, bot_token: None, chat_id: None },
        &ApiConfig::default(),
    )
    .unwrap();
    assert!(!unconfigured.is_configured());
    assert!(matches!(unconfigured.send_text("x").await, Err(AppError::DispatchFailure(_))));
}
