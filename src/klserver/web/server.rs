// Web服务器实现
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use super::handlers;
use crate::klcommon::config::WebConfig;
use crate::klcommon::{AppError, Result};
use crate::service::SignalService;

/// 构建路由
pub fn build_router(service: Arc<SignalService>) -> Router {
    Router::new()
        .route("/api/scan", get(handlers::scan_handler).post(handlers::scan_handler))
        .route("/api/run-state", post(handlers::run_state_handler))
        .route("/api/progress", get(handlers::progress_handler))
        .route("/api/test-telegram", post(handlers::test_telegram_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(service)
}

/// 启动Web服务器，直到服务器退出才返回
pub async fn start_web_server(service: Arc<SignalService>, config: &WebConfig) -> Result<()> {
    let app = build_router(service);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|e| AppError::WebServerError(format!("绑定地址 {} 失败: {}", config.bind_addr, e)))?;

    info!(target: "web", "🌐 Web服务器启动在 http://{}", config.bind_addr);
    info!(target: "web", "路由: /api/scan, /api/run-state, /api/progress, /api/test-telegram");

    if let Err(e) = axum::serve(listener, app).await {
        error!(target: "web", "Web服务器错误: {}", e);
        return Err(AppError::WebServerError(format!("Web服务器错误: {}", e)));
    }

    info!(target: "web", "Web服务器已关闭");
    Ok(())
}
