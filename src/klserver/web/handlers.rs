use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::klcommon::AppError;
use crate::service::SignalService;

const LOG_TARGET: &str = "web";

/// 扫描参数。`pairCount` 无法解析时按默认数量处理。
#[derive(Debug, Default, Deserialize)]
pub struct ScanParams {
    #[serde(rename = "pairCount")]
    pub pair_count: Option<String>,
}

impl ScanParams {
    pub fn parsed_pair_count(&self) -> Option<usize> {
        self.pair_count.as_deref().and_then(|s| s.trim().parse().ok())
    }
}

#[derive(Debug, Deserialize)]
pub struct RunStateRequest {
    pub running: bool,
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    error_type: &'static str,
}

/// 错误统一转换为 `{success: false, error}`，扫描被拒绝返回 409
fn error_response(e: AppError) -> Response {
    let status = match e {
        AppError::ScanRejected(_) => StatusCode::CONFLICT,
        AppError::DispatchFailure(_) | AppError::UpstreamFetchError(_) | AppError::HttpError(_) => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let body = ErrorBody {
        success: false,
        error: e.to_string(),
        error_type: e.get_error_type_summary(),
    };
    (status, Json(body)).into_response()
}

/// GET|POST /api/scan?pairCount=N
pub async fn scan_handler(
    State(service): State<Arc<SignalService>>,
    Query(params): Query<ScanParams>,
) -> Response {
    let pair_count = params.parsed_pair_count();
    info!(target: LOG_TARGET, pair_count = ?pair_count, "收到扫描请求");

    match service.trigger_scan(pair_count).await {
        Ok(report) => Json(json!({
            "success": true,
            "accepted": report.accepted,
            "signals": report.signals,
            "failed": report.failed,
            "skipped": report.skipped,
        }))
        .into_response(),
        Err(e) => {
            warn!(
                target: LOG_TARGET,
                { error.summary = e.get_error_type_summary(),
                error.details = %e },
                "扫描请求失败"
            );
            error_response(e)
        }
    }
}

/// 请求体无法解析时同样返回 `{success: false, error}`，状态码沿用 axum 的判定（400/415/422）
fn rejection_response(rejection: JsonRejection) -> Response {
    let body = ErrorBody {
        success: false,
        error: rejection.body_text(),
        error_type: "request_body_invalid",
    };
    (rejection.status(), Json(body)).into_response()
}

/// POST /api/run-state
pub async fn run_state_handler(
    State(service): State<Arc<SignalService>>,
    payload: Result<Json<RunStateRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(target: LOG_TARGET, { error.details = %rejection.body_text() }, "运行状态请求体无效");
            return rejection_response(rejection);
        }
    };

    let running = service.set_run_state(request.running);
    Json(json!({ "success": true, "running": running })).into_response()
}

/// GET /api/progress
pub async fn progress_handler(State(service): State<Arc<SignalService>>) -> Response {
    let progress = service.query_progress();
    Json(json!({
        "success": true,
        "done": progress.done,
        "total": progress.total,
        "running": progress.running,
        "scanning": progress.scanning,
        "epoch": progress.epoch,
    }))
    .into_response()
}

/// POST /api/test-telegram
pub async fn test_telegram_handler(State(service): State<Arc<SignalService>>) -> Response {
    match service.send_test_message().await {
        Ok(()) => Json(json!({ "success": true })).into_response(),
        Err(e) => {
            error!(
                target: LOG_TARGET,
                { error.summary = e.get_error_type_summary(),
                error.details = %e },
                "测试消息发送失败"
            );
            error_response(e)
        }
    }
}
