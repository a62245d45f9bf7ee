//! 信号通知：消息模板与推送渠道

pub mod telegram;

use crate::engine::events::{SignalCandidate, SignalKind};
use crate::klcommon::Result;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::fmt::Write;
use std::sync::Arc;
use tracing::{error, info};

pub use telegram::TelegramNotifier;

const LOG_TARGET: &str = "通知";

/// 测试接口发送的固定消息
pub const TEST_MESSAGE: &str = "Test message from the EMA signal bot!";

/// 消息推送渠道
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_text(&self, text: &str) -> Result<()>;
}

fn fmt_price(value: f64) -> String {
    if value.abs() >= 1.0 {
        format!("{:.4}", value)
    } else {
        format!("{:.8}", value)
    }
}

fn fmt_optional<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "N/A".to_string())
}

/// 渲染候选信号的固定格式消息
pub fn format_message(candidate: &SignalCandidate) -> String {
    let event = &candidate.event;
    let pair = event.pair;
    let mut msg = String::new();

    // 写入 String 不会失败
    let header = match candidate.kind {
        SignalKind::Entry => format!("{} SIGNAL", event.direction.action()),
        SignalKind::Trend => "TREND CONFIRMATION".to_string(),
    };
    let _ = writeln!(msg, "{}: {} ({})", header, candidate.symbol, candidate.interval);
    let _ = writeln!(msg, "Cross: {} {} ({} bars ago)", pair, event.direction, event.bars_ago);

    let bar_time = Utc
        .timestamp_millis_opt(candidate.bar_open_time)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| candidate.bar_open_time.to_string());
    let _ = writeln!(msg, "Bar: {}", bar_time);

    let _ = writeln!(msg, "Price: {}", fmt_price(candidate.price));
    let _ = writeln!(
        msg,
        "EMA{}: {} | EMA{}: {}",
        pair.short_period,
        fmt_price(candidate.short_value),
        pair.long_period,
        fmt_price(candidate.long_value)
    );
    let _ = writeln!(msg, "Volume: {:.2}", candidate.volume);
    let _ = writeln!(msg, "RSI: {:.2}", candidate.rsi);
    let _ = writeln!(
        msg,
        "Curvature: EMA{} {} | EMA{} {}",
        pair.short_period,
        fmt_optional(candidate.short_curvature),
        pair.long_period,
        fmt_optional(candidate.long_curvature)
    );

    if candidate.kind == SignalKind::Entry {
        let _ = writeln!(msg, "Trend: {}", fmt_optional(candidate.slow_direction));
    }

    match &candidate.sentiment {
        Some(ratio) => {
            let _ = writeln!(
                msg,
                "Long/Short: {:.2} (long {:.1}% / short {:.1}%)",
                ratio.long_short_ratio,
                ratio.long_account * 100.0,
                ratio.short_account * 100.0
            );
        }
        None => {
            let _ = writeln!(msg, "Long/Short: N/A");
        }
    }

    if let Some(levels) = &candidate.levels {
        let _ = writeln!(
            msg,
            "TP: {} | SL: {}",
            fmt_price(levels.take_profit),
            fmt_price(levels.stop_loss)
        );
    }

    match candidate.kind {
        SignalKind::Entry => {
            let _ = write!(msg, "Action: {}", event.direction.action());
        }
        SignalKind::Trend => {
            let _ = write!(msg, "Action: trend turned {} ({} bias)", event.direction, event.direction.action());
        }
    }

    msg
}

/// 信号推送器。推送失败只记录日志，不向检测流程传播。
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// 渲染并推送，返回是否送达
    pub async fn dispatch(&self, candidate: &SignalCandidate) -> bool {
        let text = format_message(candidate);

        match self.notifier.send_text(&text).await {
            Ok(()) => {
                info!(target: LOG_TARGET, symbol = %candidate.symbol, interval = %candidate.interval, "信号已推送");
                true
            }
            Err(e) => {
                error!(
                    target: LOG_TARGET,
                    symbol = %candidate.symbol,
                    interval = %candidate.interval,
                    error.summary = e.get_error_type_summary(),
                    error.details = %e,
                    "信号推送失败"
                );
                false
            }
        }
    }

    /// 发送固定的测试消息，错误直接返回给调用方
    pub async fn send_test_message(&self) -> Result<()> {
        self.notifier.send_text(TEST_MESSAGE).await
    }
}
