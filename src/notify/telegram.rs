use crate::klcommon::config::{ApiConfig, TelegramConfig};
use crate::klcommon::{AppError, BinanceApi, Result};
use crate::notify::Notifier;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Telegram Bot `sendMessage` 渠道
#[derive(Clone, Debug)]
pub struct TelegramNotifier {
    api_url: String,
    bot_token: Option<String>,
    chat_id: Option<String>,
    client: Client,
}

impl TelegramNotifier {
    /// HTTP客户端沿用行情接口的超时与代理设置
    pub fn new(config: &TelegramConfig, api: &ApiConfig) -> Result<Self> {
        Ok(Self {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone().filter(|t| !t.is_empty()),
            chat_id: config.chat_id.clone().filter(|c| !c.is_empty()),
            client: BinanceApi::create_client(api)?,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.bot_token.is_some() && self.chat_id.is_some()
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_text(&self, text: &str) -> Result<()> {
        let (Some(token), Some(chat_id)) = (&self.bot_token, &self.chat_id) else {
            return Err(AppError::DispatchFailure("未配置 Telegram bot token 或 chat id".to_string()));
        };

        let url = format!("{}/bot{}/sendMessage", self.api_url, token);
        let response = self
            .client
            .post(&url)
            .json(&SendMessageRequest { chat_id, text })
            .send()
            .await
            .map_err(|e| AppError::DispatchFailure(format!("Telegram 请求失败: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::DispatchFailure(format!(
                "Telegram 返回 {} - {}",
                status,
                body.chars().take(300).collect::<String>()
            )));
        }

        debug!(target: "通知", chars = text.len(), "Telegram 消息已发送");
        Ok(())
    }
}
