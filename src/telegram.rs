//! Telegram Bot API, send-only.

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

const TELEGRAM_API: &str = "https://api.telegram.org";

/// Where fired alerts go.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// True when alerts are only logged.
    fn is_dry_run(&self) -> bool;

    /// Delivers one alert, returns the sink's message id.
    async fn send(&self, text: &str) -> Result<i64>;
}

pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    token: String,
    chat_id: String,
    /// Observe only: alerts go to the log, nothing is sent.
    dry_run: bool,
}

impl TelegramNotifier {
    pub fn new(client: reqwest::Client, token: impl Into<String>, chat_id: impl Into<String>, dry_run: bool) -> Self {
        Self {
            client,
            api_base: TELEGRAM_API.to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
            dry_run,
        }
    }

    /// getMe, so a bad token fails at startup instead of on the first alert.
    pub async fn verify(&self) -> Result<i64> {
        if self.dry_run {
            return Ok(0);
        }
        let resp: serde_json::Value = self
            .client
            .get(self.method_url("getMe"))
            .send()
            .await
            .context("Telegram getMe request failed")?
            .json()
            .await
            .context("Telegram getMe returned invalid JSON")?;
        if resp["ok"].as_bool() != Some(true) {
            anyhow::bail!("Telegram getMe rejected the token: {}", resp["description"]);
        }
        Ok(resp["result"]["id"].as_i64().unwrap_or(0))
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }
}

#[async_trait]
impl AlertSink for TelegramNotifier {
    fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Sends one HTML message, returns its message_id (0 in dry-run).
    /// Failures are returned to the caller; nothing is retried here.
    async fn send(&self, text: &str) -> Result<i64> {
        if self.dry_run {
            info!("[DRY RUN] Telegram alert:\n{}", text);
            return Ok(0);
        }

        let body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });
        let resp = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .context("Telegram sendMessage request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!("Telegram sendMessage failed: {} - {}", status, body);
            anyhow::bail!("Telegram sendMessage failed: {} - {}", status, body);
        }
        let resp_json: serde_json::Value = resp.json().await?;
        Ok(resp_json["result"]["message_id"].as_i64().unwrap_or(0))
    }
}
