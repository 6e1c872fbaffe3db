//! Telegram Bot API client.

use crate::config::TelegramCredentials;
use crate::exchange::http_client;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Outbound text messages to a chat.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

/// Subset of an incoming webhook update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Update {
    #[serde(default)]
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    /// Numeric in Telegram's payloads; kept as text for `sendMessage`.
    #[serde(deserialize_with = "deserialize_chat_id")]
    pub id: String,
}

fn deserialize_chat_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("invalid chat id: {}", other))),
    }
}

pub struct TelegramClient {
    http: Client,
    api_base: String,
    bot_token: String,
}

impl TelegramClient {
    pub fn new(api_base: &str, credentials: &TelegramCredentials) -> Result<Self> {
        Ok(Self {
            http: http_client(SEND_TIMEOUT)?,
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token: credentials.bot_token.clone(),
        })
    }
}

#[async_trait]
impl MessageSender for TelegramClient {
    #[instrument(skip(self, text), name = "telegram_send")]
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
        let body = SendMessageRequest {
            chat_id,
            text,
            parse_mode: "HTML",
        };

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("Failed to send Telegram message")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Telegram API error {}: {}", status, body);
        }

        debug!(chat_id, chars = text.len(), "Telegram message delivered");
        Ok(())
    }
}
