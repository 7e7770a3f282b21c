//! Alert delivery through the Telegram Bot API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::json;

use crate::config::Config;
use crate::error_handling::MessengerError;

/// What the messaging endpoint answered.
///
/// A report is produced for every response, including non-2xx ones; only
/// transport failures become a `MessengerError`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub status: u16,
    pub ok: bool,
    pub body: String,
}

/// Sends one pre-formatted HTML message to the configured recipient.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, text: &str) -> Result<DeliveryReport, MessengerError>;

    /// Recipient identifier, echoed by the diagnostic endpoint.
    fn recipient(&self) -> &str;
}

/// Telegram `sendMessage` client.
#[derive(Clone)]
pub struct TelegramMessenger {
    client: Client,
    api_base: String,
    token: String,
    chat_id: String,
    timeout: Duration,
}

impl std::fmt::Debug for TelegramMessenger {
    // The bot token is part of the endpoint path and must stay out of logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramMessenger")
            .field("api_base", &self.api_base)
            .field("chat_id", &self.chat_id)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl TelegramMessenger {
    pub fn new(
        client: Client,
        api_base: impl Into<String>,
        token: impl Into<String>,
        chat_id: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
            timeout,
        }
    }

    /// Builds the messenger from configuration.
    ///
    /// # Errors
    ///
    /// Returns `MessengerError::NotConfigured` naming the first missing
    /// setting when the bot token or chat id is absent or blank.
    pub fn from_config(client: Client, config: &Config) -> Result<Self, MessengerError> {
        let token = non_blank(config.telegram_bot_token.as_deref())
            .ok_or(MessengerError::NotConfigured("TELEGRAM_BOT_TOKEN"))?;
        let chat_id = non_blank(config.telegram_chat_id.as_deref())
            .ok_or(MessengerError::NotConfigured("TELEGRAM_CHAT_ID"))?;
        Ok(Self::new(
            client,
            config.telegram_api_base.as_str(),
            token,
            chat_id,
            config.messenger_timeout(),
        ))
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.token)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send(&self, text: &str) -> Result<DeliveryReport, MessengerError> {
        let payload = json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });

        let exchange = async {
            let response = self
                .client
                .post(self.endpoint())
                .json(&payload)
                .send()
                .await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>(DeliveryReport {
                status: status.as_u16(),
                ok: status.is_success(),
                body,
            })
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            // reqwest errors carry the URL, which embeds the bot token.
            Ok(result) => Ok(result.map_err(reqwest::Error::without_url)?),
            Err(_) => Err(MessengerError::Timeout(self.timeout.as_millis() as u64)),
        }
    }

    fn recipient(&self) -> &str {
        &self.chat_id
    }
}
