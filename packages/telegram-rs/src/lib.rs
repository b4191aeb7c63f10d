//! Minimal Telegram Bot API client for sending chat messages.

use anyhow::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

#[derive(Debug, Clone)]
pub struct TelegramOptions {
    pub bot_token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone)]
pub struct TelegramService {
    client: Client,
    options: TelegramOptions,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramService {
    pub fn new(options: TelegramOptions) -> Self {
        Self {
            client: Client::new(),
            options,
        }
    }

    /// Send a message to the configured chat.
    pub async fn send_message(&self, text: &str) -> Result<()> {
        let url = format!(
            "https://api.telegram.org/bot{}/sendMessage",
            self.options.bot_token
        );

        let request = SendMessageRequest {
            chat_id: &self.options.chat_id,
            text,
            parse_mode: "HTML",
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Telegram send failed {}: {}", status, body);
            anyhow::bail!("Telegram API error {}: {}", status, body);
        }

        let body: SendMessageResponse = response.json().await?;
        if !body.ok {
            error!("Telegram rejected message: {:?}", body.description);
            anyhow::bail!(
                "Telegram rejected message: {}",
                body.description.unwrap_or_default()
            );
        }

        info!("Telegram notification sent");
        Ok(())
    }
}
