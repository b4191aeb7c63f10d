//! Minimal Discord webhook client for posting embeds.

use anyhow::Result;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info};

pub const COLOR_ALERT: u32 = 0xFF0000;
pub const COLOR_SUCCESS: u32 = 0x2ECC71;
pub const COLOR_INFO: u32 = 0x0099FF;

#[derive(Debug, Clone)]
pub struct DiscordWebhook {
    client: Client,
    webhook_url: String,
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    embeds: Vec<Embed<'a>>,
}

#[derive(Debug, Serialize)]
struct Embed<'a> {
    title: &'a str,
    description: &'a str,
    color: u32,
    timestamp: String,
}

impl DiscordWebhook {
    pub fn new(webhook_url: String) -> Self {
        Self {
            client: Client::new(),
            webhook_url,
        }
    }

    /// Post a single embed to the webhook.
    pub async fn send_embed(&self, title: &str, description: &str, color: u32) -> Result<()> {
        let payload = WebhookPayload {
            embeds: vec![Embed {
                title,
                description,
                color,
                timestamp: Utc::now().to_rfc3339(),
            }],
        };

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Discord webhook failed {}: {}", status, body);
            anyhow::bail!("Discord webhook error {}: {}", status, body);
        }

        info!("Discord notification sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embed_payload_serializes_as_discord_expects() {
        let payload = WebhookPayload {
            embeds: vec![Embed {
                title: "EXTINCT",
                description: "Mbappe (91)",
                color: COLOR_ALERT,
                timestamp: "2026-01-01T00:00:00Z".to_string(),
            }],
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["embeds"][0]["title"], "EXTINCT");
        assert_eq!(json["embeds"][0]["color"], 0xFF0000);
    }

    #[tokio::test]
    #[ignore] // Requires a real webhook URL
    async fn test_send_embed() {
        let url = std::env::var("TEST_DISCORD_WEBHOOK").expect("TEST_DISCORD_WEBHOOK not set");
        let webhook = DiscordWebhook::new(url);
        let result = webhook.send_embed("Test", "Test message", COLOR_INFO).await;
        assert!(result.is_ok());
    }
}
