//! Fans alerts out to every configured channel. Delivery failures are
//! logged and swallowed: the store is the source of truth, notifications
//! are best-effort.

use discord::DiscordWebhook;
use monitor::{AlertCategory, NotificationSink};
use telegram::TelegramService;

pub struct ChannelNotifier {
    telegram: Option<TelegramService>,
    discord: Option<DiscordWebhook>,
}

impl ChannelNotifier {
    pub fn new(telegram: Option<TelegramService>, discord: Option<DiscordWebhook>) -> Self {
        if telegram.is_none() && discord.is_none() {
            tracing::warn!("no notification channels configured, alerts will only be logged");
        }
        Self { telegram, discord }
    }

    fn embed_style(category: AlertCategory) -> (&'static str, u32) {
        match category {
            AlertCategory::Extinction => ("Extinct card detected", discord::COLOR_ALERT),
            AlertCategory::Availability => ("Card back in market", discord::COLOR_SUCCESS),
            AlertCategory::Digest => ("Extinct watch digest", discord::COLOR_INFO),
            AlertCategory::System => ("Extinct monitor", discord::COLOR_INFO),
        }
    }
}

#[async_trait::async_trait]
impl NotificationSink for ChannelNotifier {
    async fn send(&self, message: &str, category: AlertCategory) {
        tracing::info!(category = category.as_str(), message, "dispatching alert");

        if let Some(telegram) = &self.telegram {
            if let Err(err) = telegram.send_message(message).await {
                tracing::error!(
                    category = category.as_str(),
                    error = %err,
                    "telegram delivery failed"
                );
            }
        }

        if let Some(discord) = &self.discord {
            let (title, color) = Self::embed_style(category);
            if let Err(err) = discord.send_embed(title, message, color).await {
                tracing::error!(
                    category = category.as_str(),
                    error = %err,
                    "discord delivery failed"
                );
            }
        }
    }
}
