use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use monitor::MonitorConfig;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub port: u16,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub discord_webhook_url: Option<String>,
    pub min_rating: i64,
    pub discovery_interval_secs: u64,
    pub reconcile_interval_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "extinct_cards.db".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN").ok(),
            telegram_chat_id: env::var("TELEGRAM_CHAT_ID").ok(),
            discord_webhook_url: env::var("DISCORD_WEBHOOK_URL").ok(),
            min_rating: env::var("MIN_RATING")
                .unwrap_or_else(|_| "81".to_string())
                .parse()
                .context("MIN_RATING must be a valid number")?,
            discovery_interval_secs: env::var("DISCOVERY_INTERVAL_SECS")
                .unwrap_or_else(|_| "1800".to_string())
                .parse()
                .context("DISCOVERY_INTERVAL_SECS must be a valid number")?,
            reconcile_interval_secs: env::var("RECONCILE_INTERVAL_SECS")
                .unwrap_or_else(|_| "600".to_string())
                .parse()
                .context("RECONCILE_INTERVAL_SECS must be a valid number")?,
        })
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig::default()
            .with_min_rating(self.min_rating)
            .with_intervals(
                Duration::from_secs(self.discovery_interval_secs),
                Duration::from_secs(self.reconcile_interval_secs),
            )
    }
}
