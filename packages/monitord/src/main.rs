// Main entry point for the extinct card market monitor

mod config;
mod gateway;
mod notifier;
mod routes;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use futgg::{FutGgClient, FutGgOptions};
use monitor::{
    scheduler, AlertCategory, CardStore, DiscoveryEngine, NotificationSink, ReconciliationEngine,
    SqliteCardStore,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use crate::config::Config;
use crate::gateway::FutGgGateway;
use crate::notifier::ChannelNotifier;
use crate::routes::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,monitor=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting extinct card market monitor");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Open the database
    tracing::info!(path = %config.database_path, "Opening database...");
    let connect_options = SqliteConnectOptions::new()
        .filename(&config.database_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(5));
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(connect_options)
        .await
        .context("Failed to open database")?;
    tracing::info!("Database opened");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("../monitor/migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    let store = Arc::new(SqliteCardStore::new(pool.clone()));

    // Wire collaborators
    let futgg_client =
        FutGgClient::new(FutGgOptions::default()).context("Failed to build fut.gg client")?;
    let source = Arc::new(FutGgGateway::new(futgg_client));

    let telegram = match (&config.telegram_bot_token, &config.telegram_chat_id) {
        (Some(bot_token), Some(chat_id)) => Some(telegram::TelegramService::new(
            telegram::TelegramOptions {
                bot_token: bot_token.clone(),
                chat_id: chat_id.clone(),
            },
        )),
        _ => None,
    };
    let discord_hook = config
        .discord_webhook_url
        .clone()
        .map(discord::DiscordWebhook::new);
    let sink = Arc::new(ChannelNotifier::new(telegram, discord_hook));

    // Only the instance that wins the lock row announces itself
    let instance_id = format!("{}-{}", Utc::now().format("%Y%m%d%H%M%S"), Uuid::new_v4());
    if store
        .acquire_startup_lock(&instance_id)
        .await
        .context("Failed to acquire startup lock")?
    {
        tracing::info!(instance_id = %instance_id, "Startup lock acquired");
        sink.send(
            &format!("Extinct card monitor started (instance {})", instance_id),
            AlertCategory::System,
        )
        .await;
    } else {
        tracing::warn!(instance_id = %instance_id, "Another instance already announced startup");
    }

    // Start the engines
    let monitor_config = config.monitor_config();
    let discovery = DiscoveryEngine::new(
        Arc::clone(&source),
        Arc::clone(&store),
        Arc::clone(&sink),
        monitor_config.clone(),
    );
    let reconcile = ReconciliationEngine::new(
        Arc::clone(&source),
        Arc::clone(&store),
        Arc::clone(&sink),
        monitor_config.clone(),
    );

    let _discovery_loop =
        scheduler::spawn_discovery_loop(discovery, monitor_config.discovery_interval);
    let _reconcile_loop =
        scheduler::spawn_reconcile_loop(reconcile.clone(), monitor_config.reconcile_interval);
    let _digest_schedule = scheduler::start_digest_schedule(reconcile)
        .await
        .context("Failed to start digest schedule")?;

    // Start the status server
    let app = routes::build_app(AppState {
        db_pool: pool,
        store,
        started_at: Utc::now(),
    });
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting status server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
