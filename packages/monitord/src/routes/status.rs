use axum::{extract::Extension, Json};
use chrono::Utc;
use monitor::CardStore;
use serde::Serialize;

use crate::routes::AppState;

#[derive(Serialize)]
pub struct StatusResponse {
    running: bool,
    tracked_cards: i64,
    uptime_seconds: i64,
    last_update: String,
}

/// Read-only monitor status for the dashboard.
pub async fn status_handler(Extension(state): Extension<AppState>) -> Json<StatusResponse> {
    let tracked_cards = match state.store.count().await {
        Ok(count) => count,
        Err(err) => {
            tracing::error!(error = %err, "failed to count tracked cards");
            0
        }
    };

    let now = Utc::now();
    Json(StatusResponse {
        running: true,
        tracked_cards,
        uptime_seconds: (now - state.started_at).num_seconds(),
        last_update: now.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    })
}
