use std::sync::Arc;

use axum::extract::Extension;
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use monitor::SqliteCardStore;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub mod health;
pub mod status;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub store: Arc<SqliteCardStore>,
    pub started_at: DateTime<Utc>,
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/status", get(status::status_handler))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(state))
}
