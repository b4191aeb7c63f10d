use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::error::StoreError;
use crate::store::{CardStore, InsertOutcome};
use crate::types::{CardId, CardStatus, TrackedCard};

const CARD_COLUMNS: &str = "card_id, name, rating, status, club, position, nation, \
     first_detected_at, last_seen_on_source_at, last_checked_at, \
     consecutive_missing, alert_sent";

/// Total attempts per operation when SQLite reports lock contention.
const BUSY_ATTEMPTS: u32 = 3;

/// SQLite-backed card store.
///
/// Transient lock contention is retried here with a randomized 0.5-2s
/// delay; exhaustion surfaces `StoreError::Unavailable` and the caller
/// skips its cycle.
#[derive(Debug, Clone)]
pub struct SqliteCardStore {
    pool: SqlitePool,
}

impl SqliteCardStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn with_retry<T, F, Fut>(&self, op_name: &'static str, op: F) -> Result<T, StoreError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if is_busy(&err) && attempt + 1 < BUSY_ATTEMPTS => {
                    attempt += 1;
                    let delay = Duration::from_millis(500 + fastrand::u64(0..1500));
                    tracing::warn!(
                        op = op_name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "store busy, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) if is_busy(&err) => {
                    tracing::error!(op = op_name, error = %err, "store busy, retries exhausted");
                    return Err(StoreError::Unavailable(err));
                }
                Err(err) => return Err(StoreError::Database(err)),
            }
        }
    }
}

fn is_busy(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            let message = db.message().to_ascii_lowercase();
            message.contains("database is locked") || message.contains("database table is locked")
        }
        sqlx::Error::PoolTimedOut => true,
        _ => false,
    }
}

fn map_card(row: SqliteRow) -> TrackedCard {
    let status: String = row.get("status");
    TrackedCard {
        card_id: CardId::new(row.get::<String, _>("card_id")),
        name: row.get("name"),
        rating: row.get("rating"),
        status: match status.as_str() {
            "available" => CardStatus::Available,
            _ => CardStatus::Extinct,
        },
        club: row.get("club"),
        position: row.get("position"),
        nation: row.get("nation"),
        first_detected_at: row.get("first_detected_at"),
        last_seen_on_source_at: row.get("last_seen_on_source_at"),
        last_checked_at: row.get("last_checked_at"),
        consecutive_missing: row.get("consecutive_missing"),
        alert_sent: row.get("alert_sent"),
    }
}

#[async_trait::async_trait]
impl CardStore for SqliteCardStore {
    async fn exists(&self, card_id: &CardId) -> Result<bool, StoreError> {
        let pool = self.pool.clone();
        let id = card_id.0.clone();
        let count: i64 = self
            .with_retry("exists", move || {
                let pool = pool.clone();
                let id = id.clone();
                async move {
                    sqlx::query_scalar("SELECT COUNT(*) FROM tracked_cards WHERE card_id = ?1")
                        .bind(id)
                        .fetch_one(&pool)
                        .await
                }
            })
            .await?;
        Ok(count > 0)
    }

    async fn insert(&self, card: &TrackedCard) -> Result<InsertOutcome, StoreError> {
        let pool = self.pool.clone();
        let card = card.clone();
        let result = self
            .with_retry("insert", move || {
                let pool = pool.clone();
                let card = card.clone();
                async move {
                    sqlx::query(
                        r#"
                        INSERT INTO tracked_cards (
                            card_id, name, rating, status, club, position, nation,
                            first_detected_at, last_seen_on_source_at, last_checked_at,
                            consecutive_missing, alert_sent
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                        ON CONFLICT(card_id) DO NOTHING
                        "#,
                    )
                    .bind(card.card_id.0)
                    .bind(card.name)
                    .bind(card.rating)
                    .bind(card.status.as_str())
                    .bind(card.club)
                    .bind(card.position)
                    .bind(card.nation)
                    .bind(card.first_detected_at)
                    .bind(card.last_seen_on_source_at)
                    .bind(card.last_checked_at)
                    .bind(card.consecutive_missing)
                    .bind(card.alert_sent)
                    .execute(&pool)
                    .await
                }
            })
            .await?;

        if result.rows_affected() == 0 {
            Ok(InsertOutcome::AlreadyExists)
        } else {
            Ok(InsertOutcome::Inserted)
        }
    }

    async fn mark_alert_sent(&self, card_id: &CardId) -> Result<(), StoreError> {
        let pool = self.pool.clone();
        let id = card_id.0.clone();
        self.with_retry("mark_alert_sent", move || {
            let pool = pool.clone();
            let id = id.clone();
            async move {
                sqlx::query("UPDATE tracked_cards SET alert_sent = 1 WHERE card_id = ?1")
                    .bind(id)
                    .execute(&pool)
                    .await
                    .map(|_| ())
            }
        })
        .await
    }

    async fn mark_seen(&self, card_ids: &HashSet<CardId>) -> Result<(), StoreError> {
        if card_ids.is_empty() {
            return Ok(());
        }
        let pool = self.pool.clone();
        let ids: Vec<String> = card_ids.iter().map(|id| id.0.clone()).collect();
        self.with_retry("mark_seen", move || {
            let pool = pool.clone();
            let ids = ids.clone();
            async move {
                let now = Utc::now();
                let mut tx = pool.begin().await?;
                for id in &ids {
                    sqlx::query(
                        "UPDATE tracked_cards \
                         SET last_seen_on_source_at = ?1, consecutive_missing = 0 \
                         WHERE card_id = ?2",
                    )
                    .bind(now)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                }
                tx.commit().await
            }
        })
        .await
    }

    async fn increment_missing(&self, card_id: &CardId) -> Result<i64, StoreError> {
        let pool = self.pool.clone();
        let id = card_id.0.clone();
        let count: Option<i64> = self
            .with_retry("increment_missing", move || {
                let pool = pool.clone();
                let id = id.clone();
                async move {
                    sqlx::query_scalar(
                        "UPDATE tracked_cards \
                         SET consecutive_missing = consecutive_missing + 1, last_checked_at = ?1 \
                         WHERE card_id = ?2 \
                         RETURNING consecutive_missing",
                    )
                    .bind(Utc::now())
                    .bind(id)
                    .fetch_optional(&pool)
                    .await
                }
            })
            .await?;

        if count.is_none() {
            tracing::warn!(card_id = %card_id, "increment_missing on untracked card");
        }
        Ok(count.unwrap_or(0))
    }

    async fn touch_checked(&self, card_id: &CardId) -> Result<(), StoreError> {
        let pool = self.pool.clone();
        let id = card_id.0.clone();
        self.with_retry("touch_checked", move || {
            let pool = pool.clone();
            let id = id.clone();
            async move {
                sqlx::query("UPDATE tracked_cards SET last_checked_at = ?1 WHERE card_id = ?2")
                    .bind(Utc::now())
                    .bind(id)
                    .execute(&pool)
                    .await
                    .map(|_| ())
            }
        })
        .await
    }

    async fn list_eligible_for_reconciliation(
        &self,
        min_age_seconds: i64,
    ) -> Result<Vec<TrackedCard>, StoreError> {
        let pool = self.pool.clone();
        let cutoff: DateTime<Utc> = Utc::now() - chrono::Duration::seconds(min_age_seconds);
        let rows = self
            .with_retry("list_eligible_for_reconciliation", move || {
                let pool = pool.clone();
                async move {
                    sqlx::query(&format!(
                        "SELECT {CARD_COLUMNS} FROM tracked_cards \
                         WHERE first_detected_at <= ?1 \
                         ORDER BY rating DESC, last_checked_at ASC, card_id ASC"
                    ))
                    .bind(cutoff)
                    .fetch_all(&pool)
                    .await
                }
            })
            .await?;
        Ok(rows.into_iter().map(map_card).collect())
    }

    async fn remove(&self, card_id: &CardId) -> Result<bool, StoreError> {
        let pool = self.pool.clone();
        let id = card_id.0.clone();
        let result = self
            .with_retry("remove", move || {
                let pool = pool.clone();
                let id = id.clone();
                async move {
                    sqlx::query("DELETE FROM tracked_cards WHERE card_id = ?1")
                        .bind(id)
                        .execute(&pool)
                        .await
                }
            })
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_all(&self) -> Result<Vec<TrackedCard>, StoreError> {
        let pool = self.pool.clone();
        let rows = self
            .with_retry("list_all", move || {
                let pool = pool.clone();
                async move {
                    sqlx::query(&format!(
                        "SELECT {CARD_COLUMNS} FROM tracked_cards \
                         ORDER BY rating DESC, name ASC"
                    ))
                    .fetch_all(&pool)
                    .await
                }
            })
            .await?;
        Ok(rows.into_iter().map(map_card).collect())
    }

    async fn count(&self) -> Result<i64, StoreError> {
        let pool = self.pool.clone();
        self.with_retry("count", move || {
            let pool = pool.clone();
            async move {
                sqlx::query_scalar("SELECT COUNT(*) FROM tracked_cards")
                    .fetch_one(&pool)
                    .await
            }
        })
        .await
    }

    async fn acquire_startup_lock(&self, instance_id: &str) -> Result<bool, StoreError> {
        let pool = self.pool.clone();
        let instance_id = instance_id.to_string();
        let result = self
            .with_retry("acquire_startup_lock", move || {
                let pool = pool.clone();
                let instance_id = instance_id.clone();
                async move {
                    sqlx::query(
                        "INSERT INTO startup_locks (instance_id, started_at) VALUES (?1, ?2) \
                         ON CONFLICT(instance_id) DO NOTHING",
                    )
                    .bind(instance_id)
                    .bind(Utc::now())
                    .execute(&pool)
                    .await
                }
            })
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
