//! Integration tests for the SQLite card store against an in-memory database.

use std::collections::HashSet;

use chrono::{Duration, Utc};
use monitor::store::{CardStore, InsertOutcome, SqliteCardStore};
use monitor::types::{CardCandidate, CardEnrichment, CardId, TrackedCard};
use sqlx::sqlite::SqlitePoolOptions;

async fn memory_store() -> SqliteCardStore {
    // A single connection keeps every query on the same in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    SqliteCardStore::new(pool)
}

fn card(id: &str, name: &str, rating: i64) -> TrackedCard {
    TrackedCard::new(
        CardCandidate {
            card_id: CardId::new(id),
            name: name.to_string(),
            rating,
        },
        CardEnrichment {
            club: Some("Some Club FC".to_string()),
            position: Some("ST".to_string()),
            nation: None,
        },
    )
}

fn aged(mut card: TrackedCard, age_seconds: i64) -> TrackedCard {
    card.first_detected_at = Utc::now() - Duration::seconds(age_seconds);
    card.last_seen_on_source_at = card.first_detected_at;
    card
}

#[tokio::test]
async fn insert_is_idempotent_on_identifier() {
    let store = memory_store().await;
    let mbappe = card("u1", "Mbappe", 91);

    assert_eq!(store.insert(&mbappe).await.unwrap(), InsertOutcome::Inserted);
    assert_eq!(
        store.insert(&mbappe).await.unwrap(),
        InsertOutcome::AlreadyExists
    );
    assert_eq!(store.count().await.unwrap(), 1);
    assert!(store.exists(&CardId::new("u1")).await.unwrap());
}

#[tokio::test]
async fn round_trip_preserves_the_snapshot() {
    let store = memory_store().await;
    store.insert(&card("u1", "Mbappe", 91)).await.unwrap();

    let all = store.list_all().await.unwrap();
    assert_eq!(all.len(), 1);
    let loaded = &all[0];
    assert_eq!(loaded.card_id, CardId::new("u1"));
    assert_eq!(loaded.name, "Mbappe");
    assert_eq!(loaded.rating, 91);
    assert_eq!(loaded.club.as_deref(), Some("Some Club FC"));
    assert_eq!(loaded.position.as_deref(), Some("ST"));
    assert_eq!(loaded.consecutive_missing, 0);
    assert!(!loaded.alert_sent);
    assert!(loaded.last_checked_at.is_none());
}

#[tokio::test]
async fn increment_missing_counts_up_and_mark_seen_resets() {
    let store = memory_store().await;
    store.insert(&card("u1", "Mbappe", 91)).await.unwrap();

    assert_eq!(store.increment_missing(&CardId::new("u1")).await.unwrap(), 1);
    assert_eq!(store.increment_missing(&CardId::new("u1")).await.unwrap(), 2);

    let mut seen = HashSet::new();
    seen.insert(CardId::new("u1"));
    store.mark_seen(&seen).await.unwrap();

    let all = store.list_all().await.unwrap();
    assert_eq!(all[0].consecutive_missing, 0);
    assert!(all[0].last_checked_at.is_some());
}

#[tokio::test]
async fn mark_seen_ignores_untracked_identifiers() {
    let store = memory_store().await;
    store.insert(&card("u1", "Mbappe", 91)).await.unwrap();

    let mut seen = HashSet::new();
    seen.insert(CardId::new("u1"));
    seen.insert(CardId::new("unknown"));
    store.mark_seen(&seen).await.unwrap();

    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn grace_period_gates_reconciliation_eligibility() {
    let store = memory_store().await;

    // Fresh card: not eligible.
    store.insert(&card("fresh", "Fresh", 90)).await.unwrap();
    // Just under the boundary: not eligible.
    store
        .insert(&aged(card("young", "Young", 90), 1700))
        .await
        .unwrap();
    // Past the boundary: eligible.
    store
        .insert(&aged(card("old", "Old", 90), 1800))
        .await
        .unwrap();

    let eligible = store.list_eligible_for_reconciliation(1800).await.unwrap();
    let ids: Vec<&str> = eligible.iter().map(|c| c.card_id.as_str()).collect();
    assert_eq!(ids, vec!["old"]);
}

#[tokio::test]
async fn eligibility_orders_by_rating_then_staleness_then_id() {
    let store = memory_store().await;

    store
        .insert(&aged(card("b", "Beta", 90), 3600))
        .await
        .unwrap();
    store
        .insert(&aged(card("a", "Alpha", 90), 3600))
        .await
        .unwrap();
    store
        .insert(&aged(card("c", "Gamma", 93), 3600))
        .await
        .unwrap();

    // A card that was probed recently sorts after never-probed peers.
    store.touch_checked(&CardId::new("a")).await.unwrap();

    let eligible = store.list_eligible_for_reconciliation(1800).await.unwrap();
    let ids: Vec<&str> = eligible.iter().map(|c| c.card_id.as_str()).collect();
    assert_eq!(ids, vec!["c", "b", "a"]);
}

#[tokio::test]
async fn remove_reports_whether_a_row_was_deleted() {
    let store = memory_store().await;
    store.insert(&card("u1", "Mbappe", 91)).await.unwrap();

    assert!(store.remove(&CardId::new("u1")).await.unwrap());
    assert!(!store.remove(&CardId::new("u1")).await.unwrap());
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn list_all_orders_by_rating_then_name() {
    let store = memory_store().await;
    store.insert(&card("u1", "Zidane", 91)).await.unwrap();
    store.insert(&card("u2", "Asensio", 85)).await.unwrap();
    store.insert(&card("u3", "Modric", 91)).await.unwrap();

    let all = store.list_all().await.unwrap();
    let names: Vec<&str> = all.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Modric", "Zidane", "Asensio"]);
}

#[tokio::test]
async fn alert_flag_is_persisted() {
    let store = memory_store().await;
    store.insert(&card("u1", "Mbappe", 91)).await.unwrap();
    store.mark_alert_sent(&CardId::new("u1")).await.unwrap();

    let all = store.list_all().await.unwrap();
    assert!(all[0].alert_sent);
}

#[tokio::test]
async fn startup_lock_is_won_exactly_once_per_instance_id() {
    let store = memory_store().await;

    assert!(store.acquire_startup_lock("instance-a").await.unwrap());
    assert!(!store.acquire_startup_lock("instance-a").await.unwrap());
    assert!(store.acquire_startup_lock("instance-b").await.unwrap());
}
