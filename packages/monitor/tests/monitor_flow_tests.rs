//! End-to-end discovery and reconciliation flows over the real SQLite store.

use std::sync::Arc;

use chrono::{Duration, Utc};
use monitor::testing::{RecordingSink, ScriptedGateway};
use monitor::types::{CardCandidate, CardId, ExtinctionSignal};
use monitor::{
    AlertCategory, CardStore, DiscoveryEngine, MonitorConfig, ReconciliationEngine,
    SqliteCardStore,
};
use sqlx::sqlite::SqlitePoolOptions;

async fn memory_store() -> Arc<SqliteCardStore> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    Arc::new(SqliteCardStore::new(pool))
}

fn candidate(id: &str, name: &str, rating: i64) -> CardCandidate {
    CardCandidate {
        card_id: CardId::new(id),
        name: name.to_string(),
        rating,
    }
}

async fn backdate(store: &SqliteCardStore, id: &str, minutes: i64) {
    sqlx::query("UPDATE tracked_cards SET first_detected_at = ?1 WHERE card_id = ?2")
        .bind(Utc::now() - Duration::minutes(minutes))
        .bind(id)
        .execute(store.pool())
        .await
        .expect("Failed to backdate card");
}

#[tokio::test]
async fn discovered_card_survives_two_misses_and_returns_on_the_third() {
    let store = memory_store().await;
    let sink = Arc::new(RecordingSink::new());

    // Discovery: one card on page 1, then the listing ends.
    let discovery_gateway = Arc::new(
        ScriptedGateway::new().with_page(vec![candidate("u1", "Mbappe", 91)]),
    );
    let discovery = DiscoveryEngine::new(
        discovery_gateway,
        Arc::clone(&store),
        Arc::clone(&sink),
        MonitorConfig::default(),
    );

    assert_eq!(discovery.discover().await.unwrap(), 1);
    assert_eq!(sink.messages_for(AlertCategory::Extinction).len(), 1);

    // Old enough to reconcile.
    backdate(&store, "u1", 31).await;

    // Reconciliation: the card has vanished from the listing and the probe
    // confirms it is purchasable again.
    let reconcile_gateway = Arc::new(
        ScriptedGateway::new().with_status(CardId::new("u1"), ExtinctionSignal::Available),
    );
    let reconcile = ReconciliationEngine::new(
        reconcile_gateway,
        Arc::clone(&store),
        Arc::clone(&sink),
        MonitorConfig::default(),
    );

    // Two misses: still tracked.
    for _ in 0..2 {
        let outcome = reconcile.reconcile().await.unwrap();
        assert_eq!(outcome.confirmed_returned, 0);
        assert!(store.exists(&CardId::new("u1")).await.unwrap());
    }

    // Third miss: removed, exactly one availability alert.
    let outcome = reconcile.reconcile().await.unwrap();
    assert_eq!(outcome.confirmed_returned, 1);
    assert!(!store.exists(&CardId::new("u1")).await.unwrap());

    let alerts = sink.messages_for(AlertCategory::Availability);
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].contains("Mbappe"));
    assert!(alerts[0].contains("91"));

    // A later reconciliation has nothing left to do.
    let outcome = reconcile.reconcile().await.unwrap();
    assert_eq!(outcome.confirmed_returned, 0);
    assert_eq!(sink.messages_for(AlertCategory::Availability).len(), 1);
}

#[tokio::test]
async fn rediscovery_after_removal_starts_a_fresh_history() {
    let store = memory_store().await;
    let sink = Arc::new(RecordingSink::new());

    let gateway = Arc::new(ScriptedGateway::new().with_page(vec![candidate("u1", "Mbappe", 91)]));
    let discovery = DiscoveryEngine::new(
        Arc::clone(&gateway),
        Arc::clone(&store),
        Arc::clone(&sink),
        MonitorConfig::default(),
    );
    discovery.discover().await.unwrap();
    backdate(&store, "u1", 31).await;

    let reconcile_gateway = Arc::new(
        ScriptedGateway::new().with_status(CardId::new("u1"), ExtinctionSignal::Available),
    );
    let reconcile = ReconciliationEngine::new(
        reconcile_gateway,
        Arc::clone(&store),
        Arc::clone(&sink),
        MonitorConfig::default(),
    );
    for _ in 0..3 {
        reconcile.reconcile().await.unwrap();
    }
    assert!(!store.exists(&CardId::new("u1")).await.unwrap());

    // The card goes extinct again: rediscovery inserts a fresh row with a
    // clean miss history and its own discovery alert.
    assert_eq!(discovery.discover().await.unwrap(), 1);
    let all = store.list_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].consecutive_missing, 0);
    assert_eq!(sink.messages_for(AlertCategory::Extinction).len(), 2);
}
