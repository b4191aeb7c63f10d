use std::collections::HashSet;

use crate::error::StoreError;
use crate::types::{CardId, TrackedCard};

pub mod sqlite;
pub use sqlite::SqliteCardStore;

/// Outcome of an insert attempt. A conflict on the identifier is a normal
/// result, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}

/// Durable keyed storage for tracked cards (to allow mocking).
///
/// The store is the only shared mutable resource between the discovery and
/// reconciliation loops. Every operation touches rows by their own key, so
/// row-level atomicity (the unique identifier constraint plus single-row
/// updates) is all the consistency the engines rely on.
#[async_trait::async_trait]
pub trait CardStore: Send + Sync {
    async fn exists(&self, card_id: &CardId) -> Result<bool, StoreError>;

    /// Atomic insert keyed by `card_id`. Concurrent callers cannot create
    /// duplicate rows; the loser observes `AlreadyExists`.
    async fn insert(&self, card: &TrackedCard) -> Result<InsertOutcome, StoreError>;

    /// Record that the discovery alert for this card has been handed to the
    /// notification sink.
    async fn mark_alert_sent(&self, card_id: &CardId) -> Result<(), StoreError>;

    /// For every tracked row whose identifier is in the set: stamp
    /// `last_seen_on_source_at` and reset the miss counter.
    async fn mark_seen(&self, card_ids: &HashSet<CardId>) -> Result<(), StoreError>;

    /// Bump the consecutive miss counter and stamp `last_checked_at`.
    /// Returns the new count.
    async fn increment_missing(&self, card_id: &CardId) -> Result<i64, StoreError>;

    /// Stamp `last_checked_at` only. Used for probes that answered
    /// "uncertain" and must not advance the counter.
    async fn touch_checked(&self, card_id: &CardId) -> Result<(), StoreError>;

    /// Tracked cards old enough to reconcile (the boundary is inclusive),
    /// ordered by rating descending, then least recently checked, with ties
    /// broken by identifier so iteration order is reproducible.
    async fn list_eligible_for_reconciliation(
        &self,
        min_age_seconds: i64,
    ) -> Result<Vec<TrackedCard>, StoreError>;

    /// Returns true when a row was actually deleted.
    async fn remove(&self, card_id: &CardId) -> Result<bool, StoreError>;

    /// Full tracked set, rating descending then name ascending.
    async fn list_all(&self) -> Result<Vec<TrackedCard>, StoreError>;

    async fn count(&self) -> Result<i64, StoreError>;

    /// Insert-or-fail on a process-instance key. Returns true for the one
    /// caller that won the row.
    async fn acquire_startup_lock(&self, instance_id: &str) -> Result<bool, StoreError>;
}
