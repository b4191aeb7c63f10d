//! In-memory collaborators for unit and integration tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use chrono::Utc;

use crate::error::{FetchError, StoreError};
use crate::gateway::SourceGateway;
use crate::notify::{AlertCategory, NotificationSink};
use crate::store::{CardStore, InsertOutcome};
use crate::types::{CardCandidate, CardEnrichment, CardId, ExtinctionSignal, TrackedCard};

/// Scripted source: page N returns the Nth configured batch, everything
/// beyond the script is an empty page.
#[derive(Default)]
pub struct ScriptedGateway {
    pages: Vec<Vec<CardCandidate>>,
    statuses: Mutex<HashMap<CardId, ExtinctionSignal>>,
    enrichments: Mutex<HashMap<CardId, CardEnrichment>>,
    fail_enrichment: bool,
    fetches: AtomicU32,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, candidates: Vec<CardCandidate>) -> Self {
        self.pages.push(candidates);
        self
    }

    pub fn with_status(self, card_id: CardId, signal: ExtinctionSignal) -> Self {
        self.statuses.lock().unwrap().insert(card_id, signal);
        self
    }

    pub fn with_enrichment(self, card_id: CardId, enrichment: CardEnrichment) -> Self {
        self.enrichments.lock().unwrap().insert(card_id, enrichment);
        self
    }

    pub fn failing_enrichment(mut self) -> Self {
        self.fail_enrichment = true;
        self
    }

    pub fn pages_fetched(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SourceGateway for ScriptedGateway {
    async fn fetch_extinct_page(
        &self,
        page: u32,
        min_rating: i64,
    ) -> Result<Vec<CardCandidate>, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let batch = self
            .pages
            .get((page - 1) as usize)
            .cloned()
            .unwrap_or_default();
        Ok(batch
            .into_iter()
            .filter(|candidate| candidate.rating >= min_rating)
            .collect())
    }

    async fn fetch_entity_status(&self, card_id: &CardId) -> Result<ExtinctionSignal, FetchError> {
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .get(card_id)
            .copied()
            .unwrap_or(ExtinctionSignal::Uncertain))
    }

    async fn fetch_enrichment(&self, card_id: &CardId) -> Result<CardEnrichment, FetchError> {
        if self.fail_enrichment {
            return Err(FetchError::Timeout);
        }
        Ok(self
            .enrichments
            .lock()
            .unwrap()
            .get(card_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Hash map backed card store with the same visible semantics as the SQLite
/// implementation.
#[derive(Default)]
pub struct MemoryCardStore {
    cards: Mutex<HashMap<CardId, TrackedCard>>,
    locks: Mutex<HashSet<String>>,
}

impl MemoryCardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert directly, bypassing the trait. Lets tests plant rows with
    /// backdated timestamps.
    pub fn seed(&self, card: TrackedCard) {
        self.cards
            .lock()
            .unwrap()
            .insert(card.card_id.clone(), card);
    }

    pub fn get(&self, card_id: &CardId) -> Option<TrackedCard> {
        self.cards.lock().unwrap().get(card_id).cloned()
    }
}

#[async_trait::async_trait]
impl CardStore for MemoryCardStore {
    async fn exists(&self, card_id: &CardId) -> Result<bool, StoreError> {
        Ok(self.cards.lock().unwrap().contains_key(card_id))
    }

    async fn insert(&self, card: &TrackedCard) -> Result<InsertOutcome, StoreError> {
        let mut cards = self.cards.lock().unwrap();
        if cards.contains_key(&card.card_id) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        cards.insert(card.card_id.clone(), card.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn mark_alert_sent(&self, card_id: &CardId) -> Result<(), StoreError> {
        if let Some(card) = self.cards.lock().unwrap().get_mut(card_id) {
            card.alert_sent = true;
        }
        Ok(())
    }

    async fn mark_seen(&self, card_ids: &HashSet<CardId>) -> Result<(), StoreError> {
        let now = Utc::now();
        let mut cards = self.cards.lock().unwrap();
        for (card_id, card) in cards.iter_mut() {
            if card_ids.contains(card_id) {
                card.last_seen_on_source_at = now;
                card.consecutive_missing = 0;
            }
        }
        Ok(())
    }

    async fn increment_missing(&self, card_id: &CardId) -> Result<i64, StoreError> {
        let mut cards = self.cards.lock().unwrap();
        match cards.get_mut(card_id) {
            Some(card) => {
                card.consecutive_missing += 1;
                card.last_checked_at = Some(Utc::now());
                Ok(card.consecutive_missing)
            }
            None => Ok(0),
        }
    }

    async fn touch_checked(&self, card_id: &CardId) -> Result<(), StoreError> {
        if let Some(card) = self.cards.lock().unwrap().get_mut(card_id) {
            card.last_checked_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn list_eligible_for_reconciliation(
        &self,
        min_age_seconds: i64,
    ) -> Result<Vec<TrackedCard>, StoreError> {
        let cutoff = Utc::now() - chrono::Duration::seconds(min_age_seconds);
        let mut eligible: Vec<TrackedCard> = self
            .cards
            .lock()
            .unwrap()
            .values()
            .filter(|card| card.first_detected_at <= cutoff)
            .cloned()
            .collect();
        eligible.sort_by(|a, b| {
            b.rating
                .cmp(&a.rating)
                .then_with(|| match (a.last_checked_at, b.last_checked_at) {
                    (None, None) => std::cmp::Ordering::Equal,
                    (None, Some(_)) => std::cmp::Ordering::Less,
                    (Some(_), None) => std::cmp::Ordering::Greater,
                    (Some(x), Some(y)) => x.cmp(&y),
                })
                .then_with(|| a.card_id.cmp(&b.card_id))
        });
        Ok(eligible)
    }

    async fn remove(&self, card_id: &CardId) -> Result<bool, StoreError> {
        Ok(self.cards.lock().unwrap().remove(card_id).is_some())
    }

    async fn list_all(&self) -> Result<Vec<TrackedCard>, StoreError> {
        let mut all: Vec<TrackedCard> = self.cards.lock().unwrap().values().cloned().collect();
        all.sort_by(|a, b| b.rating.cmp(&a.rating).then_with(|| a.name.cmp(&b.name)));
        Ok(all)
    }

    async fn count(&self) -> Result<i64, StoreError> {
        Ok(self.cards.lock().unwrap().len() as i64)
    }

    async fn acquire_startup_lock(&self, instance_id: &str) -> Result<bool, StoreError> {
        Ok(self.locks.lock().unwrap().insert(instance_id.to_string()))
    }
}

/// Sink that records every message for later assertion.
#[derive(Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<(AlertCategory, String)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(AlertCategory, String)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn messages_for(&self, category: AlertCategory) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == category)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl NotificationSink for RecordingSink {
    async fn send(&self, message: &str, category: AlertCategory) {
        self.messages
            .lock()
            .unwrap()
            .push((category, message.to_string()));
    }
}
