use std::collections::HashSet;
use std::sync::Arc;

use crate::config::MonitorConfig;
use crate::error::{FetchError, MonitorError};
use crate::gateway::SourceGateway;
use crate::notify::{self, AlertCategory, NotificationSink};
use crate::store::CardStore;
use crate::types::{CardId, ExtinctionSignal};

/// Counts for one reconciliation cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub confirmed_returned: usize,
    pub still_extinct: usize,
}

/// Periodically re-scans the live listing and applies the hysteresis policy
/// before declaring a tracked card back in market.
///
/// A single listing miss is never trusted: the card must be absent for three
/// consecutive cycles, each absence confirmed by an individual status probe,
/// before the row is removed and the availability alert fires. This absorbs
/// single-cycle scrape flakiness (network errors, partial renders,
/// pagination races) without misreporting availability.
pub struct ReconciliationEngine<G, S, N> {
    gateway: Arc<G>,
    store: Arc<S>,
    sink: Arc<N>,
    config: MonitorConfig,
}

impl<G, S, N> Clone for ReconciliationEngine<G, S, N> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            store: Arc::clone(&self.store),
            sink: Arc::clone(&self.sink),
            config: self.config.clone(),
        }
    }
}

impl<G, S, N> ReconciliationEngine<G, S, N>
where
    G: SourceGateway,
    S: CardStore,
    N: NotificationSink,
{
    pub fn new(gateway: Arc<G>, store: Arc<S>, sink: Arc<N>, config: MonitorConfig) -> Self {
        Self {
            gateway,
            store,
            sink,
            config,
        }
    }

    /// One reconciliation cycle. The mark-seen pass always completes before
    /// any miss counter is advanced.
    pub async fn reconcile(&self) -> Result<ReconcileOutcome, MonitorError> {
        let current = self.crawl_current_listing().await?;
        self.store.mark_seen(&current).await?;

        let eligible = self
            .store
            .list_eligible_for_reconciliation(self.config.grace_period_seconds)
            .await?;

        let mut outcome = ReconcileOutcome::default();
        for card in eligible {
            if current.contains(&card.card_id) {
                outcome.still_extinct += 1;
                continue;
            }

            let signal = match self.gateway.fetch_entity_status(&card.card_id).await {
                Ok(signal) => signal,
                Err(err @ FetchError::Blocked { .. }) => return Err(err.into()),
                Err(err) => {
                    tracing::warn!(
                        card_id = %card.card_id,
                        error = %err,
                        "status probe failed, leaving card unchanged"
                    );
                    ExtinctionSignal::Uncertain
                }
            };

            match signal {
                ExtinctionSignal::Extinct => {
                    // The listing missed a card that is demonstrably still
                    // extinct (pagination race). Counts as seen.
                    let mut single = HashSet::new();
                    single.insert(card.card_id.clone());
                    self.store.mark_seen(&single).await?;
                    self.store.touch_checked(&card.card_id).await?;
                    outcome.still_extinct += 1;
                }
                ExtinctionSignal::Uncertain => {
                    self.store.touch_checked(&card.card_id).await?;
                    outcome.still_extinct += 1;
                }
                ExtinctionSignal::Available => {
                    let missing = self.store.increment_missing(&card.card_id).await?;
                    if missing >= self.config.miss_confirmation_threshold {
                        // Confirmed return: remove first, so a dead sink can
                        // never re-lock the card in tracked state.
                        if self.store.remove(&card.card_id).await? {
                            tracing::info!(
                                card_id = %card.card_id,
                                name = %card.name,
                                misses = missing,
                                "card confirmed back in market"
                            );
                            self.sink
                                .send(
                                    &notify::availability_alert(&card),
                                    AlertCategory::Availability,
                                )
                                .await;
                            outcome.confirmed_returned += 1;
                        }
                    } else {
                        tracing::debug!(
                            card_id = %card.card_id,
                            misses = missing,
                            "still extinct, below confirmation threshold"
                        );
                        outcome.still_extinct += 1;
                    }
                }
            }
        }

        tracing::info!(
            confirmed_returned = outcome.confirmed_returned,
            still_extinct = outcome.still_extinct,
            "reconciliation cycle complete"
        );
        Ok(outcome)
    }

    /// Emit the digest over the full tracked set, grouped by rating
    /// descending and chunked to the channel limit.
    pub async fn send_digest(&self) -> Result<(), MonitorError> {
        let cards = self.store.list_all().await?;
        for message in notify::digest_messages(&cards) {
            self.sink.send(&message, AlertCategory::Digest).await;
        }
        tracing::info!(tracked = cards.len(), "digest sent");
        Ok(())
    }

    /// Independent re-crawl of the current extinct listing. Deliberately
    /// shares no state with the discovery crawl; it only needs the
    /// end-of-listing and page-cap stop conditions, because every page of
    /// already-known cards still has to be collected as "seen".
    async fn crawl_current_listing(&self) -> Result<HashSet<CardId>, MonitorError> {
        let mut current = HashSet::new();
        let mut consecutive_empty = 0u32;
        let mut page = 1u32;

        while page <= self.config.max_pages {
            let batch = match self
                .gateway
                .fetch_extinct_page(page, self.config.min_rating)
                .await
            {
                Ok(batch) => batch,
                Err(err @ FetchError::Blocked { .. }) => return Err(err.into()),
                Err(err) => {
                    tracing::warn!(page, error = %err, "page fetch failed, treating as empty");
                    Vec::new()
                }
            };

            if batch.is_empty() {
                consecutive_empty += 1;
                if consecutive_empty >= self.config.empty_page_streak {
                    break;
                }
            } else {
                consecutive_empty = 0;
                current.extend(batch.into_iter().map(|candidate| candidate.card_id));
            }
            page += 1;
        }

        tracing::debug!(listed = current.len(), "current extinct listing collected");
        Ok(current)
    }
}
