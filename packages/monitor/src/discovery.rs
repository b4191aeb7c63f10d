use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::config::MonitorConfig;
use crate::error::{FetchError, MonitorError};
use crate::gateway::SourceGateway;
use crate::notify::{self, AlertCategory, NotificationSink};
use crate::store::{CardStore, InsertOutcome};
use crate::types::{CardCandidate, CardEnrichment, CardId, TrackedCard};

/// Crawls the extinct listing, filters candidates, and registers newly
/// discovered cards, emitting one discovery alert per successful insert.
pub struct DiscoveryEngine<G, S, N> {
    gateway: Arc<G>,
    store: Arc<S>,
    sink: Arc<N>,
    config: MonitorConfig,
}

impl<G, S, N> Clone for DiscoveryEngine<G, S, N> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            store: Arc::clone(&self.store),
            sink: Arc::clone(&self.sink),
            config: self.config.clone(),
        }
    }
}

impl<G, S, N> DiscoveryEngine<G, S, N>
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

    /// One discovery cycle. Returns the number of newly inserted cards.
    pub async fn discover(&self) -> Result<usize, MonitorError> {
        let candidates = self.crawl_listing().await?;
        let collected = candidates.len();

        // Batch-then-filter: a transfer duplicate's twin may only show up on
        // a later page, so the group filter has to see the whole crawl.
        let survivors = filter_transfer_duplicates(candidates);
        tracing::debug!(
            collected,
            survivors = survivors.len(),
            "duplicate group filter applied"
        );

        let mut inserted = 0usize;
        for candidate in survivors {
            if candidate.rating < self.config.min_rating {
                continue;
            }
            if self.store.exists(&candidate.card_id).await? {
                continue;
            }

            let enrichment = match self.gateway.fetch_enrichment(&candidate.card_id).await {
                Ok(enrichment) => enrichment,
                Err(err) => {
                    tracing::debug!(
                        card_id = %candidate.card_id,
                        error = %err,
                        "enrichment fetch failed, inserting without detail"
                    );
                    CardEnrichment::default()
                }
            };

            let card = TrackedCard::new(candidate, enrichment);
            match self.store.insert(&card).await? {
                InsertOutcome::AlreadyExists => continue,
                InsertOutcome::Inserted => {
                    inserted += 1;
                    tracing::info!(
                        card_id = %card.card_id,
                        name = %card.name,
                        rating = card.rating,
                        "tracking newly extinct card"
                    );
                    self.sink
                        .send(&notify::discovery_alert(&card), AlertCategory::Extinction)
                        .await;
                    self.store.mark_alert_sent(&card.card_id).await?;
                }
            }
        }

        tracing::info!(inserted, "discovery cycle complete");
        Ok(inserted)
    }

    /// Sequential page crawl. Stops on three consecutive empty pages (end of
    /// listing), on ten consecutive pages without a not-already-known
    /// candidate (saturation), or at the hard page cap. A failed page fetch
    /// is logged and counts like an empty page; a block aborts the cycle.
    async fn crawl_listing(&self) -> Result<Vec<CardCandidate>, MonitorError> {
        let mut candidates: Vec<CardCandidate> = Vec::new();
        let mut collected_ids: HashSet<CardId> = HashSet::new();
        let mut consecutive_empty = 0u32;
        let mut consecutive_stale = 0u32;
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
                consecutive_stale += 1;
                if consecutive_empty >= self.config.empty_page_streak {
                    tracing::debug!(page, "end of listing reached");
                    break;
                }
                if consecutive_stale >= self.config.stale_page_streak {
                    tracing::debug!(page, "listing saturated, stopping crawl");
                    break;
                }
                page += 1;
                continue;
            }
            consecutive_empty = 0;

            let mut fresh = 0usize;
            for candidate in batch {
                if !collected_ids.insert(candidate.card_id.clone()) {
                    continue;
                }
                if !self.store.exists(&candidate.card_id).await? {
                    fresh += 1;
                }
                candidates.push(candidate);
            }

            if fresh == 0 {
                consecutive_stale += 1;
                if consecutive_stale >= self.config.stale_page_streak {
                    tracing::debug!(page, "listing saturated, stopping crawl");
                    break;
                }
            } else {
                consecutive_stale = 0;
            }
            page += 1;
        }

        tracing::debug!(
            pages = page.min(self.config.max_pages),
            candidates = candidates.len(),
            "listing crawl finished"
        );
        Ok(candidates)
    }
}

/// Drop every (name, rating) group that maps to more than one distinct
/// identifier. Two identifiers sharing name and rating usually mean the same
/// player listed under a stale pre-transfer record and its replacement, and
/// the source gives no reliable way to pick the live one.
pub(crate) fn filter_transfer_duplicates(candidates: Vec<CardCandidate>) -> Vec<CardCandidate> {
    // Callers pass identifier-deduplicated candidates, so group size equals
    // the number of distinct identifiers.
    let mut group_sizes: HashMap<(String, i64), usize> = HashMap::new();
    for candidate in &candidates {
        *group_sizes
            .entry((candidate.name.clone(), candidate.rating))
            .or_insert(0) += 1;
    }

    candidates
        .into_iter()
        .filter(|candidate| group_sizes[&(candidate.name.clone(), candidate.rating)] == 1)
        .collect()
}
