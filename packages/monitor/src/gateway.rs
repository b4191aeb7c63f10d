use crate::error::FetchError;
use crate::types::{CardCandidate, CardEnrichment, CardId, ExtinctionSignal};

/// Read-only view of the source marketplace (to allow mocking).
///
/// Implementations own all site-specific concerns: endpoint shapes, headers,
/// user-agent rotation, timeouts, and block detection. The engines only see
/// candidate tuples and tri-state extinction signals.
#[async_trait::async_trait]
pub trait SourceGateway: Send + Sync {
    /// One page of the current extinct listing. Where the source supports
    /// server-side filtering the implementation applies `min_rating` there;
    /// otherwise it filters before returning.
    async fn fetch_extinct_page(
        &self,
        page: u32,
        min_rating: i64,
    ) -> Result<Vec<CardCandidate>, FetchError>;

    /// Probe the live status of a single card.
    async fn fetch_entity_status(&self, card_id: &CardId) -> Result<ExtinctionSignal, FetchError>;

    /// Best-effort detail fetch. Failures only cost the optional fields.
    async fn fetch_enrichment(&self, card_id: &CardId) -> Result<CardEnrichment, FetchError>;
}
