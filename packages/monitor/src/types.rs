use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable external key for a card on the source marketplace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CardId(pub String);

impl CardId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Card lifecycle status as reported by the source.
///
/// `Available` is a terminal signal: a confirmed return to market deletes the
/// row, so it is never persisted as a resting state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardStatus {
    Extinct,
    Available,
}

impl CardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardStatus::Extinct => "extinct",
            CardStatus::Available => "available",
        }
    }
}

/// Raw extinction signal from a single status probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtinctionSignal {
    Extinct,
    Available,
    /// The probe could not produce a trustworthy answer. Treated as "no
    /// change": never advances the miss counter, never triggers an alert.
    Uncertain,
}

/// One candidate from a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardCandidate {
    pub card_id: CardId,
    pub name: String,
    pub rating: i64,
}

/// Best-effort detail data captured at discovery time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardEnrichment {
    pub club: Option<String>,
    pub position: Option<String>,
    pub nation: Option<String>,
}

/// A card currently tracked as extinct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedCard {
    pub card_id: CardId,
    pub name: String,
    pub rating: i64,
    pub status: CardStatus,
    pub club: Option<String>,
    pub position: Option<String>,
    pub nation: Option<String>,
    pub first_detected_at: DateTime<Utc>,
    pub last_seen_on_source_at: DateTime<Utc>,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub consecutive_missing: i64,
    pub alert_sent: bool,
}

impl TrackedCard {
    /// Snapshot a freshly discovered candidate. Name, rating and the
    /// enrichment fields are immutable after this point.
    pub fn new(candidate: CardCandidate, enrichment: CardEnrichment) -> Self {
        let now = Utc::now();
        Self {
            card_id: candidate.card_id,
            name: candidate.name,
            rating: candidate.rating,
            status: CardStatus::Extinct,
            club: enrichment.club,
            position: enrichment.position,
            nation: enrichment.nation,
            first_detected_at: now,
            last_seen_on_source_at: now,
            last_checked_at: None,
            consecutive_missing: 0,
            alert_sent: false,
        }
    }
}
