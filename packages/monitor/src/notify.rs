use crate::types::TrackedCard;

/// Routing category attached to every outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertCategory {
    Extinction,
    Availability,
    Digest,
    System,
}

impl AlertCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertCategory::Extinction => "extinction",
            AlertCategory::Availability => "availability",
            AlertCategory::Digest => "digest",
            AlertCategory::System => "system",
        }
    }
}

/// Outbound message channel (to allow mocking).
///
/// Delivery is fire-and-forget: implementations log failures instead of
/// returning them, so a dead channel can never block or reverse a state
/// change in the store.
#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, message: &str, category: AlertCategory);
}

/// Upper bound per digest message, below Telegram's 4096-char hard limit.
pub const DIGEST_MESSAGE_LIMIT: usize = 3_500;

/// Alert emitted once per newly tracked card, gated by the insert.
pub fn discovery_alert(card: &TrackedCard) -> String {
    let mut message = format!("EXTINCT: {} ({})", card.name, card.rating);
    if let Some(club) = &card.club {
        message.push_str(&format!(" - {}", club));
    }
    if let Some(position) = &card.position {
        message.push_str(&format!(" [{}]", position));
    }
    message
}

/// Alert emitted exactly once per confirmed return to market.
pub fn availability_alert(card: &TrackedCard) -> String {
    format!("BACK IN MARKET: {} ({})", card.name, card.rating)
}

/// Hourly digest over the full tracked set, already ordered by rating
/// descending. Split into size-bounded messages.
pub fn digest_messages(cards: &[TrackedCard]) -> Vec<String> {
    if cards.is_empty() {
        return vec!["Extinct watch: no cards currently tracked".to_string()];
    }

    let header = format!("Extinct watch: {} cards tracked", cards.len());
    let mut messages = Vec::new();
    let mut current = header;

    for card in cards {
        let mut line = format!("\n{} | {}", card.rating, card.name);
        if let Some(club) = &card.club {
            line.push_str(&format!(" ({})", club));
        }
        if card.consecutive_missing > 0 {
            line.push_str(&format!(" [missing {}]", card.consecutive_missing));
        }

        if current.len() + line.len() > DIGEST_MESSAGE_LIMIT {
            messages.push(std::mem::take(&mut current));
            current = line.trim_start().to_string();
        } else {
            current.push_str(&line);
        }
    }

    if !current.is_empty() {
        messages.push(current);
    }

    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CardCandidate, CardEnrichment, CardId};

    fn card(name: &str, rating: i64, club: Option<&str>) -> TrackedCard {
        TrackedCard::new(
            CardCandidate {
                card_id: CardId::new(format!("{}-{}", name, rating)),
                name: name.to_string(),
                rating,
            },
            CardEnrichment {
                club: club.map(str::to_string),
                ..CardEnrichment::default()
            },
        )
    }

    #[test]
    fn discovery_alert_includes_enrichment_when_present() {
        let with_club = card("Mbappe", 91, Some("Real Madrid"));
        assert_eq!(
            discovery_alert(&with_club),
            "EXTINCT: Mbappe (91) - Real Madrid"
        );

        let bare = card("Mbappe", 91, None);
        assert_eq!(discovery_alert(&bare), "EXTINCT: Mbappe (91)");
    }

    #[test]
    fn availability_alert_names_card_and_rating() {
        let returned = card("Haaland", 90, None);
        assert_eq!(availability_alert(&returned), "BACK IN MARKET: Haaland (90)");
    }

    #[test]
    fn empty_digest_reports_empty_set() {
        let messages = digest_messages(&[]);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("no cards"));
    }

    #[test]
    fn digest_splits_at_message_limit() {
        let cards: Vec<TrackedCard> = (0..200)
            .map(|i| card(&format!("Player With A Fairly Long Name {i}"), 85, Some("Some Club FC")))
            .collect();

        let messages = digest_messages(&cards);
        assert!(messages.len() > 1);
        for message in &messages {
            assert!(message.len() <= DIGEST_MESSAGE_LIMIT);
        }
        // Every card appears exactly once across the chunks.
        let joined = messages.join("\n");
        for card in &cards {
            assert!(joined.contains(&card.name));
        }
    }
}
