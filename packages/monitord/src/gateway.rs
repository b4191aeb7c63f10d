//! Adapts the fut.gg client to the monitor's `SourceGateway` seam.
//!
//! The "extinct listing" is the price-sorted player listing intersected with
//! the batch price endpoint: a page entry is a candidate only when the price
//! lookup reports it extinct. The per-card status probe is a single-id price
//! lookup; an id the endpoint does not answer for maps to `Uncertain`.

use std::collections::HashSet;

use futgg::{FutGgClient, FutGgError, PriceSnapshot};
use monitor::{CardCandidate, CardEnrichment, CardId, ExtinctionSignal, FetchError, SourceGateway};

/// Ids per batch price call.
const PRICE_BATCH_SIZE: usize = 50;

pub struct FutGgGateway {
    client: FutGgClient,
}

impl FutGgGateway {
    pub fn new(client: FutGgClient) -> Self {
        Self { client }
    }
}

fn map_err(err: FutGgError) -> FetchError {
    match err {
        FutGgError::Timeout => FetchError::Timeout,
        FutGgError::Blocked { status } => FetchError::Blocked { status },
        other => FetchError::Other(anyhow::Error::new(other)),
    }
}

fn signal_from_prices(prices: &[PriceSnapshot], ea_id: i64) -> ExtinctionSignal {
    match prices.iter().find(|price| price.ea_id == ea_id) {
        Some(price) if price.is_extinct => ExtinctionSignal::Extinct,
        Some(_) => ExtinctionSignal::Available,
        None => ExtinctionSignal::Uncertain,
    }
}

#[async_trait::async_trait]
impl SourceGateway for FutGgGateway {
    async fn fetch_extinct_page(
        &self,
        page: u32,
        min_rating: i64,
    ) -> Result<Vec<CardCandidate>, FetchError> {
        let players = self
            .client
            .fetch_players_page(page)
            .await
            .map_err(map_err)?;

        let rated: Vec<_> = players
            .into_iter()
            .filter(|player| player.overall >= min_rating)
            .collect();
        if rated.is_empty() {
            return Ok(Vec::new());
        }

        let mut extinct_ids: HashSet<i64> = HashSet::new();
        let ids: Vec<String> = rated.iter().map(|player| player.ea_id.to_string()).collect();
        for chunk in ids.chunks(PRICE_BATCH_SIZE) {
            let prices = self.client.fetch_prices(chunk).await.map_err(map_err)?;
            extinct_ids.extend(
                prices
                    .iter()
                    .filter(|price| price.is_extinct)
                    .map(|price| price.ea_id),
            );
        }

        Ok(rated
            .into_iter()
            .filter(|player| extinct_ids.contains(&player.ea_id))
            .map(|player| CardCandidate {
                card_id: CardId::new(player.ea_id.to_string()),
                name: player.display_name(),
                rating: player.overall,
            })
            .collect())
    }

    async fn fetch_entity_status(&self, card_id: &CardId) -> Result<ExtinctionSignal, FetchError> {
        let Ok(ea_id) = card_id.as_str().parse::<i64>() else {
            return Ok(ExtinctionSignal::Uncertain);
        };

        let prices = self
            .client
            .fetch_prices(&[card_id.as_str().to_string()])
            .await
            .map_err(map_err)?;
        Ok(signal_from_prices(&prices, ea_id))
    }

    async fn fetch_enrichment(&self, card_id: &CardId) -> Result<CardEnrichment, FetchError> {
        let detail = self
            .client
            .fetch_player_detail(card_id.as_str())
            .await
            .map_err(map_err)?;

        Ok(CardEnrichment {
            club: detail.club.and_then(|club| club.name),
            position: detail.position,
            nation: detail.nation.and_then(|nation| nation.name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(ea_id: i64, is_extinct: bool) -> PriceSnapshot {
        serde_json::from_value(serde_json::json!({
            "eaId": ea_id,
            "price": if is_extinct { None } else { Some(1000) },
            "isExtinct": is_extinct,
        }))
        .unwrap()
    }

    #[test]
    fn price_entries_map_to_tri_state_signals() {
        let prices = vec![price(1, true), price(2, false)];

        assert_eq!(signal_from_prices(&prices, 1), ExtinctionSignal::Extinct);
        assert_eq!(signal_from_prices(&prices, 2), ExtinctionSignal::Available);
        assert_eq!(signal_from_prices(&prices, 3), ExtinctionSignal::Uncertain);
    }
}
