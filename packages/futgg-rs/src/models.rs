use serde::Deserialize;

/// Envelope shared by the listing and price endpoints.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub(crate) struct ListEnvelope<T> {
    #[serde(default)]
    pub data: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ItemEnvelope<T> {
    pub data: T,
}

/// A named reference object (club, nation, league).
#[derive(Debug, Clone, Deserialize)]
pub struct NamedRef {
    pub name: Option<String>,
}

/// One player entry from the price-sorted listing endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    pub ea_id: i64,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub overall: i64,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub club: Option<NamedRef>,
    #[serde(default)]
    pub nation: Option<NamedRef>,
    #[serde(default)]
    pub league: Option<NamedRef>,
}

impl PlayerSummary {
    /// Display name assembled from the name parts, falling back to the slug
    /// and finally the numeric id.
    pub fn display_name(&self) -> String {
        let full = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        );
        let full = full.trim();
        if !full.is_empty() {
            return full.to_string();
        }
        if let Some(slug) = &self.slug {
            if !slug.is_empty() {
                return slug.clone();
            }
        }
        self.ea_id.to_string()
    }
}

/// One entry from the batch price endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSnapshot {
    pub ea_id: i64,
    #[serde(default)]
    pub price: Option<i64>,
    #[serde(default)]
    pub is_extinct: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_summary_parses_listing_payload() {
        let json = r#"{
            "eaId": 231747,
            "slug": "kylian-mbappe",
            "firstName": "Kylian",
            "lastName": "Mbappe",
            "overall": 91,
            "position": "ST",
            "club": {"name": "Real Madrid"},
            "nation": {"name": "France"}
        }"#;

        let player: PlayerSummary = serde_json::from_str(json).unwrap();
        assert_eq!(player.ea_id, 231747);
        assert_eq!(player.overall, 91);
        assert_eq!(player.display_name(), "Kylian Mbappe");
        assert_eq!(player.club.unwrap().name.as_deref(), Some("Real Madrid"));
    }

    #[test]
    fn display_name_falls_back_to_slug_then_id() {
        let json = r#"{"eaId": 1, "slug": "mystery-man", "overall": 85}"#;
        let player: PlayerSummary = serde_json::from_str(json).unwrap();
        assert_eq!(player.display_name(), "mystery-man");

        let json = r#"{"eaId": 7, "overall": 85}"#;
        let player: PlayerSummary = serde_json::from_str(json).unwrap();
        assert_eq!(player.display_name(), "7");
    }

    #[test]
    fn price_snapshot_defaults_to_not_extinct() {
        let json = r#"{"eaId": 1, "price": 1200}"#;
        let price: PriceSnapshot = serde_json::from_str(json).unwrap();
        assert!(!price.is_extinct);
        assert_eq!(price.price, Some(1200));

        let json = r#"{"eaId": 2, "price": null, "isExtinct": true}"#;
        let price: PriceSnapshot = serde_json::from_str(json).unwrap();
        assert!(price.is_extinct);
        assert_eq!(price.price, None);
    }
}
