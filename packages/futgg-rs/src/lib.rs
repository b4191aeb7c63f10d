//! Minimal client for the fut.gg player APIs: the price-sorted paginated
//! listing, the batch price endpoint, and the per-player detail endpoint.
//!
//! The client carries the browser-shaped concerns so callers never see them:
//! rotating user agents, request timeouts, and detection of rate limiting or
//! bot walls (HTTP 403/429 map to `FutGgError::Blocked`).

use std::time::Duration;

use reqwest::{header, Client, StatusCode};
use thiserror::Error;

pub mod models;
pub use models::{NamedRef, PlayerSummary, PriceSnapshot};

use models::{ItemEnvelope, ListEnvelope};

pub const DEFAULT_BASE_URL: &str = "https://www.fut.gg/api/fut";

static USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

#[derive(Debug, Error)]
pub enum FutGgError {
    #[error("fut.gg request timed out")]
    Timeout,

    #[error("fut.gg is blocking requests (status {status})")]
    Blocked { status: u16 },

    #[error("fut.gg returned status {status}")]
    Status { status: u16 },

    #[error("fut.gg request failed: {0}")]
    Transport(reqwest::Error),
}

fn map_transport(err: reqwest::Error) -> FutGgError {
    if err.is_timeout() {
        FutGgError::Timeout
    } else {
        FutGgError::Transport(err)
    }
}

#[derive(Debug, Clone)]
pub struct FutGgOptions {
    pub base_url: String,
    /// Game platform segment in the API paths.
    pub platform_id: String,
    pub timeout: Duration,
}

impl Default for FutGgOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            platform_id: "26".to_string(),
            timeout: Duration::from_secs(20),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FutGgClient {
    client: Client,
    options: FutGgOptions,
}

impl FutGgClient {
    pub fn new(options: FutGgOptions) -> Result<Self, FutGgError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            "application/json, text/plain, */*".parse().unwrap(),
        );
        headers.insert(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9".parse().unwrap());
        headers.insert(header::CONNECTION, "keep-alive".parse().unwrap());
        headers.insert(header::REFERER, "https://www.fut.gg/players/".parse().unwrap());
        headers.insert(header::ORIGIN, "https://www.fut.gg".parse().unwrap());

        let client = Client::builder()
            .timeout(options.timeout)
            .default_headers(headers)
            .build()
            .map_err(FutGgError::Transport)?;

        Ok(Self { client, options })
    }

    fn user_agent() -> &'static str {
        USER_AGENTS[fastrand::usize(..USER_AGENTS.len())]
    }

    fn check_status(status: StatusCode) -> Result<(), FutGgError> {
        match status.as_u16() {
            403 | 429 => Err(FutGgError::Blocked {
                status: status.as_u16(),
            }),
            s if !status.is_success() => Err(FutGgError::Status { status: s }),
            _ => Ok(()),
        }
    }

    /// One page of the player listing sorted by current price ascending.
    /// Extinct cards (price gone) concentrate at the front of this ordering.
    pub async fn fetch_players_page(&self, page: u32) -> Result<Vec<PlayerSummary>, FutGgError> {
        let url = format!(
            "{}/players/v2/{}/",
            self.options.base_url, self.options.platform_id
        );
        tracing::debug!(url = %url, page, "fetching listing page");

        let response = self
            .client
            .get(&url)
            .query(&[("sorts", "current_price"), ("page", &page.to_string())])
            .header(header::USER_AGENT, Self::user_agent())
            .send()
            .await
            .map_err(map_transport)?;

        Self::check_status(response.status())?;

        let envelope: ListEnvelope<PlayerSummary> =
            response.json().await.map_err(map_transport)?;
        Ok(envelope.data)
    }

    /// Batch price lookup for up to ~50 player ids per call.
    pub async fn fetch_prices(&self, ea_ids: &[String]) -> Result<Vec<PriceSnapshot>, FutGgError> {
        if ea_ids.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!(
            "{}/player-prices/{}/",
            self.options.base_url, self.options.platform_id
        );
        let ids = ea_ids.join(",");
        tracing::debug!(url = %url, ids = %ids, "fetching prices");

        let response = self
            .client
            .get(&url)
            .query(&[("ids", ids.as_str())])
            .header(header::USER_AGENT, Self::user_agent())
            .send()
            .await
            .map_err(map_transport)?;

        Self::check_status(response.status())?;

        let envelope: ListEnvelope<PriceSnapshot> =
            response.json().await.map_err(map_transport)?;
        Ok(envelope.data)
    }

    /// Detail fetch for a single player.
    pub async fn fetch_player_detail(&self, ea_id: &str) -> Result<PlayerSummary, FutGgError> {
        let url = format!(
            "{}/players/{}/{}/",
            self.options.base_url, self.options.platform_id, ea_id
        );
        tracing::debug!(url = %url, "fetching player detail");

        let response = self
            .client
            .get(&url)
            .header(header::USER_AGENT, Self::user_agent())
            .send()
            .await
            .map_err(map_transport)?;

        Self::check_status(response.status())?;

        let envelope: ItemEnvelope<PlayerSummary> =
            response.json().await.map_err(map_transport)?;
        Ok(envelope.data)
    }
}
