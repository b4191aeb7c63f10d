use thiserror::Error;

/// Errors surfaced by the source gateway.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("source request timed out")]
    Timeout,

    /// The source is actively refusing us (rate limit or bot wall). The
    /// whole cycle should back off instead of hammering the next page.
    #[error("source is blocking requests (status {status})")]
    Blocked { status: u16 },

    #[error("source fetch failed: {0}")]
    Other(#[from] anyhow::Error),
}

impl FetchError {
    pub fn is_blocked(&self) -> bool {
        matches!(self, FetchError::Blocked { .. })
    }
}

/// Errors surfaced by the card store.
///
/// Transient lock contention is retried inside the store itself; only
/// retry exhaustion escapes as `Unavailable`, which callers treat as
/// "skip this cycle".
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable after retries")]
    Unavailable(#[source] sqlx::Error),

    #[error("storage error")]
    Database(#[from] sqlx::Error),
}

/// Cycle-level error for the discovery and reconciliation engines.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MonitorError {
    /// True when the source is blocking us and the owning loop should
    /// sleep for several minutes before retrying the cycle.
    pub fn is_blocked(&self) -> bool {
        matches!(self, MonitorError::Fetch(fetch) if fetch.is_blocked())
    }
}
