pub mod config;
pub mod discovery;
pub mod error;
pub mod gateway;
pub mod notify;
pub mod reconcile;
pub mod scheduler;
pub mod store;
pub mod testing;
pub mod types;

// Re-exports for clean API
pub use config::MonitorConfig;
pub use discovery::DiscoveryEngine;
pub use error::{FetchError, MonitorError, StoreError};
pub use gateway::SourceGateway;
pub use notify::{AlertCategory, NotificationSink};
pub use reconcile::{ReconcileOutcome, ReconciliationEngine};
pub use store::{CardStore, InsertOutcome, SqliteCardStore};
pub use types::{
    CardCandidate, CardEnrichment, CardId, CardStatus, ExtinctionSignal, TrackedCard,
};
