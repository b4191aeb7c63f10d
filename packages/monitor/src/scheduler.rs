//! Periodic drivers for the two engines plus the hourly digest job.
//!
//! Discovery and reconciliation run as independent tokio loops against the
//! shared store. Neither loop ever exits on an error: a transient cycle
//! failure sleeps 60-120s, a detected block from the source sleeps ten
//! minutes, and a clean cycle sleeps its configured interval with a little
//! jitter.

use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::discovery::DiscoveryEngine;
use crate::error::MonitorError;
use crate::gateway::SourceGateway;
use crate::notify::NotificationSink;
use crate::reconcile::ReconciliationEngine;
use crate::store::CardStore;

/// Sleep applied when the source is actively blocking requests.
const BLOCKED_BACKOFF: Duration = Duration::from_secs(600);

fn transient_backoff() -> Duration {
    Duration::from_secs(60 + fastrand::u64(0..=60))
}

fn jittered(interval: Duration) -> Duration {
    interval + Duration::from_secs(fastrand::u64(0..30))
}

fn backoff_for(err: &MonitorError) -> Duration {
    if err.is_blocked() {
        tracing::warn!("source is blocking requests, backing the cycle off");
        BLOCKED_BACKOFF
    } else {
        transient_backoff()
    }
}

/// Spawn the discovery loop (roughly every 30 minutes by default).
pub fn spawn_discovery_loop<G, S, N>(
    engine: DiscoveryEngine<G, S, N>,
    interval: Duration,
) -> JoinHandle<()>
where
    G: SourceGateway + 'static,
    S: CardStore + 'static,
    N: NotificationSink + 'static,
{
    tokio::spawn(async move {
        loop {
            let sleep = match engine.discover().await {
                Ok(inserted) => {
                    tracing::debug!(inserted, "discovery loop tick done");
                    jittered(interval)
                }
                Err(err) => {
                    tracing::error!(error = %err, "discovery cycle failed");
                    backoff_for(&err)
                }
            };
            tokio::time::sleep(sleep).await;
        }
    })
}

/// Spawn the reconciliation loop (roughly every 10 minutes by default).
pub fn spawn_reconcile_loop<G, S, N>(
    engine: ReconciliationEngine<G, S, N>,
    interval: Duration,
) -> JoinHandle<()>
where
    G: SourceGateway + 'static,
    S: CardStore + 'static,
    N: NotificationSink + 'static,
{
    tokio::spawn(async move {
        loop {
            let sleep = match engine.reconcile().await {
                Ok(outcome) => {
                    tracing::debug!(
                        confirmed_returned = outcome.confirmed_returned,
                        still_extinct = outcome.still_extinct,
                        "reconciliation loop tick done"
                    );
                    jittered(interval)
                }
                Err(err) => {
                    tracing::error!(error = %err, "reconciliation cycle failed");
                    backoff_for(&err)
                }
            };
            tokio::time::sleep(sleep).await;
        }
    })
}

/// Start the hourly digest job. Runs on its own timer, independent of the
/// cycle loops.
pub async fn start_digest_schedule<G, S, N>(
    engine: ReconciliationEngine<G, S, N>,
) -> Result<JobScheduler>
where
    G: SourceGateway + 'static,
    S: CardStore + 'static,
    N: NotificationSink + 'static,
{
    let scheduler = JobScheduler::new().await?;

    let digest_job = Job::new_async("0 0 * * * *", move |_uuid, _lock| {
        let engine = engine.clone();
        Box::pin(async move {
            if let Err(e) = engine.send_digest().await {
                tracing::error!("Digest task failed: {}", e);
            }
        })
    })?;

    scheduler.add(digest_job).await?;
    scheduler.start().await?;

    tracing::info!("Scheduled tasks started (digest every hour)");
    Ok(scheduler)
}
