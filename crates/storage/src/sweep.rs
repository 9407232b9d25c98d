//! Background sweep scheduler.
//!
//! Runs one expiry pass per tick: computes `cutoff = now(UTC) − max_age`
//! and asks the store to sweep hooks, then requests, each in its own
//! atomic transaction. A failed cycle is logged and retried on the next
//! tick — never fatal. The loop observes a shutdown signal and exits
//! between ticks; because every sweep transaction is atomic, shutdown
//! never leaves partial state behind.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::store::Store;

/// Default interval between sweep cycles.
pub(crate) const SWEEP_INTERVAL: Duration = Duration::from_secs(10);

/// Maximum expired entries to delete per collection per cycle.
///
/// Bounds the size of a sweep's write transaction so a large expiry
/// backlog cannot starve request-handling writers; the remainder is
/// picked up on following ticks.
pub(crate) const MAX_BATCH_SIZE: usize = 1000;

/// Periodic background sweeper for expired hooks and requests.
///
/// The first cycle runs immediately on start, then once per `interval`.
#[derive(bon::Builder)]
#[builder(on(_, required))]
pub struct Sweeper {
    /// Store to sweep.
    store: Store,
    /// Entities older than this are deleted.
    max_age: Duration,
    /// Interval between cycles.
    #[builder(default = SWEEP_INTERVAL)]
    interval: Duration,
    /// Maximum expired entries per collection per cycle.
    #[builder(default = MAX_BATCH_SIZE)]
    max_batch_size: usize,
    /// Shutdown signal; the loop exits on the next message (or when the
    /// sender is dropped).
    shutdown: broadcast::Receiver<()>,
}

impl Sweeper {
    /// Starts the sweeper as a background tokio task.
    ///
    /// Returns a handle that completes once the loop has observed the
    /// shutdown signal and exited.
    pub fn start(self) -> JoinHandle<()> {
        let Sweeper { store, max_age, interval: period, max_batch_size, mut shutdown } = self;

        tokio::spawn(async move {
            let mut ticker = interval(period);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match run_cycle(&store, max_age, max_batch_size) {
                            Ok(stats) if stats.total() > 0 => {
                                info!(
                                    hooks = stats.hooks_removed,
                                    requests = stats.requests_removed,
                                    "sweep cycle removed expired entities"
                                );
                            }
                            Ok(_) => debug!("sweep cycle found nothing expired"),
                            Err(e) => warn!(error = %e, "sweep cycle failed; retrying next tick"),
                        }
                    }
                    _ = shutdown.recv() => {
                        info!("sweeper shutting down");
                        break;
                    }
                }
            }
        })
    }
}

/// Runs a single sweep cycle.
fn run_cycle(
    store: &Store,
    max_age: Duration,
    max_batch: usize,
) -> crate::Result<crate::SweepStats> {
    let cutoff = crate::store::cutoff_for(max_age)?;
    store.sweep_at(cutoff, max_batch)
}
