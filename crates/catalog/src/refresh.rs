//! Periodic catalog refresh.

use crate::catalog::{Catalog, RefreshReport};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Default interval between periodic refreshes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

/// Re-scans a [`Catalog`] on a fixed interval until cancelled.
///
/// The first refresh happens immediately. A refresh that overruns the
/// interval delays the next tick rather than triggering a burst of catch-up
/// refreshes.
pub struct Refresher {
    catalog: Arc<Catalog>,
    interval: Duration,
    cancel: CancellationToken,
}

impl Refresher {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            interval: DEFAULT_REFRESH_INTERVAL,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Token that stops [`run`](Self::run) when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Refresh until cancelled, handing every report to `on_report`.
    ///
    /// Returns the number of refreshes performed. A refresh already in
    /// progress when the token fires is allowed to finish, so a snapshot is
    /// never abandoned half-published.
    pub async fn run(self, mut on_report: impl FnMut(&RefreshReport)) -> u64 {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut refreshes = 0;
        tracing::info!(interval_secs = self.interval.as_secs_f64(), "Starting periodic refresh");
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let report = self.catalog.refresh().await;
                    refreshes += 1;
                    on_report(&report);
                },
            }
        }
        tracing::info!(refreshes, "Periodic refresh stopped");
        refreshes
    }

    /// Spawn [`run`](Self::run) onto the current runtime, discarding reports
    /// (failures are still logged by the catalog).
    pub fn spawn(self) -> (CancellationToken, tokio::task::JoinHandle<u64>) {
        let token = self.cancellation_token();
        (token, tokio::spawn(self.run(|_| {})))
    }
}
