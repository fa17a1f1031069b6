//! Periodic market price polling.
//!
//! # Responsibilities
//! - Fetch every tracked pair once per tick, concurrently
//! - Stamp successful observations with the tick time
//! - Keep the previous observation when a pair's fetch fails
//!
//! All fetches of a tick complete before any write, and the writes happen
//! without an await in between, so readers on the same executor never see a
//! table mixing two ticks.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures_util::future::join_all;
use tokio::time::{interval, MissedTickBehavior};

use crate::feeds::source::PriceSource;
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;
use crate::oracle::assets::AssetPair;
use crate::oracle::prices::{PriceObservation, PriceTable};

/// Seconds since the Unix epoch.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Result of one polling tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub updated: Vec<AssetPair>,
    pub failed: Vec<AssetPair>,
}

/// Background task feeding the price table.
pub struct MarketPoller {
    source: Arc<dyn PriceSource>,
    pairs: Vec<AssetPair>,
    table: PriceTable,
    interval: Duration,
}

impl MarketPoller {
    pub fn new(
        source: Arc<dyn PriceSource>,
        pairs: Vec<AssetPair>,
        table: PriceTable,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            pairs,
            table,
            interval,
        }
    }

    /// Poll every pair once, stamping successes with `now`.
    pub async fn tick(&self, now: u64) -> TickSummary {
        let fetches = self.pairs.iter().map(|pair| async move {
            let result = self.source.fetch(pair).await;
            (pair, result)
        });
        let results = join_all(fetches).await;

        let mut summary = TickSummary::default();
        for (pair, result) in results {
            match result {
                Ok(price) => {
                    self.table.record(PriceObservation {
                        pair: pair.clone(),
                        price,
                        observed_at: now,
                    });
                    metrics::record_price_fetch(pair.as_str(), "ok");
                    summary.updated.push(pair.clone());
                }
                Err(e) => {
                    tracing::warn!(
                        pair = %pair,
                        source = self.source.name(),
                        error = %e,
                        "Price fetch failed, keeping previous value"
                    );
                    metrics::record_price_fetch(pair.as_str(), "error");
                    summary.failed.push(pair.clone());
                }
            }
        }

        tracing::debug!(
            updated = summary.updated.len(),
            failed = summary.failed.len(),
            observed_at = now,
            "Price tick complete"
        );
        summary
    }

    /// Tick on the configured interval until shutdown.
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        tracing::info!(
            pairs = self.pairs.len(),
            interval_secs = self.interval.as_secs(),
            source = self.source.name(),
            "Price poller started"
        );

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = ticker.tick() => {
                    self.tick(unix_now()).await;
                }
            }
        }

        tracing::info!("Price poller stopped");
    }
}
