//! Latest-price table shared between the poller and its readers.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::oracle::assets::AssetPair;

/// Most recent successful price for one pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub pair: AssetPair,
    pub price: Decimal,
    /// Poll tick time, seconds since epoch.
    pub observed_at: u64,
}

/// Thread-safe table holding at most one observation per pair.
///
/// The poller is the only writer. Each `record` replaces the whole entry, so
/// readers never observe a half-updated observation.
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    inner: Arc<DashMap<AssetPair, PriceObservation>>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the observation for `observation.pair`.
    pub fn record(&self, observation: PriceObservation) {
        self.inner.insert(observation.pair.clone(), observation);
    }

    pub fn latest(&self, pair: &AssetPair) -> Option<PriceObservation> {
        self.inner.get(pair).map(|r| r.value().clone())
    }

    /// Copy of the whole table, ordered by pair.
    pub fn snapshot(&self) -> BTreeMap<AssetPair, PriceObservation> {
        self.inner
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
