//! External market price source abstraction.

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::oracle::assets::AssetPair;

/// Errors from fetching one pair's price. Transient and isolated to that pair.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("price source returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed price response: {0}")]
    Decode(String),

    #[error("price source has no quote for {0}")]
    Unavailable(String),
}

/// Current market price for a pair.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn fetch(&self, pair: &AssetPair) -> Result<Decimal, FetchError>;
}
