//! Binance spot ticker price source.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::config::PriceSourceConfig;
use crate::feeds::source::{FetchError, PriceSource};
use crate::oracle::assets::AssetPair;

/// `GET /api/v3/ticker/price` response body.
#[derive(Debug, Deserialize)]
struct TickerPrice {
    symbol: String,
    /// Decimal string, e.g. "50000.12000000".
    price: String,
}

/// Price source backed by the Binance public REST API.
#[derive(Debug, Clone)]
pub struct BinanceSource {
    base_url: String,
    client: Client,
}

impl BinanceSource {
    pub fn new(config: &PriceSourceConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl PriceSource for BinanceSource {
    fn name(&self) -> &'static str {
        "binance"
    }

    async fn fetch(&self, pair: &AssetPair) -> Result<Decimal, FetchError> {
        let symbol = pair.symbol();
        let url = format!("{}/api/v3/ticker/price", self.base_url);

        tracing::debug!(pair = %pair, symbol = %symbol, "Fetching ticker price");

        let response = self
            .client
            .get(&url)
            .query(&[("symbol", symbol.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let ticker: TickerPrice = response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        if ticker.symbol != symbol {
            return Err(FetchError::Unavailable(pair.to_string()));
        }

        Decimal::from_str(&ticker.price)
            .map(|price| price.normalize())
            .map_err(|e| FetchError::Decode(format!("price '{}': {}", ticker.price, e)))
    }
}
