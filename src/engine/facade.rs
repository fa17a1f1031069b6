//! Read-only query surface over a running engine.
//!
//! Nothing here submits transactions: signed prices are returned to the
//! caller and never sent on chain.

use std::collections::BTreeMap;
use std::sync::Arc;

use alloy::primitives::Address;
use serde::Serialize;
use thiserror::Error;

use crate::blockchain::ConnectionState;
use crate::engine::runtime::OracleEngine;
use crate::listener::ListenerState;
use crate::oracle::{AssetPair, PriceObservation, SignedAttestation, SigningError};

/// Errors returned by facade lookups.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("pair '{0}' is not tracked")]
    UntrackedPair(String),

    #[error("no price observed yet for {0}")]
    NoData(AssetPair),

    #[error("oracle is not connected to a node")]
    NotConnected,

    #[error(transparent)]
    Signing(#[from] SigningError),
}

/// Snapshot returned by [`QueryFacade::get_status`].
#[derive(Debug, Clone, Serialize)]
pub struct OracleStatus {
    pub tracked_pairs: Vec<AssetPair>,
    pub latest_prices: BTreeMap<AssetPair, PriceObservation>,
    pub poll_interval_secs: u64,
    pub connection: ConnectionState,
    pub contract_address: Address,
    pub signer_address: Address,
    pub listener: Option<ListenerState>,
}

#[derive(Debug, Clone)]
pub struct QueryFacade {
    engine: Arc<OracleEngine>,
}

impl QueryFacade {
    pub fn new(engine: Arc<OracleEngine>) -> Self {
        Self { engine }
    }

    fn resolve(&self, pair: &str) -> Result<AssetPair, QueryError> {
        self.engine
            .assets()
            .resolve(pair)
            .ok_or_else(|| QueryError::UntrackedPair(pair.to_string()))
    }

    /// Latest observation for `pair` (any separator, any case).
    pub fn get_latest_price(&self, pair: &str) -> Result<PriceObservation, QueryError> {
        let pair = self.resolve(pair)?;
        self.engine
            .prices()
            .latest(&pair)
            .ok_or(QueryError::NoData(pair))
    }

    /// Price table snapshot plus the live connection state.
    pub async fn get_status(&self) -> OracleStatus {
        OracleStatus {
            tracked_pairs: self.engine.assets().pairs().to_vec(),
            latest_prices: self.engine.prices().snapshot(),
            poll_interval_secs: self.engine.config().oracle.poll_interval_secs,
            connection: self.engine.connection_state().await,
            contract_address: self.engine.contract(),
            signer_address: self.engine.signer().address(),
            listener: self.engine.listener_state(),
        }
    }

    /// Sign the latest observation for `pair` at its observation time.
    pub async fn get_signed_price(&self, pair: &str) -> Result<SignedAttestation, QueryError> {
        let observation = self.get_latest_price(pair)?;
        let ctx = self.engine.context().ok_or(QueryError::NotConnected)?;

        let attestation = ctx
            .signer
            .sign(
                ctx.node.as_ref(),
                &observation.pair,
                observation.price,
                observation.observed_at,
            )
            .await?;
        Ok(attestation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::testing::{RecordingSubmitter, StubConnector, StubNode, TEST_PRIVATE_KEY};
    use crate::blockchain::Wallet;
    use crate::config::OracleConfig;
    use crate::engine::runtime::EngineParts;
    use crate::feeds::{FetchError, PriceSource};
    use alloy::primitives::U256;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    struct NoPrices;

    #[async_trait]
    impl PriceSource for NoPrices {
        fn name(&self) -> &'static str {
            "none"
        }

        async fn fetch(&self, pair: &AssetPair) -> Result<Decimal, FetchError> {
            Err(FetchError::Unavailable(pair.to_string()))
        }
    }

    fn facade(submitter: Arc<RecordingSubmitter>) -> (QueryFacade, Arc<OracleEngine>) {
        let mut config = OracleConfig::default();
        config.oracle.contract_address = "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string();
        config.oracle.asset_pairs = vec!["BTC/USDT".to_string(), "ETH/USDT".to_string()];
        config.listener.enabled = false;

        let parts = EngineParts {
            connector: Arc::new(StubConnector::connected(Arc::new(StubNode::new(1337)))),
            price_source: Arc::new(NoPrices),
            submitter: Some(submitter),
        };
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY).unwrap();
        let engine = Arc::new(OracleEngine::with_parts(config, wallet, parts).unwrap());
        (QueryFacade::new(engine.clone()), engine)
    }

    fn observe(engine: &OracleEngine, pair: &str, price: &str, at: u64) {
        engine.prices().record(PriceObservation {
            pair: AssetPair::parse(pair).unwrap(),
            price: Decimal::from_str(price).unwrap(),
            observed_at: at,
        });
    }

    #[tokio::test]
    async fn test_signed_price_never_submits() {
        let submitter = Arc::new(RecordingSubmitter::default());
        let (facade, engine) = facade(submitter.clone());
        engine.start().await.unwrap();
        observe(&engine, "BTC/USDT", "50000.123456", 100);

        let attestation = facade.get_signed_price("btc-usdt").await.unwrap();

        assert_eq!(attestation.scaled_price, U256::from(50000123456u64));
        assert_eq!(attestation.timestamp, 100);
        assert_eq!(attestation.chain_id, 1337);
        assert_eq!(submitter.call_count(), 0);

        engine.stop().await;
    }

    #[tokio::test]
    async fn test_lookup_errors() {
        let (facade, engine) = facade(Arc::new(RecordingSubmitter::default()));

        assert!(matches!(
            facade.get_latest_price("DOGE/USDT"),
            Err(QueryError::UntrackedPair(_))
        ));
        assert!(matches!(
            facade.get_latest_price("ETH/USDT"),
            Err(QueryError::NoData(_))
        ));

        observe(&engine, "ETH/USDT", "3000", 100);
        assert_eq!(facade.get_latest_price("eth_usdt").unwrap().observed_at, 100);
        assert!(matches!(
            facade.get_signed_price("ETH/USDT").await,
            Err(QueryError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_status_reports_connection() {
        let (facade, engine) = facade(Arc::new(RecordingSubmitter::default()));

        let status = facade.get_status().await;
        assert!(!status.connection.connected);
        assert_eq!(status.tracked_pairs.len(), 2);
        assert_eq!(status.poll_interval_secs, 10);

        engine.start().await.unwrap();
        observe(&engine, "BTC/USDT", "50000", 100);
        let status = facade.get_status().await;
        assert!(status.connection.connected);
        assert_eq!(status.connection.chain_id, Some(1337));
        assert_eq!(status.latest_prices.len(), 1);
        assert_eq!(status.listener, None);

        engine.stop().await;
    }
}
