//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::time::Duration;

use price_oracle::blockchain::Wallet;
use price_oracle::config::OracleConfig;

pub use price_oracle::blockchain::testing::{
    request_log, test_wallet, RecordingSubmitter, StubConnector, StubNode, TEST_CONTRACT,
};

pub fn wallet() -> Wallet {
    test_wallet()
}

/// Config tracking BTC/USDT and ETH/USDT with fast listener polling.
pub fn test_config() -> OracleConfig {
    let mut config = OracleConfig::default();
    config.oracle.contract_address = TEST_CONTRACT.to_string();
    config.oracle.asset_pairs = vec!["BTC/USDT".to_string(), "ETH/USDT".to_string()];
    config.oracle.poll_interval_secs = 10;
    config.oracle.freshness_slack_secs = 5;
    config.listener.poll_interval_ms = 50;
    config.listener.retry_backoff_ms = 50;
    config.shutdown.grace_period_secs = 2;
    config
}

/// Check `condition` every 20ms until it holds or `within` elapses.
pub async fn eventually<F>(within: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}
