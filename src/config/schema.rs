//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the oracle.
//! All types derive Serde traits for deserialization from config files.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the price oracle.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct OracleConfig {
    /// Blockchain node endpoints and connection timeouts.
    pub node: NodeConfig,

    /// Oracle contract, tracked pairs and polling cadence.
    pub oracle: OracleSettings,

    /// External market price source.
    pub price_source: PriceSourceConfig,

    /// On-chain request listener.
    pub listener: ListenerConfig,

    /// Fulfillment transaction settings.
    pub submitter: SubmitterConfig,

    /// HTTP query surface.
    pub http: HttpConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Shutdown behaviour.
    pub shutdown: ShutdownConfig,
}

/// Blockchain node configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NodeConfig {
    /// JSON-RPC endpoint URL (http or https).
    pub rpc_url: String,

    /// Explicit WebSocket endpoint. Derived from `rpc_url` when absent.
    pub ws_url: Option<String>,

    /// Timeout for opening a transport, in seconds.
    pub connect_timeout_secs: u64,

    /// Timeout for individual node queries, in seconds.
    pub request_timeout_secs: u64,
}

impl NodeConfig {
    /// WebSocket endpoint for the subscription-capable transport.
    ///
    /// `https://` becomes `wss://` and `http://` becomes `ws://`.
    pub fn websocket_url(&self) -> String {
        if let Some(ws) = &self.ws_url {
            return ws.clone();
        }
        if let Some(rest) = self.rpc_url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.rpc_url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            self.rpc_url.clone()
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            ws_url: None,
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
        }
    }
}

/// Oracle contract and price tracking settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OracleSettings {
    /// Address of the oracle contract (also the EIP-712 verifying contract).
    pub contract_address: String,

    /// Asset pairs to track, e.g. "BTC/USDT".
    pub asset_pairs: Vec<String>,

    /// Price polling interval in seconds.
    pub poll_interval_secs: u64,

    /// Fixed slack added to the freshness window, in seconds.
    pub freshness_slack_secs: u64,

    /// EIP-712 domain name.
    pub domain_name: String,

    /// EIP-712 domain version.
    pub domain_version: String,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            contract_address: String::new(),
            asset_pairs: vec!["BTC/USDT".to_string(), "ETH/USDT".to_string()],
            poll_interval_secs: 10,
            freshness_slack_secs: 5,
            domain_name: "SimpleOracle".to_string(),
            domain_version: "1".to_string(),
        }
    }
}

impl OracleSettings {
    /// Parsed contract address; `None` when unset or malformed.
    pub fn contract(&self) -> Option<Address> {
        self.contract_address.parse().ok()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// External price source configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PriceSourceConfig {
    /// REST base URL of the exchange API.
    pub base_url: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for PriceSourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.binance.com".to_string(),
            request_timeout_secs: 5,
        }
    }
}

/// Event listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Start the on-chain request listener.
    pub enabled: bool,

    /// Name of the contract event carrying price requests.
    pub request_event: String,

    /// Log filter polling interval in milliseconds.
    pub poll_interval_ms: u64,

    /// Delay before retrying after a transport error, in milliseconds.
    pub retry_backoff_ms: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            request_event: "PriceValidationRequested".to_string(),
            poll_interval_ms: 2000,
            retry_backoff_ms: 2000,
        }
    }
}

/// Fulfillment transaction configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SubmitterConfig {
    /// Gas limit for the fulfillment call.
    pub gas_limit: u64,

    /// Maximum time to wait for an inclusion receipt, in seconds.
    pub receipt_timeout_secs: u64,
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            gas_limit: 300_000,
            receipt_timeout_secs: 120,
        }
    }
}

/// HTTP query surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Serve the HTTP query surface.
    pub enabled: bool,

    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0:8000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Grace period for each background task to finish, in seconds.
    pub grace_period_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self { grace_period_secs: 5 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_websocket_url_derivation() {
        let mut node = NodeConfig {
            rpc_url: "https://eth-sepolia.example.org/v2/key".to_string(),
            ..Default::default()
        };
        assert_eq!(node.websocket_url(), "wss://eth-sepolia.example.org/v2/key");

        node.rpc_url = "http://127.0.0.1:8545".to_string();
        assert_eq!(node.websocket_url(), "ws://127.0.0.1:8545");

        node.ws_url = Some("ws://other:8546".to_string());
        assert_eq!(node.websocket_url(), "ws://other:8546");
    }

    #[test]
    fn test_minimal_toml() {
        let config: OracleConfig = toml::from_str(
            r#"
            [oracle]
            contract_address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
            asset_pairs = ["BTC/USDT"]
            "#,
        )
        .unwrap();

        assert_eq!(config.oracle.asset_pairs, vec!["BTC/USDT"]);
        assert_eq!(config.oracle.poll_interval_secs, 10);
        assert_eq!(config.oracle.freshness_slack_secs, 5);
        assert_eq!(config.listener.request_event, "PriceValidationRequested");
        assert_eq!(config.submitter.gas_limit, 300_000);
    }
}
