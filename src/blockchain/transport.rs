//! Node connection establishment with ordered transport fallback.
//!
//! # Responsibilities
//! - Open the subscription-capable WebSocket transport first
//! - Fall back to plain HTTP when WebSocket times out or fails
//! - Verify liveness of each transport by fetching the chain id
//! - Decode chain responses with the proof-of-authority compatible network
//!
//! # Design Decisions
//! - Strategies are an ordered list with one success/failure contract
//! - Every stage is bounded by the connect timeout
//! - Failure of all stages is fatal for startup

use std::sync::Arc;
use std::time::Duration;

use alloy::network::AnyNetwork;
use alloy::providers::{DynProvider, Provider, ProviderBuilder, WsConnect};
use async_trait::async_trait;
use tokio::time::timeout;

use crate::blockchain::client::{ChainNode, NodeConnection};
use crate::blockchain::types::{
    BlockchainError, BlockchainResult, ConnectivityError, TransportKind,
};
use crate::config::NodeConfig;
use crate::observability::metrics;

/// Network type used for every node connection.
///
/// Proof-of-authority chains return block headers with oversized `extraData`
/// and non-standard seal fields. `AnyNetwork` keeps unknown fields in a
/// catch-all map instead of rejecting the response.
pub type OracleNetwork = AnyNetwork;

/// One way of reaching the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportStrategy {
    WebSocket { url: String },
    Http { url: String },
}

impl TransportStrategy {
    pub fn kind(&self) -> TransportKind {
        match self {
            TransportStrategy::WebSocket { .. } => TransportKind::WebSocket,
            TransportStrategy::Http { .. } => TransportKind::Http,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            TransportStrategy::WebSocket { url } | TransportStrategy::Http { url } => url,
        }
    }

    async fn open(&self) -> BlockchainResult<DynProvider<OracleNetwork>> {
        match self {
            TransportStrategy::WebSocket { url } => {
                let provider = ProviderBuilder::new()
                    .network::<OracleNetwork>()
                    .connect_ws(WsConnect::new(url.clone()))
                    .await
                    .map_err(|e| BlockchainError::Transport(e.to_string()))?;
                Ok(provider.erased())
            }
            TransportStrategy::Http { url } => {
                let url: url::Url = url.parse().map_err(|e| {
                    BlockchainError::Transport(format!("Invalid RPC URL '{}': {}", url, e))
                })?;
                Ok(ProviderBuilder::new()
                    .network::<OracleNetwork>()
                    .connect_http(url)
                    .erased())
            }
        }
    }
}

/// Produces the node handle for the engine.
#[async_trait]
pub trait NodeConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn ChainNode>, ConnectivityError>;
}

/// Tries each transport strategy in order until one answers.
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    strategies: Vec<TransportStrategy>,
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl ConnectionManager {
    pub fn new(
        strategies: Vec<TransportStrategy>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Self {
        Self {
            strategies,
            connect_timeout,
            request_timeout,
        }
    }

    /// WebSocket first, then HTTP, both derived from the node config.
    pub fn from_config(config: &NodeConfig) -> Self {
        Self::new(
            vec![
                TransportStrategy::WebSocket {
                    url: config.websocket_url(),
                },
                TransportStrategy::Http {
                    url: config.rpc_url.clone(),
                },
            ],
            config.connect_timeout(),
            config.request_timeout(),
        )
    }

    pub fn strategies(&self) -> &[TransportStrategy] {
        &self.strategies
    }

    /// Establish a verified connection.
    pub async fn establish(&self) -> Result<NodeConnection, ConnectivityError> {
        let mut attempts = Vec::new();

        for strategy in &self.strategies {
            let kind = strategy.kind();
            tracing::info!(transport = %kind, url = %strategy.url(), "Connecting to node");

            match self.try_strategy(strategy).await {
                Ok((connection, chain_id)) => {
                    tracing::info!(transport = %kind, chain_id, "Node connected");
                    metrics::record_node_connected(true);
                    if let Err(e) = connection.probe_latest_header().await {
                        tracing::warn!(error = %e, "Latest block header could not be decoded");
                    }
                    return Ok(connection);
                }
                Err(e) => {
                    tracing::warn!(transport = %kind, error = %e, "Transport failed, trying next");
                    attempts.push((kind, e.to_string()));
                }
            }
        }

        metrics::record_node_connected(false);
        Err(ConnectivityError { attempts })
    }

    async fn try_strategy(
        &self,
        strategy: &TransportStrategy,
    ) -> BlockchainResult<(NodeConnection, u64)> {
        let provider = match timeout(self.connect_timeout, strategy.open()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(BlockchainError::Timeout {
                    op: "connect",
                    secs: self.connect_timeout.as_secs(),
                })
            }
        };

        let connection = NodeConnection::new(provider, strategy.kind(), self.request_timeout);

        let chain_id = match timeout(self.connect_timeout, connection.chain_id()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(BlockchainError::Timeout {
                    op: "eth_chainId",
                    secs: self.connect_timeout.as_secs(),
                })
            }
        };

        Ok((connection, chain_id))
    }
}

#[async_trait]
impl NodeConnector for ConnectionManager {
    async fn connect(&self) -> Result<Arc<dyn ChainNode>, ConnectivityError> {
        let connection = self.establish().await?;
        Ok(Arc::new(connection))
    }
}
