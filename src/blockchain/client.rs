//! Blockchain node access with timeout and error handling.
//!
//! # Responsibilities
//! - Query chain state (chain id, block number, nonce, gas price)
//! - Manage log filters for the request listener
//! - Broadcast raw transactions and wait for their receipts
//! - Report connectivity as a live query, never a cached flag

use std::future::IntoFuture;
use std::time::Duration;

use alloy::network::ReceiptResponse;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{DynProvider, Provider};
use alloy::rpc::types::{BlockNumberOrTag, Filter, Log};
use async_trait::async_trait;
use tokio::time::{interval, timeout};

use crate::blockchain::transport::OracleNetwork;
use crate::blockchain::types::{
    BlockchainError, BlockchainResult, ConnectionState, FulfillmentReceipt, TransportKind,
};
use crate::observability::metrics;

/// Interval between receipt lookups while a transaction is pending.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Node operations the oracle depends on.
///
/// Implemented by [`NodeConnection`] for real nodes and by stubs in tests.
#[async_trait]
pub trait ChainNode: Send + Sync {
    /// Transport this node handle runs over.
    fn transport(&self) -> TransportKind;

    /// Chain id, queried from the node on every call.
    async fn chain_id(&self) -> BlockchainResult<u64>;

    async fn block_number(&self) -> BlockchainResult<u64>;

    /// Transaction count (next nonce) of `address`.
    async fn transaction_count(&self, address: Address) -> BlockchainResult<u64>;

    /// Node's current suggested gas price in wei.
    async fn gas_price(&self) -> BlockchainResult<u128>;

    async fn new_filter(&self, filter: &Filter) -> BlockchainResult<U256>;

    /// Logs that matched `id` since the previous call.
    async fn filter_changes(&self, id: U256) -> BlockchainResult<Vec<Log>>;

    async fn uninstall_filter(&self, id: U256) -> BlockchainResult<bool>;

    async fn send_raw_transaction(&self, raw: Bytes) -> BlockchainResult<TxHash>;

    /// Wait until `tx_hash` is included, up to `max_wait`.
    async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        max_wait: Duration,
    ) -> BlockchainResult<FulfillmentReceipt>;

    /// Live connectivity check.
    async fn is_connected(&self) -> bool {
        self.chain_id().await.is_ok()
    }

    /// Live connection state: transport, liveness and chain id.
    async fn connection_state(&self) -> ConnectionState {
        match self.chain_id().await {
            Ok(chain_id) => ConnectionState {
                transport: Some(self.transport()),
                connected: true,
                chain_id: Some(chain_id),
            },
            Err(_) => ConnectionState {
                transport: Some(self.transport()),
                connected: false,
                chain_id: None,
            },
        }
    }
}

/// Connection to a blockchain node over one transport.
#[derive(Clone)]
pub struct NodeConnection {
    provider: DynProvider<OracleNetwork>,
    transport: TransportKind,
    /// Request timeout duration.
    request_timeout: Duration,
}

impl NodeConnection {
    pub fn new(
        provider: DynProvider<OracleNetwork>,
        transport: TransportKind,
        request_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            transport,
            request_timeout,
        }
    }

    /// Fetch the latest block header.
    ///
    /// Proof-of-authority chains carry oversized `extraData` and extra seal
    /// fields; this succeeds only because the provider decodes headers with
    /// the catch-all network type.
    pub async fn probe_latest_header(&self) -> BlockchainResult<Option<u64>> {
        let block = self
            .call(
                "eth_getBlockByNumber",
                self.provider.get_block_by_number(BlockNumberOrTag::Latest),
            )
            .await?;
        Ok(block.map(|b| b.header.number))
    }

    /// Run one RPC request under the request timeout.
    async fn call<F, T, E>(&self, op: &'static str, request: F) -> BlockchainResult<T>
    where
        F: IntoFuture<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        match timeout(self.request_timeout, request).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => {
                tracing::warn!(op, transport = %self.transport, error = %e, "RPC error");
                Err(BlockchainError::Rpc(format!("{}: {}", op, e)))
            }
            Err(_) => {
                tracing::warn!(op, transport = %self.transport, "RPC timeout");
                Err(BlockchainError::Timeout {
                    op,
                    secs: self.request_timeout.as_secs(),
                })
            }
        }
    }
}

#[async_trait]
impl ChainNode for NodeConnection {
    fn transport(&self) -> TransportKind {
        self.transport
    }

    async fn chain_id(&self) -> BlockchainResult<u64> {
        self.call("eth_chainId", self.provider.get_chain_id()).await
    }

    async fn block_number(&self) -> BlockchainResult<u64> {
        self.call("eth_blockNumber", self.provider.get_block_number())
            .await
    }

    async fn transaction_count(&self, address: Address) -> BlockchainResult<u64> {
        self.call(
            "eth_getTransactionCount",
            self.provider.get_transaction_count(address),
        )
        .await
    }

    async fn gas_price(&self) -> BlockchainResult<u128> {
        self.call("eth_gasPrice", self.provider.get_gas_price()).await
    }

    async fn new_filter(&self, filter: &Filter) -> BlockchainResult<U256> {
        self.call("eth_newFilter", self.provider.new_filter(filter))
            .await
    }

    async fn filter_changes(&self, id: U256) -> BlockchainResult<Vec<Log>> {
        self.call(
            "eth_getFilterChanges",
            self.provider.get_filter_changes::<Log>(id),
        )
        .await
    }

    async fn uninstall_filter(&self, id: U256) -> BlockchainResult<bool> {
        self.call("eth_uninstallFilter", self.provider.uninstall_filter(id))
            .await
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> BlockchainResult<TxHash> {
        let pending = self
            .call(
                "eth_sendRawTransaction",
                self.provider.send_raw_transaction(&raw),
            )
            .await?;
        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        max_wait: Duration,
    ) -> BlockchainResult<FulfillmentReceipt> {
        let result = timeout(max_wait, async {
            let mut ticker = interval(RECEIPT_POLL_INTERVAL);

            loop {
                ticker.tick().await;

                let receipt = match self
                    .call(
                        "eth_getTransactionReceipt",
                        self.provider.get_transaction_receipt(tx_hash),
                    )
                    .await?
                {
                    Some(r) => r,
                    None => {
                        tracing::debug!(tx_hash = %tx_hash, "Transaction pending");
                        continue;
                    }
                };

                return Ok(FulfillmentReceipt {
                    tx_hash,
                    block_number: receipt.block_number(),
                    success: receipt.status(),
                });
            }
        })
        .await;

        match result {
            Ok(receipt) => receipt,
            Err(_) => Err(BlockchainError::Timeout {
                op: "receipt",
                secs: max_wait.as_secs(),
            }),
        }
    }

    async fn is_connected(&self) -> bool {
        let connected = self.chain_id().await.is_ok();
        metrics::record_node_connected(connected);
        connected
    }
}

impl std::fmt::Debug for NodeConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeConnection")
            .field("transport", &self.transport)
            .field("timeout_secs", &self.request_timeout.as_secs())
            .finish()
    }
}
