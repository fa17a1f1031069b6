//! Scripted collaborators for tests.
//!
//! Compiled for unit tests and, with the `test-util` feature, for the
//! integration tests under `tests/`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use alloy::primitives::{address, keccak256, Address, Bytes, TxHash, B256, U256};
use alloy::rpc::types::{Filter, Log};
use alloy::sol_types::SolEvent;
use async_trait::async_trait;

use crate::blockchain::client::ChainNode;
use crate::blockchain::contract::PriceValidationRequested;
use crate::blockchain::transaction::{SubmissionError, Submitter};
use crate::blockchain::transport::NodeConnector;
use crate::blockchain::types::{
    BlockchainError, BlockchainResult, ConnectivityError, FulfillmentReceipt, TransportKind,
};
use crate::blockchain::wallet::Wallet;
use crate::oracle::{AttestationSigner, SignedAttestation};

/// Anvil's first development key.
pub const TEST_PRIVATE_KEY: &str =
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Address of that key.
pub const TEST_SIGNER: Address = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");

pub const TEST_CONTRACT: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// In-memory node. Nonces advance on every broadcast, like a real pending count.
pub struct StubNode {
    pub transport: TransportKind,
    pub chain_id: AtomicU64,
    pub reachable: AtomicBool,
    pub nonce: AtomicU64,
    pub gas_price: u128,
    pub block: u64,
    pub receipt_success: bool,
    pub filter_batches: Mutex<VecDeque<BlockchainResult<Vec<Log>>>>,
    pub filters_installed: AtomicUsize,
    pub filters_uninstalled: AtomicUsize,
    pub filter_polls: AtomicUsize,
    pub sent: Mutex<Vec<Bytes>>,
}

impl StubNode {
    pub fn new(chain_id: u64) -> Self {
        Self {
            transport: TransportKind::WebSocket,
            chain_id: AtomicU64::new(chain_id),
            reachable: AtomicBool::new(true),
            nonce: AtomicU64::new(7),
            gas_price: 2_000_000_000,
            block: 1_000,
            receipt_success: true,
            filter_batches: Mutex::new(VecDeque::new()),
            filters_installed: AtomicUsize::new(0),
            filters_uninstalled: AtomicUsize::new(0),
            filter_polls: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Queue the result of one future filter poll.
    pub fn push_batch(&self, batch: BlockchainResult<Vec<Log>>) {
        lock(&self.filter_batches).push_back(batch);
    }

    pub fn sent(&self) -> Vec<Bytes> {
        lock(&self.sent).clone()
    }

    pub fn sent_count(&self) -> usize {
        lock(&self.sent).len()
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    fn ensure_reachable(&self) -> BlockchainResult<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BlockchainError::Rpc("connection refused".to_string()))
        }
    }
}

#[async_trait]
impl ChainNode for StubNode {
    fn transport(&self) -> TransportKind {
        self.transport
    }

    async fn chain_id(&self) -> BlockchainResult<u64> {
        self.ensure_reachable()?;
        Ok(self.chain_id.load(Ordering::SeqCst))
    }

    async fn block_number(&self) -> BlockchainResult<u64> {
        self.ensure_reachable()?;
        Ok(self.block)
    }

    async fn transaction_count(&self, _address: Address) -> BlockchainResult<u64> {
        self.ensure_reachable()?;
        Ok(self.nonce.load(Ordering::SeqCst))
    }

    async fn gas_price(&self) -> BlockchainResult<u128> {
        self.ensure_reachable()?;
        // Let a concurrent caller interleave between the nonce read and the send.
        tokio::task::yield_now().await;
        Ok(self.gas_price)
    }

    async fn new_filter(&self, _filter: &Filter) -> BlockchainResult<U256> {
        self.ensure_reachable()?;
        let n = self.filters_installed.fetch_add(1, Ordering::SeqCst);
        Ok(U256::from(n + 1))
    }

    async fn filter_changes(&self, _id: U256) -> BlockchainResult<Vec<Log>> {
        self.filter_polls.fetch_add(1, Ordering::SeqCst);
        lock(&self.filter_batches)
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn uninstall_filter(&self, _id: U256) -> BlockchainResult<bool> {
        self.filters_uninstalled.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> BlockchainResult<TxHash> {
        self.ensure_reachable()?;
        let hash = keccak256(&raw);
        lock(&self.sent).push(raw);
        self.nonce.fetch_add(1, Ordering::SeqCst);
        Ok(hash)
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        _max_wait: Duration,
    ) -> BlockchainResult<FulfillmentReceipt> {
        Ok(FulfillmentReceipt {
            tx_hash,
            block_number: Some(self.block + 1),
            success: self.receipt_success,
        })
    }
}

/// Connector that hands out one stub node, or fails both transports.
pub struct StubConnector {
    node: Option<Arc<StubNode>>,
    pub attempts: AtomicUsize,
}

impl StubConnector {
    pub fn connected(node: Arc<StubNode>) -> Self {
        Self {
            node: Some(node),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            node: None,
            attempts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl NodeConnector for StubConnector {
    async fn connect(&self) -> Result<Arc<dyn ChainNode>, ConnectivityError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        match &self.node {
            Some(node) => Ok(node.clone() as Arc<dyn ChainNode>),
            None => Err(ConnectivityError {
                attempts: vec![
                    (TransportKind::WebSocket, "timed out".to_string()),
                    (TransportKind::Http, "connection refused".to_string()),
                ],
            }),
        }
    }
}

/// Submitter that records attestations instead of sending them.
#[derive(Default)]
pub struct RecordingSubmitter {
    pub calls: Mutex<Vec<SignedAttestation>>,
    pub fail: AtomicBool,
}

impl RecordingSubmitter {
    pub fn calls(&self) -> Vec<SignedAttestation> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

#[async_trait]
impl Submitter for RecordingSubmitter {
    async fn submit(
        &self,
        _node: &dyn ChainNode,
        attestation: &SignedAttestation,
    ) -> Result<FulfillmentReceipt, SubmissionError> {
        lock(&self.calls).push(attestation.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(SubmissionError::Broadcast(BlockchainError::Rpc(
                "nonce too low".to_string(),
            )));
        }
        Ok(FulfillmentReceipt {
            tx_hash: attestation.digest,
            block_number: Some(1),
            success: true,
        })
    }
}

pub fn test_wallet() -> Wallet {
    match Wallet::from_private_key(TEST_PRIVATE_KEY) {
        Ok(wallet) => wallet,
        Err(e) => panic!("development key rejected: {}", e),
    }
}

pub fn test_signer() -> AttestationSigner {
    AttestationSigner::new(test_wallet(), TEST_CONTRACT, "SimpleOracle", "1")
}

/// A `PriceValidationRequested` log as returned by a filter poll.
pub fn request_log(asset_id: B256, requested_at: u64) -> Log {
    let event = PriceValidationRequested {
        assetId: asset_id,
        timestamp: U256::from(requested_at),
        requester: Address::repeat_byte(0x11),
    };
    Log {
        inner: alloy::primitives::Log {
            address: TEST_CONTRACT,
            data: event.encode_log_data(),
        },
        ..Default::default()
    }
}
