//! Chain-specific types and error definitions.

use std::fmt;

use alloy::primitives::TxHash;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of transport a node connection runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Persistent, subscription-capable transport.
    WebSocket,
    /// Plain request/response transport.
    Http,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::WebSocket => f.write_str("websocket"),
            TransportKind::Http => f.write_str("http"),
        }
    }
}

/// Live view of the node connection.
///
/// `chain_id` is only meaningful while `connected` is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionState {
    pub transport: Option<TransportKind>,
    pub connected: bool,
    pub chain_id: Option<u64>,
}

impl ConnectionState {
    pub fn disconnected() -> Self {
        Self {
            transport: None,
            connected: false,
            chain_id: None,
        }
    }
}

/// Outcome of a mined fulfillment transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentReceipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub success: bool,
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {secs} seconds ({op})")]
    Timeout { op: &'static str, secs: u64 },

    /// Invalid private key format or signing failure.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Transport could not be opened.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Blockchain client not initialized or already released.
    #[error("Blockchain not available: {0}")]
    NotAvailable(String),
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// Every transport stage failed; the node is unreachable.
#[derive(Debug, Error)]
#[error("all node transports failed: {}", describe_attempts(.attempts))]
pub struct ConnectivityError {
    pub attempts: Vec<(TransportKind, String)>,
}

fn describe_attempts(attempts: &[(TransportKind, String)]) -> String {
    if attempts.is_empty() {
        return "no transport configured".to_string();
    }
    attempts
        .iter()
        .map(|(kind, reason)| format!("{}: {}", kind, reason))
        .collect::<Vec<_>>()
        .join("; ")
}
