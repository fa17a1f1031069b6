//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Config (RPC URL, optional WS URL)
//!     → transport.rs (WebSocket first, HTTP fallback, liveness check)
//!     → client.rs (node queries, log filters, raw broadcast, receipts)
//!
//! Environment Variables (private key)
//!     → wallet.rs (key loading, digest and transaction signing)
//!     → transaction.rs (fulfillment build, sign, broadcast, confirm)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts

pub mod client;
pub mod contract;
pub mod transaction;
pub mod transport;
pub mod types;
pub mod wallet;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use client::{ChainNode, NodeConnection};
pub use contract::{OracleEvent, OracleInterface};
pub use transaction::{FulfillmentSubmitter, SubmissionError, Submitter};
pub use transport::{ConnectionManager, NodeConnector, OracleNetwork, TransportStrategy};
pub use types::{
    BlockchainError, BlockchainResult, ConnectionState, ConnectivityError,
    FulfillmentReceipt, TransportKind,
};
pub use wallet::Wallet;
