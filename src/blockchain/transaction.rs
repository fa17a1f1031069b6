//! Fulfillment transaction building, signing, and confirmation.
//!
//! # Responsibilities
//! - Encode `fulfillPriceRequest` calldata from a signed attestation
//! - Build EIP-1559 transactions with a fresh nonce and gas price
//! - Sign locally and broadcast as a raw transaction
//! - Wait for the receipt and report success or revert
//!
//! Submissions from one signing identity are serialized: the nonce is read,
//! the transaction sent and its receipt awaited before the next submission
//! may read a nonce. Failed submissions are not retried.

use std::sync::Arc;
use std::time::Duration;

use alloy::eips::eip2718::Encodable2718;
use alloy::network::{Ethereum, TransactionBuilder};
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::blockchain::client::ChainNode;
use crate::blockchain::contract::fulfillPriceRequestCall;
use crate::blockchain::types::{BlockchainError, FulfillmentReceipt};
use crate::blockchain::wallet::Wallet;
use crate::config::SubmitterConfig;
use crate::oracle::types::SignedAttestation;

/// Errors from submitting a fulfillment.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("failed to read nonce: {0}")]
    Nonce(#[source] BlockchainError),

    #[error("failed to read gas price: {0}")]
    GasPrice(#[source] BlockchainError),

    #[error("failed to sign transaction: {0}")]
    Signing(String),

    #[error("broadcast rejected: {0}")]
    Broadcast(#[source] BlockchainError),

    #[error("receipt not obtained for {tx_hash}: {source}")]
    Receipt {
        tx_hash: TxHash,
        #[source]
        source: BlockchainError,
    },

    #[error("transaction {0} reverted")]
    Reverted(TxHash),
}

/// Delivers signed attestations on chain.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(
        &self,
        node: &dyn ChainNode,
        attestation: &SignedAttestation,
    ) -> Result<FulfillmentReceipt, SubmissionError>;
}

/// Submits `fulfillPriceRequest` transactions signed by the oracle wallet.
pub struct FulfillmentSubmitter {
    wallet: Wallet,
    contract: Address,
    gas_limit: u64,
    receipt_timeout: Duration,
    /// Held from nonce read until the receipt arrives.
    in_flight: Arc<Mutex<()>>,
}

impl FulfillmentSubmitter {
    pub fn new(wallet: Wallet, contract: Address, config: &SubmitterConfig) -> Self {
        Self {
            wallet,
            contract,
            gas_limit: config.gas_limit,
            receipt_timeout: Duration::from_secs(config.receipt_timeout_secs),
            in_flight: Arc::new(Mutex::new(())),
        }
    }

    /// Sender address of every fulfillment.
    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// ABI-encoded `fulfillPriceRequest(pair, price, timestamp, signature)`.
    pub fn calldata(attestation: &SignedAttestation) -> Bytes {
        fulfillPriceRequestCall {
            pair: attestation.pair.to_string(),
            price: attestation.scaled_price,
            timestamp: U256::from(attestation.timestamp),
            signature: attestation.signature.clone(),
        }
        .abi_encode()
        .into()
    }

    /// Build the transaction request for one attestation.
    ///
    /// The node's gas price is used as both the fee cap and the priority fee.
    pub fn build_request(
        &self,
        attestation: &SignedAttestation,
        nonce: u64,
        gas_price: u128,
        chain_id: u64,
    ) -> TransactionRequest {
        TransactionRequest::default()
            .with_from(self.wallet.address())
            .with_to(self.contract)
            .with_input(Self::calldata(attestation))
            .with_nonce(nonce)
            .with_chain_id(chain_id)
            .with_gas_limit(self.gas_limit)
            .with_max_fee_per_gas(gas_price)
            .with_max_priority_fee_per_gas(gas_price)
    }

    async fn sign_request(&self, request: TransactionRequest) -> Result<Bytes, SubmissionError> {
        let signer = self.wallet.transaction_signer();
        let envelope = <TransactionRequest as TransactionBuilder<Ethereum>>::build(request, &signer)
            .await
            .map_err(|e| SubmissionError::Signing(e.to_string()))?;
        Ok(envelope.encoded_2718().into())
    }
}

#[async_trait]
impl Submitter for FulfillmentSubmitter {
    async fn submit(
        &self,
        node: &dyn ChainNode,
        attestation: &SignedAttestation,
    ) -> Result<FulfillmentReceipt, SubmissionError> {
        let _guard = self.in_flight.lock().await;

        let nonce = node
            .transaction_count(self.wallet.address())
            .await
            .map_err(SubmissionError::Nonce)?;
        let gas_price = node.gas_price().await.map_err(SubmissionError::GasPrice)?;

        let request = self.build_request(attestation, nonce, gas_price, attestation.chain_id);
        let raw = self.sign_request(request).await?;

        let tx_hash = node
            .send_raw_transaction(raw)
            .await
            .map_err(SubmissionError::Broadcast)?;

        tracing::info!(
            pair = %attestation.pair,
            tx_hash = %tx_hash,
            nonce,
            gas_price,
            "Fulfillment transaction sent"
        );

        let receipt = node
            .wait_for_receipt(tx_hash, self.receipt_timeout)
            .await
            .map_err(|source| SubmissionError::Receipt { tx_hash, source })?;

        if !receipt.success {
            return Err(SubmissionError::Reverted(tx_hash));
        }

        tracing::info!(
            pair = %attestation.pair,
            tx_hash = %tx_hash,
            block_number = ?receipt.block_number,
            "Fulfillment confirmed"
        );

        Ok(receipt)
    }
}

impl std::fmt::Debug for FulfillmentSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FulfillmentSubmitter")
            .field("address", &self.wallet.address())
            .field("contract", &self.contract)
            .field("gas_limit", &self.gas_limit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::testing::{test_wallet, StubNode, TEST_CONTRACT};
    use crate::oracle::assets::AssetPair;
    use alloy::consensus::{Transaction, TxEnvelope};
    use alloy::eips::eip2718::Decodable2718;
    use alloy::primitives::B256;
    use rust_decimal::Decimal;

    fn submitter() -> FulfillmentSubmitter {
        FulfillmentSubmitter::new(test_wallet(), TEST_CONTRACT, &SubmitterConfig::default())
    }

    fn sent_nonces(node: &StubNode) -> Vec<u64> {
        node.sent()
            .iter()
            .map(|raw| TxEnvelope::decode_2718(&mut raw.as_ref()).unwrap().nonce())
            .collect()
    }

    fn attestation() -> SignedAttestation {
        let pair = AssetPair::parse("BTC/USDT").unwrap();
        SignedAttestation {
            asset_id: pair.asset_id(),
            pair,
            price: Decimal::new(50000123456, 6),
            scaled_price: U256::from(50000123456u64),
            timestamp: 108,
            chain_id: 1337,
            signer: Address::ZERO,
            digest: B256::ZERO,
            signature: Bytes::from(vec![1u8; 65]),
        }
    }

    #[test]
    fn test_calldata_selector() {
        let data = FulfillmentSubmitter::calldata(&attestation());
        assert_eq!(&data[..4], fulfillPriceRequestCall::SELECTOR.as_slice());

        let decoded = fulfillPriceRequestCall::abi_decode(&data).unwrap();
        assert_eq!(decoded.pair, "BTC/USDT");
        assert_eq!(decoded.timestamp, U256::from(108u64));
    }

    #[tokio::test]
    async fn test_submit_uses_fresh_nonce() {
        let node = StubNode::new(1337);
        let submitter = submitter();

        let receipt = submitter.submit(&node, &attestation()).await.unwrap();
        assert!(receipt.success);
        submitter.submit(&node, &attestation()).await.unwrap();

        let sent = node.sent();
        assert_eq!(sent.len(), 2);

        let first = TxEnvelope::decode_2718(&mut sent[0].as_ref()).unwrap();
        let second = TxEnvelope::decode_2718(&mut sent[1].as_ref()).unwrap();
        assert!(first.is_eip1559());
        assert_eq!(first.nonce(), 7);
        assert_eq!(second.nonce(), 8);
        assert_eq!(first.gas_limit(), 300_000);
        assert_eq!(first.chain_id(), Some(1337));
        assert_eq!(first.max_fee_per_gas(), 2_000_000_000);
    }

    #[tokio::test]
    async fn test_concurrent_submits_take_distinct_nonces() {
        let node = StubNode::new(1337);
        let submitter = submitter();
        let att = attestation();

        let (a, b) = tokio::join!(submitter.submit(&node, &att), submitter.submit(&node, &att));
        assert!(a.is_ok());
        assert!(b.is_ok());

        let mut nonces = sent_nonces(&node);
        nonces.sort_unstable();
        assert_eq!(nonces, vec![7, 8]);
    }

    #[tokio::test]
    async fn test_reverted_receipt() {
        let mut node = StubNode::new(1337);
        node.receipt_success = false;

        let err = submitter().submit(&node, &attestation()).await.unwrap_err();
        assert!(matches!(err, SubmissionError::Reverted(_)));
    }

    #[tokio::test]
    async fn test_unreachable_node() {
        let node = StubNode::new(1337);
        node.set_reachable(false);

        let err = submitter().submit(&node, &attestation()).await.unwrap_err();
        assert!(matches!(err, SubmissionError::Nonce(_)));
        assert_eq!(node.sent_count(), 0);
    }
}
