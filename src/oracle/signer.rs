//! EIP-712 price attestation signing.
//!
//! The chain id in the signing domain is read from the node on every call,
//! so an attestation is never bound to a chain the process has since left.

use alloy::primitives::{Address, B256, U256};
use alloy::sol_types::{Eip712Domain, SolStruct};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::blockchain::contract::Price;
use crate::blockchain::{BlockchainError, ChainNode, Wallet};
use crate::oracle::assets::AssetPair;
use crate::oracle::types::SignedAttestation;

/// Fixed-point scale of attested prices.
pub const PRICE_DECIMALS: u32 = 6;

/// Errors from producing an attestation.
#[derive(Debug, Error)]
pub enum SigningError {
    /// The node could not supply a live chain id.
    #[error("chain id unavailable: {0}")]
    ChainUnavailable(#[source] BlockchainError),

    /// The signing identity rejected the digest.
    #[error("signing identity failed: {0}")]
    Identity(#[source] BlockchainError),

    #[error("price {0} cannot be represented as a 6-decimal unsigned integer")]
    InvalidPrice(Decimal),
}

/// Scale a decimal price to integer units of 1e-6, truncating extra digits.
pub fn scale_price(price: Decimal) -> Result<U256, SigningError> {
    if price.is_sign_negative() {
        return Err(SigningError::InvalidPrice(price));
    }
    price
        .checked_mul(Decimal::from(10u64.pow(PRICE_DECIMALS)))
        .map(|scaled| scaled.trunc())
        .and_then(|scaled| scaled.to_u128())
        .map(U256::from)
        .ok_or(SigningError::InvalidPrice(price))
}

/// Signs prices with the oracle identity for one verifying contract.
#[derive(Debug, Clone)]
pub struct AttestationSigner {
    wallet: Wallet,
    contract: Address,
    domain_name: String,
    domain_version: String,
}

impl AttestationSigner {
    pub fn new(
        wallet: Wallet,
        contract: Address,
        domain_name: impl Into<String>,
        domain_version: impl Into<String>,
    ) -> Self {
        Self {
            wallet,
            contract,
            domain_name: domain_name.into(),
            domain_version: domain_version.into(),
        }
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn domain(&self, chain_id: u64) -> Eip712Domain {
        Eip712Domain::new(
            Some(self.domain_name.clone().into()),
            Some(self.domain_version.clone().into()),
            Some(U256::from(chain_id)),
            Some(self.contract),
            None,
        )
    }

    /// Typed-data digest of `(pair, scaled_price, timestamp)` under `chain_id`.
    pub fn digest(
        &self,
        pair: &AssetPair,
        scaled_price: U256,
        timestamp: u64,
        chain_id: u64,
    ) -> B256 {
        let message = Price {
            pair: pair.to_string(),
            price: scaled_price,
            timestamp: U256::from(timestamp),
        };
        message.eip712_signing_hash(&self.domain(chain_id))
    }

    /// Sign `price` for `pair` at `timestamp`, using the node's current chain id.
    pub async fn sign(
        &self,
        node: &dyn ChainNode,
        pair: &AssetPair,
        price: Decimal,
        timestamp: u64,
    ) -> Result<SignedAttestation, SigningError> {
        let scaled_price = scale_price(price)?;
        let chain_id = node.chain_id().await.map_err(SigningError::ChainUnavailable)?;

        let digest = self.digest(pair, scaled_price, timestamp, chain_id);
        let signature = self
            .wallet
            .sign_hash(digest)
            .await
            .map_err(SigningError::Identity)?;

        tracing::debug!(pair = %pair, %scaled_price, timestamp, chain_id, "Price attested");

        Ok(SignedAttestation {
            pair: pair.clone(),
            asset_id: pair.asset_id(),
            price,
            scaled_price,
            timestamp,
            chain_id,
            signer: self.wallet.address(),
            digest,
            signature: signature.as_bytes().to_vec().into(),
        })
    }
}
