//! Attestation types shared by the signer, submitter and query surface.

use alloy::primitives::{Address, Bytes, B256, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::oracle::assets::{AssetId, AssetPair};

/// A price attestation signed by the oracle identity.
///
/// `signature` is the 65-byte `r || s || v` encoding of an EIP-712 signature
/// over `Price { pair, price: scaled_price, timestamp }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedAttestation {
    pub pair: AssetPair,
    pub asset_id: AssetId,
    /// Decimal price as observed.
    pub price: Decimal,
    /// Price in fixed-point units of 1e-6.
    pub scaled_price: U256,
    pub timestamp: u64,
    /// Chain id bound into the signing domain.
    pub chain_id: u64,
    pub signer: Address,
    pub digest: B256,
    pub signature: Bytes,
}
