//! JSON bodies returned by the query surface.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::blockchain::TransportKind;
use crate::engine::OracleStatus;
use crate::listener::ListenerState;
use crate::oracle::{PriceObservation, SignedAttestation};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
}

/// `GET /price/{pair}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceResponse {
    pub asset_pair: String,
    /// Decimal string.
    pub price: String,
    pub timestamp: u64,
}

impl From<PriceObservation> for PriceResponse {
    fn from(observation: PriceObservation) -> Self {
        Self {
            asset_pair: observation.pair.to_string(),
            price: observation.price.to_string(),
            timestamp: observation.observed_at,
        }
    }
}

/// `GET /signed_price/{pair}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedPriceResponse {
    pub asset_pair: String,
    /// 0x-prefixed hex.
    pub asset_id: String,
    pub price: String,
    /// Price scaled by 1e6, decimal string.
    pub price_uint256: String,
    pub timestamp: u64,
    pub chain_id: u64,
    /// 0x-prefixed 65-byte hex.
    pub signature: String,
}

impl From<SignedAttestation> for SignedPriceResponse {
    fn from(attestation: SignedAttestation) -> Self {
        Self {
            asset_pair: attestation.pair.to_string(),
            asset_id: attestation.asset_id.to_string(),
            price: attestation.price.to_string(),
            price_uint256: attestation.scaled_price.to_string(),
            timestamp: attestation.timestamp,
            chain_id: attestation.chain_id,
            signature: alloy::hex::encode_prefixed(&attestation.signature),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceData {
    pub price: String,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerStatus {
    pub active: bool,
    pub state: Option<ListenerState>,
    pub node_connected: bool,
    pub transport: Option<TransportKind>,
    pub chain_id: Option<u64>,
    pub contract_address: String,
    pub signer_address: String,
}

/// `GET /status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub tracked_pairs: Vec<String>,
    /// `null` for pairs without an observation yet.
    pub latest_prices: BTreeMap<String, Option<PriceData>>,
    pub poll_interval_seconds: u64,
    pub event_listener: ListenerStatus,
}

impl From<OracleStatus> for StatusResponse {
    fn from(status: OracleStatus) -> Self {
        let latest_prices = status
            .tracked_pairs
            .iter()
            .map(|pair| {
                let data = status.latest_prices.get(pair).map(|o| PriceData {
                    price: o.price.to_string(),
                    timestamp: o.observed_at,
                });
                (pair.to_string(), data)
            })
            .collect();

        Self {
            tracked_pairs: status.tracked_pairs.iter().map(|p| p.to_string()).collect(),
            latest_prices,
            poll_interval_seconds: status.poll_interval_secs,
            event_listener: ListenerStatus {
                active: matches!(
                    status.listener,
                    Some(ListenerState::Subscribed | ListenerState::Polling)
                ),
                state: status.listener,
                node_connected: status.connection.connected,
                transport: status.connection.transport,
                chain_id: status.connection.chain_id,
                contract_address: status.contract_address.to_string(),
                signer_address: status.signer_address.to_string(),
            },
        }
    }
}

/// Error body for non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}
