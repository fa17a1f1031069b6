//! Oracle contract bindings and its statically declared interface.

use alloy::primitives::B256;
use alloy::sol;
use alloy::sol_types::SolEvent;

sol! {
    /// Emitted when a caller asks the oracle to attest a price.
    #[derive(Debug, PartialEq, Eq)]
    event PriceValidationRequested(bytes32 indexed assetId, uint256 timestamp, address indexed requester);

    /// Delivers a signed attestation for a pending request.
    function fulfillPriceRequest(string pair, uint256 price, uint256 timestamp, bytes signature);

    /// EIP-712 message signed by the oracle.
    #[derive(Debug, PartialEq, Eq)]
    struct Price {
        string pair;
        uint256 price;
        uint256 timestamp;
    }
}

/// Events the oracle contract is known to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleEvent {
    PriceValidationRequested,
}

impl OracleEvent {
    pub const ALL: [OracleEvent; 1] = [OracleEvent::PriceValidationRequested];

    pub fn name(&self) -> &'static str {
        match self {
            OracleEvent::PriceValidationRequested => "PriceValidationRequested",
        }
    }

    /// Canonical Solidity signature, e.g. `PriceValidationRequested(bytes32,uint256,address)`.
    pub fn signature(&self) -> &'static str {
        match self {
            OracleEvent::PriceValidationRequested => PriceValidationRequested::SIGNATURE,
        }
    }

    /// Topic0 of the event's logs.
    pub fn topic(&self) -> B256 {
        match self {
            OracleEvent::PriceValidationRequested => PriceValidationRequested::SIGNATURE_HASH,
        }
    }
}

/// Static description of the oracle contract's events.
#[derive(Debug, Clone)]
pub struct OracleInterface {
    events: Vec<OracleEvent>,
}

impl OracleInterface {
    /// The interface this build of the oracle was compiled against.
    pub fn declared() -> Self {
        Self {
            events: OracleEvent::ALL.to_vec(),
        }
    }

    /// Interface with an explicit event list.
    pub fn with_events(events: Vec<OracleEvent>) -> Self {
        Self { events }
    }

    pub fn event(&self, name: &str) -> Option<OracleEvent> {
        self.events.iter().copied().find(|e| e.name() == name)
    }

    pub fn event_names(&self) -> Vec<&'static str> {
        self.events.iter().map(|e| e.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::keccak256;

    #[test]
    fn test_declared_interface_lookup() {
        let interface = OracleInterface::declared();
        assert_eq!(
            interface.event("PriceValidationRequested"),
            Some(OracleEvent::PriceValidationRequested)
        );
        assert!(interface.event("PriceRequested").is_none());
        assert!(OracleInterface::with_events(vec![])
            .event("PriceValidationRequested")
            .is_none());
    }

    #[test]
    fn test_event_signature() {
        let event = OracleEvent::PriceValidationRequested;
        assert_eq!(event.signature(), "PriceValidationRequested(bytes32,uint256,address)");
        assert_eq!(event.topic(), keccak256(event.signature()));
    }
}
