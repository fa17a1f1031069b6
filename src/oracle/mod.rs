//! Oracle domain: tracked assets, the latest-price table and attestations.
//!
//! # Data Flow
//! ```text
//! configured labels → assets.rs (AssetPair ↔ AssetId)
//! poller           → prices.rs (PriceTable, sole writer)
//! listener/facade  → signer.rs (EIP-712 attestation) → types.rs
//! ```

pub mod assets;
pub mod prices;
pub mod signer;
pub mod types;

pub use assets::{AssetError, AssetId, AssetMap, AssetPair};
pub use prices::{PriceObservation, PriceTable};
pub use signer::{scale_price, AttestationSigner, SigningError, PRICE_DECIMALS};
pub use types::SignedAttestation;
