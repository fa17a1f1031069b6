//! On-chain request listening.
//!
//! # Data Flow
//! ```text
//! oracle contract logs → machine.rs (filter poll, decode)
//!     → AssetMap (asset id → pair) → PriceTable (latest observation)
//!     → freshness.rs (window check)
//!     → AttestationSigner → Submitter → node
//! ```

pub mod freshness;
pub mod machine;

pub use freshness::FreshnessWindow;
pub use machine::{
    DropReason, EventListener, ListenerError, ListenerSettings, ListenerState, ParseError,
    PendingRequest, RequestOutcome,
};
