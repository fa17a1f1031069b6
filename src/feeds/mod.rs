//! Market price feeds.
//!
//! # Data Flow
//! ```text
//! exchange REST API → binance.rs (PriceSource)
//!     → poller.rs (one tick per interval, all pairs)
//!     → oracle::PriceTable (latest observation per pair)
//! ```

pub mod binance;
pub mod poller;
pub mod source;

pub use binance::BinanceSource;
pub use poller::{unix_now, MarketPoller, TickSummary};
pub use source::{FetchError, PriceSource};
