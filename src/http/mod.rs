//! HTTP query surface.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, timeout, tracing)
//!     → handlers.rs (pair normalisation via QueryFacade)
//!     → response.rs (JSON bodies)
//!     → Send to client
//! ```
//!
//! # Routes
//! - `GET /` banner
//! - `GET /price/{pair}` latest observation, 404 if untracked or not yet observed
//! - `GET /signed_price/{pair}` attestation, 404 as above, 500 on signing failure
//! - `GET /status` tracked pairs, prices, connection and listener state

pub mod handlers;
pub mod response;
pub mod server;

pub use server::{AppState, HttpServer};
