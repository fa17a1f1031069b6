//! Off-chain price oracle library.

pub mod blockchain;
pub mod config;
pub mod engine;
pub mod feeds;
pub mod http;
pub mod lifecycle;
pub mod listener;
pub mod observability;
pub mod oracle;

pub use config::schema::OracleConfig;
pub use engine::{OracleEngine, QueryFacade};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
