//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → environment overrides (ORACLE_* variables)
//!     → validation.rs (semantic checks)
//!     → OracleConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the engine is built once per process
//! - All fields have defaults to allow minimal configs
//! - The signing key never lives in the config; see `blockchain::wallet`

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    HttpConfig, ListenerConfig, NodeConfig, ObservabilityConfig, OracleConfig, OracleSettings,
    PriceSourceConfig, ShutdownConfig, SubmitterConfig,
};
pub use validation::{validate_config, ValidationError};
