//! Oracle engine: owned context, background tasks and the query facade.
//!
//! # Data Flow
//! ```text
//! start():  NodeConnector → OracleContext → MarketPoller + EventListener
//! queries:  QueryFacade → PriceTable / live ConnectionState / AttestationSigner
//! stop():   EventListener → MarketPoller → release node handle
//! ```
//!
//! # Design Decisions
//! - One engine owns every shared resource; nothing is global
//! - Background tasks are supervised with their own shutdown signal
//! - Collaborators (node, price source, submitter) are swappable for tests

pub mod context;
pub mod facade;
pub mod runtime;
pub mod supervisor;

pub use context::OracleContext;
pub use facade::{OracleStatus, QueryError, QueryFacade};
pub use runtime::{EngineParts, OracleEngine, OracleError};
pub use supervisor::{SupervisedTask, TaskExit};
