//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Engine stop → trigger per-task signal → task cleans up → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Engine stop
//! ```
//!
//! # Design Decisions
//! - Each background task owns its own shutdown coordinator
//! - Shutdown has timeout: tasks are aborted after the grace period

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use signals::wait_for_shutdown_signal;
