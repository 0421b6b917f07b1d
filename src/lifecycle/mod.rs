//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     ApiServer::new (validate config)
//!     → start: cockpit listener → API router composition → API listener
//!     → on failure: shutdown of whatever bound, error returned
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → caller runs shutdown
//!
//! Shutdown (shutdown.rs):
//!     close bound listeners concurrently → ShutdownReport
//! ```
//!
//! # Design Decisions
//! - Ordered startup: cockpit first, API last
//! - Shutdown attempts every close and aggregates failures
//! - No timeouts: a hanging bind or plugin load blocks startup

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownReport};
pub use signals::shutdown_signal;
pub use startup::{ApiServer, StartupError, API_LISTENER, COCKPIT_LISTENER};
