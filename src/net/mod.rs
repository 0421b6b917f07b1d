//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ApiServer
//!     → listener.rs (bind, serve an axum Router, graceful close)
//!
//! Listener States:
//!     Unbound → Binding → Bound | BindFailed
//!     Bound → Closing → Closed | CloseFailed
//! ```
//!
//! # Design Decisions
//! - One handle per logical listener, owned by the lifecycle object
//! - Binding and closing are the only suspension points
//! - Closing a listener that never bound is a no-op

pub mod listener;

pub use listener::{ListenerError, ListenerHandle, ListenerState};
