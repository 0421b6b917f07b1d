//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming API request (after compression layer):
//!     → cors.rs (evaluate Origin against the allow-list)
//!         denied  → 403, request never reaches body parsing
//!         allowed → preflight answered, or passed on with CORS headers
//! ```
//!
//! # Design Decisions
//! - Policy evaluation is a pure function, independent of axum
//! - Fail closed: a missing Origin is denied unless `*` is configured
//! - The cockpit file server has no origin policy

pub mod cors;

pub use cors::{cors_middleware, CorsDecision, CorsPolicy, CorsRejection};
