//! Request validation against the declared API document.
//!
//! # Data Flow
//! ```text
//! OpenAPI document (serde_json::Value)
//!     → validator.rs (compile path templates, parameter and body schemas)
//!
//! Incoming API request (after CORS and JSON parsing):
//!     → middleware.rs (match path + method, check parameters and body)
//!         rejected → 400/404/405/415, handler never runs
//!         accepted → business route
//! ```
//!
//! # Design Decisions
//! - Requests are validated, responses are not
//! - Compilation happens once, on a blocking task, before any route exists
//! - Every schema violation is reported, not just the first

pub mod middleware;
pub mod validator;

pub use middleware::validate_request;
pub use validator::{RequestRejection, RequestValidator, RequestView, SchemaError};
