//! HTTP surfaces of the two listeners.
//!
//! # Data Flow
//! ```text
//! cockpit listener
//!     → files.rs (static files, index.html fallback)
//!
//! API listener
//!     → server.rs (request id, trace, compression, CORS)
//!     → body.rs (size-limited JSON parsing)
//!     → validation (declared paths, parameters, bodies)
//!     → health.rs | business endpoints
//! ```

pub mod body;
pub mod files;
pub mod health;
pub mod server;

pub use body::{BodyRejection, JsonBody};
pub use files::cockpit_router;
pub use health::{HealthCheckResponse, HEALTHCHECK_PATH};
pub use server::{ApiRouterBuilder, ApiState, BuildError, Endpoint, Stage};
