//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events, one `api-server` span)
//!     → metrics.rs (listener states, CORS and validation rejections)
//!
//! Consumers:
//!     → stdout via the fmt subscriber
//!     → optional Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - One logging interface (tracing); no ad-hoc console output
//! - Metrics are cheap no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
