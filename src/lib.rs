//! BIF API server library.
//!
//! Brings up the cockpit file server and the validated JSON API, loads the
//! storage plugin and coordinates shutdown of both listeners.

pub mod config;
pub mod consortium;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod openapi;
pub mod security;
pub mod storage;
pub mod validation;

pub use config::{load_config, ServerConfig};
pub use lifecycle::{ApiServer, ShutdownReport, StartupError};
pub use storage::{KvStorage, PluginHandle, PluginRegistry};
