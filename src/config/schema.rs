//! Configuration schema definitions.
//!
//! The nine bootstrap keys are required: a config that omits any of them
//! fails to deserialize. Only the optional tuning keys carry defaults.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default JSON body limit for the API listener (50 MiB).
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 50 * 1024 * 1024;

/// Root configuration for the API server process.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host the API listener binds to.
    pub api_host: String,

    /// Port the API listener binds to (0 picks an ephemeral port).
    pub api_port: u16,

    /// Host the cockpit file server binds to.
    pub cockpit_host: String,

    /// Port the cockpit file server binds to (0 picks an ephemeral port).
    pub cockpit_port: u16,

    /// Static document root of the cockpit single-page app.
    pub cockpit_www_root: PathBuf,

    /// Comma-separated CORS origin allow-list (`*` allows every origin).
    pub api_cors_domain_csv: String,

    /// Registry identifier of the key-value storage plugin.
    pub storage_plugin_package: String,

    /// Storage plugin options, JSON encoded.
    pub storage_plugin_options_json: String,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Maximum accepted JSON request body on the API listener.
    #[serde(default = "default_body_limit")]
    pub api_body_limit_bytes: usize,

    /// Optional Prometheus scrape address (e.g. "127.0.0.1:9090").
    #[serde(default)]
    pub metrics_address: Option<String>,
}

fn default_body_limit() -> usize {
    DEFAULT_BODY_LIMIT_BYTES
}

impl ServerConfig {
    /// `host:port` of the API listener, for logging.
    pub fn api_endpoint(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }

    /// `host:port` of the cockpit file server, for logging.
    pub fn cockpit_endpoint(&self) -> String {
        format!("{}:{}", self.cockpit_host, self.cockpit_port)
    }
}
