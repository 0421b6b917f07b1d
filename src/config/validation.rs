//! Configuration validation.
//!
//! Serde handles presence and types; this pass checks values. Every problem
//! is reported, not just the first one.

use std::net::SocketAddr;

use crate::config::schema::ServerConfig;

/// Log levels accepted by `log_level`.
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a [`ServerConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a deserialized configuration.
///
/// `storage_plugin_options_json` is deliberately not parsed here: a malformed
/// value is a plugin load failure at startup, not a construction error.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.api_host.trim().is_empty() {
        errors.push(ValidationError::new("api_host", "must not be empty"));
    }
    if config.cockpit_host.trim().is_empty() {
        errors.push(ValidationError::new("cockpit_host", "must not be empty"));
    }
    if config.cockpit_www_root.as_os_str().is_empty() {
        errors.push(ValidationError::new("cockpit_www_root", "must not be empty"));
    }
    if config.api_cors_domain_csv.split(',').all(|o| o.trim().is_empty()) {
        errors.push(ValidationError::new(
            "api_cors_domain_csv",
            "must name at least one origin (use \"*\" to allow all)",
        ));
    }
    if config.storage_plugin_package.trim().is_empty() {
        errors.push(ValidationError::new("storage_plugin_package", "must not be empty"));
    }
    if !LOG_LEVELS.contains(&config.log_level.as_str()) {
        errors.push(ValidationError::new(
            "log_level",
            format!("unknown level {:?}, expected one of {:?}", config.log_level, LOG_LEVELS),
        ));
    }
    if config.api_body_limit_bytes == 0 {
        errors.push(ValidationError::new("api_body_limit_bytes", "must be greater than zero"));
    }
    if config.api_port != 0
        && config.api_port == config.cockpit_port
        && config.api_host == config.cockpit_host
    {
        errors.push(ValidationError::new(
            "api_port",
            format!("conflicts with the cockpit listener on {}", config.cockpit_endpoint()),
        ));
    }
    if let Some(addr) = &config.metrics_address {
        if addr.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                "metrics_address",
                format!("{addr:?} is not a socket address"),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
