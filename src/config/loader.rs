//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use crate::config::schema::ServerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variables merged over the file, keyed by config field.
pub const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("api_host", "API_HOST"),
    ("api_port", "API_PORT"),
    ("cockpit_host", "COCKPIT_HOST"),
    ("cockpit_port", "COCKPIT_PORT"),
    ("cockpit_www_root", "COCKPIT_WWW_ROOT"),
    ("api_cors_domain_csv", "API_CORS_DOMAIN_CSV"),
    ("storage_plugin_package", "STORAGE_PLUGIN_PACKAGE"),
    ("storage_plugin_options_json", "STORAGE_PLUGIN_OPTIONS_JSON"),
    ("log_level", "LOG_LEVEL"),
    ("api_body_limit_bytes", "API_BODY_LIMIT_BYTES"),
    ("metrics_address", "METRICS_ADDRESS"),
];

const INTEGER_KEYS: &[&str] = &["api_port", "cockpit_port", "api_body_limit_bytes"];

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from an optional TOML file plus the
/// process environment.
pub fn load_config(path: Option<&Path>) -> Result<ServerConfig, ConfigError> {
    let content = match path {
        Some(path) => fs::read_to_string(path).map_err(ConfigError::Io)?,
        None => String::new(),
    };
    load_config_from_str(&content, |name| std::env::var(name).ok())
}

/// Parse `content`, merge overrides from `lookup`, then validate.
pub fn load_config_from_str<F>(content: &str, lookup: F) -> Result<ServerConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut table: toml::Table = toml::from_str(content).map_err(ConfigError::Parse)?;

    for (key, var) in ENV_OVERRIDES {
        if let Some(raw) = lookup(var) {
            tracing::debug!(key, var, "Applying environment override");
            table.insert((*key).to_string(), override_value(key, raw));
        }
    }

    let config: ServerConfig = toml::Value::Table(table)
        .try_into()
        .map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Integer keys keep their string form when unparseable so that
/// deserialization reports the type mismatch.
fn override_value(key: &str, raw: String) -> toml::Value {
    if INTEGER_KEYS.contains(&key) {
        if let Ok(n) = raw.trim().parse::<i64>() {
            return toml::Value::Integer(n);
        }
    }
    toml::Value::String(raw)
}
