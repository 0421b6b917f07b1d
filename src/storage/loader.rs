//! One-shot storage plugin loading.
//!
//! Resolve the factory, parse the options, then await the factory. Any failure
//! aborts API listener startup.

use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;

use crate::observability::metrics;
use crate::storage::backend::PluginHandle;
use crate::storage::registry::PluginRegistry;

/// Failure to produce the storage plugin.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("storage plugin package {package:?} is not registered (known: {known:?})")]
    UnknownPackage { package: String, known: Vec<String> },

    #[error("storage plugin options are not valid JSON: {0}")]
    InvalidOptions(#[source] serde_json::Error),

    #[error("storage plugin {package:?} failed to initialize: {reason:#}")]
    Factory { package: String, reason: anyhow::Error },

    #[error("storage plugin has already been loaded for this process")]
    AlreadyLoaded,
}

/// Loads the storage plugin exactly once.
#[derive(Debug)]
pub struct PluginLoader {
    registry: PluginRegistry,
    attempted: AtomicBool,
}

impl PluginLoader {
    pub fn new(registry: PluginRegistry) -> Self {
        Self {
            registry,
            attempted: AtomicBool::new(false),
        }
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Whether `load` has been called, successfully or not.
    pub fn attempted(&self) -> bool {
        self.attempted.load(Ordering::SeqCst)
    }

    /// Resolve `package`, parse `options_json` and create the plugin.
    ///
    /// Only the first call does any work; later calls fail with
    /// [`PluginError::AlreadyLoaded`].
    pub async fn load(&self, package: &str, options_json: &str) -> Result<PluginHandle, PluginError> {
        if self.attempted.swap(true, Ordering::SeqCst) {
            return Err(PluginError::AlreadyLoaded);
        }

        let result = self.load_inner(package, options_json).await;
        metrics::record_plugin_load(package, result.is_ok());
        match &result {
            Ok(handle) => tracing::info!(package, plugin = handle.name(), "Storage plugin loaded"),
            Err(e) => tracing::error!(package, error = %e, "Storage plugin failed to load"),
        }
        result
    }

    async fn load_inner(&self, package: &str, options_json: &str) -> Result<PluginHandle, PluginError> {
        let factory = self
            .registry
            .resolve(package)
            .ok_or_else(|| PluginError::UnknownPackage {
                package: package.to_string(),
                known: self.registry.packages().into_iter().map(String::from).collect(),
            })?;

        let options: Value = serde_json::from_str(options_json).map_err(PluginError::InvalidOptions)?;

        factory
            .create(options)
            .await
            .map_err(|reason| PluginError::Factory {
                package: package.to_string(),
                reason,
            })
    }
}
