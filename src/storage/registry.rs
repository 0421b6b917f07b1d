//! Plugin registry mapping identifiers to factories.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::storage::backend::PluginHandle;
use crate::storage::memory::{MemoryPluginFactory, MEMORY_PLUGIN_PACKAGE};

/// Boxed future returned by [`PluginFactory::create`].
pub type FactoryFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<PluginHandle>> + Send + 'a>>;

/// Produces a storage plugin from its parsed options.
pub trait PluginFactory: Send + Sync + 'static {
    fn create(&self, options: Value) -> FactoryFuture<'_>;
}

/// Identifier → factory map, populated before startup.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    factories: BTreeMap<String, Arc<dyn PluginFactory>>,
}

impl PluginRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every plugin compiled into this crate.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(MEMORY_PLUGIN_PACKAGE, MemoryPluginFactory);
        registry
    }

    /// Register `factory` under `package`, replacing any previous entry.
    pub fn register<F: PluginFactory>(&mut self, package: impl Into<String>, factory: F) -> &mut Self {
        self.factories.insert(package.into(), Arc::new(factory));
        self
    }

    pub fn resolve(&self, package: &str) -> Option<Arc<dyn PluginFactory>> {
        self.factories.get(package).cloned()
    }

    /// Registered identifiers, sorted.
    pub fn packages(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("packages", &self.packages())
            .finish()
    }
}
