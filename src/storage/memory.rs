//! In-memory storage plugin.
//!
//! Entries live in a [`DashMap`] for the lifetime of the process.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Deserialize;
use serde_json::Value;

use crate::storage::backend::{KvStorage, PluginHandle, StorageFuture};
use crate::storage::registry::{FactoryFuture, PluginFactory};

/// Registry identifier of the in-memory plugin.
pub const MEMORY_PLUGIN_PACKAGE: &str = "bif-plugin-kv-storage-memory";

/// Options accepted by [`MemoryPluginFactory`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MemoryOptions {
    /// Maximum number of distinct keys; unbounded when absent.
    #[serde(default)]
    pub max_entries: Option<usize>,
}

/// DashMap-backed [`KvStorage`].
#[derive(Debug, Default)]
pub struct MemoryKvStorage {
    entries: DashMap<String, Value>,
    max_entries: Option<usize>,
}

impl MemoryKvStorage {
    pub fn new(options: MemoryOptions) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: options.max_entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStorage for MemoryKvStorage {
    fn name(&self) -> &str {
        MEMORY_PLUGIN_PACKAGE
    }

    fn has<'a>(&'a self, key: &'a str) -> StorageFuture<'a, bool> {
        Box::pin(async move { Ok(self.entries.contains_key(key)) })
    }

    fn get<'a>(&'a self, key: &'a str) -> StorageFuture<'a, Option<Value>> {
        Box::pin(async move { Ok(self.entries.get(key).map(|v| v.value().clone())) })
    }

    fn set<'a>(&'a self, key: &'a str, value: Value) -> StorageFuture<'a, ()> {
        Box::pin(async move {
            if let Some(max) = self.max_entries {
                if !self.entries.contains_key(key) && self.entries.len() >= max {
                    anyhow::bail!("memory storage is full ({max} entries)");
                }
            }
            self.entries.insert(key.to_string(), value);
            Ok(())
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> StorageFuture<'a, bool> {
        Box::pin(async move { Ok(self.entries.remove(key).is_some()) })
    }
}

/// Factory for [`MemoryKvStorage`].
#[derive(Debug, Default)]
pub struct MemoryPluginFactory;

impl PluginFactory for MemoryPluginFactory {
    fn create(&self, options: Value) -> FactoryFuture<'_> {
        Box::pin(async move {
            // `{}` and `null` both mean defaults.
            let options: MemoryOptions = if options.is_null() {
                MemoryOptions::default()
            } else {
                serde_json::from_value(options)?
            };
            tracing::debug!(max_entries = ?options.max_entries, "Creating memory storage");
            let handle: PluginHandle = Arc::new(MemoryKvStorage::new(options));
            Ok::<_, anyhow::Error>(handle)
        })
    }
}
