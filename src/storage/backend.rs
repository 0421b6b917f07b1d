//! Abstract key-value storage capability.
//!
//! Every storage plugin implements [`KvStorage`]. Values are JSON documents so
//! route handlers can persist their request/response models directly.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

/// Boxed future returned by storage operations.
pub type StorageFuture<'a, T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send + 'a>>;

/// Shared handle to the process's single storage plugin.
pub type PluginHandle = Arc<dyn KvStorage>;

/// Async key-value storage contract.
pub trait KvStorage: Send + Sync + 'static {
    /// Identifier of the plugin, for logging.
    fn name(&self) -> &str;

    /// Check whether `key` holds a value.
    fn has<'a>(&'a self, key: &'a str) -> StorageFuture<'a, bool>;

    /// Read the value at `key`.
    fn get<'a>(&'a self, key: &'a str) -> StorageFuture<'a, Option<Value>>;

    /// Write `value` at `key`, replacing any previous value.
    fn set<'a>(&'a self, key: &'a str, value: Value) -> StorageFuture<'a, ()>;

    /// Delete the value at `key`, returning whether one existed.
    fn delete<'a>(&'a self, key: &'a str) -> StorageFuture<'a, bool>;
}
