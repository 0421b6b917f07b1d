//! Key-value storage plugins.
//!
//! # Data Flow
//! ```text
//! storage_plugin_package + storage_plugin_options_json
//!     → loader.rs (resolve factory, parse options, create; once per process)
//!     → registry.rs (identifier → PluginFactory)
//!     → backend.rs (KvStorage capability)
//!     → PluginHandle shared read-only with every API route
//! ```
//!
//! # Design Decisions
//! - Backends are compiled in and selected by name at runtime
//! - The core never mutates or locks the plugin; concurrency is the
//!   plugin's own responsibility

pub mod backend;
pub mod loader;
pub mod memory;
pub mod registry;

pub use backend::{KvStorage, PluginHandle, StorageFuture};
pub use loader::{PluginError, PluginLoader};
pub use memory::{MemoryKvStorage, MemoryPluginFactory, MEMORY_PLUGIN_PACKAGE};
pub use registry::{FactoryFuture, PluginFactory, PluginRegistry};
