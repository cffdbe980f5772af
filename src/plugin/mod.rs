//! Plugin system for Microkern.
//!
//! This module provides everything the kernel needs to bring third-party
//! code in at runtime: discovery of candidate units, a loader interface, a
//! WASM-based loader, the contract every plugin satisfies, and the registry
//! that owns loaded plugins.
//!
//! # Architecture
//!
//! Plugins are WebAssembly modules executed with wasmtime. The core never
//! knows plugin identities in advance; it only sees [`Plugin`] trait objects
//! produced by a [`PluginLoader`].
//!
//! ```text
//! PluginDirectory::scan -> PluginUnit -> PluginLoader::load -> PluginRegistry
//! ```

mod contract;
mod discovery;
mod error;
mod host;
mod loader;
mod registry;
mod runtime;
mod types;

pub use contract::{LoadedPlugin, Plugin};
pub use discovery::PluginDirectory;
pub use error::{DispatchError, LoadError, LoadFailure, PluginError, PluginResult, Severity};
pub use host::{link_host_functions, HostState, LogLevel};
pub use loader::PluginLoader;
pub use registry::PluginRegistry;
pub use runtime::{WasmLoader, WasmPlugin};
pub use types::{
    PluginSummary, PluginUnit, DEFAULT_EXTENSIONS, HOST_MODULE, PLUGIN_ABI_VERSION, PLUGIN_EXPORT,
    RESERVED_PREFIX,
};
