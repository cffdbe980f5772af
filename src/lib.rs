//! # Microkern
//!
//! A minimal plugin microkernel: a small core that discovers, loads and
//! dispatches to WebAssembly plugins it knows nothing about in advance.
//!
//! Plugins are dropped into a directory as `.wasm` or `.wat` files. The
//! kernel loads every unit that honors the plugin contract, skips the ones
//! that don't, and isolates the core from anything a plugin does at runtime.
//!
//! ## Features
//!
//! - **Directory Discovery**: Plugins are found by file convention, no registration
//! - **Partial Success**: One broken plugin never prevents the others from loading
//! - **Failure Boundary**: Plugin traps and errors come back as values
//! - **Hot Reload**: Rescan the directory without restarting
//!
//! ## Quick Start
//!
//! ```bash
//! # Open the interactive menu over ./plugins
//! microkern
//!
//! # Run plugin 1 once
//! microkern run 1 hello
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::needless_lifetimes)]
#![allow(clippy::use_self)]

pub mod core;
pub mod plugin;
pub mod shell;

// Re-export commonly used types
pub use crate::core::{Config, Kernel, KernelConfig, KernelError, KernelResult, KernelState};
pub use plugin::{
    DispatchError, LoadError, LoadFailure, LoadedPlugin, Plugin, PluginDirectory, PluginError,
    PluginLoader, PluginRegistry, PluginResult, PluginSummary, PluginUnit, WasmLoader,
};
pub use shell::{MenuChoice, Shell};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const APP_NAME: &str = "microkern";
