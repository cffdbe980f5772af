//! Core types and functionality for Microkern.
//!
//! This module contains the kernel that orchestrates the plugin system and
//! the configuration it is built from.

mod config;
mod kernel;

pub use config::{Config, KernelConfig, LOCAL_CONFIG_FILE};
pub use kernel::{Kernel, KernelError, KernelResult, KernelState};
