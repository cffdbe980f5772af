//! The plugin kernel.
//!
//! The [`Kernel`] is the only component front-ends talk to. It orchestrates
//! discovery, loading and registry population, and dispatches calls into
//! loaded plugins behind a failure boundary: nothing a plugin does can take
//! the kernel down.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;

use thiserror::Error;

use super::KernelConfig;
use crate::plugin::{
    DispatchError, LoadError, LoadFailure, Plugin, PluginLoader, PluginRegistry, PluginSummary,
    PluginUnit, Severity, WasmLoader,
};

/// Result type for kernel construction.
pub type KernelResult<T> = Result<T, KernelError>;

/// Startup-time errors. Normal operation never produces these.
#[derive(Debug, Error)]
pub enum KernelError {
    /// The plugin directory path cannot be used at all.
    #[error("Invalid plugin directory '{}': {reason}", path.display())]
    InvalidPluginDir { path: PathBuf, reason: String },

    /// The plugin runtime could not be initialized.
    #[error("Failed to initialize plugin runtime: {0}")]
    Runtime(String),
}

/// Lifecycle state of the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelState {
    /// Nothing loaded yet.
    Empty,
    /// A load pass is running.
    Loading,
    /// At least one load pass has completed.
    Populated,
}

/// Discovers, loads and dispatches plugins.
#[derive(Debug)]
pub struct Kernel<L = WasmLoader> {
    config: KernelConfig,
    loader: L,
    registry: PluginRegistry,
    failures: Vec<LoadFailure>,
    state: KernelState,
}

impl Kernel<WasmLoader> {
    /// Create a kernel using the WASM loader.
    pub fn new(config: KernelConfig) -> KernelResult<Self> {
        let loader = WasmLoader::new().map_err(|e| KernelError::Runtime(format!("{e:#}")))?;
        Self::with_loader(config, loader)
    }
}

impl<L: PluginLoader> Kernel<L> {
    /// Create a kernel with a custom loader.
    pub fn with_loader(config: KernelConfig, loader: L) -> KernelResult<Self> {
        validate(&config)?;

        Ok(Self {
            config,
            loader,
            registry: PluginRegistry::new(),
            failures: Vec::new(),
            state: KernelState::Empty,
        })
    }

    /// Get the kernel configuration.
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Get the current lifecycle state.
    pub fn state(&self) -> KernelState {
        self.state
    }

    /// Get the plugin registry.
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Failures recorded by the most recent load pass.
    pub fn failures(&self) -> &[LoadFailure] {
        &self.failures
    }

    /// Enumerate candidate plugin units.
    ///
    /// A missing plugin directory yields an empty list and a warning.
    pub fn discover(&self) -> Vec<PluginUnit> {
        self.config.plugin_directory().scan()
    }

    /// Load every discovered unit into the registry.
    ///
    /// Failing units are recorded and skipped; the pass always runs to the
    /// end. When two units share a key the first one loaded keeps it and
    /// the later one is recorded as a failure. Returns the number of
    /// plugins loaded in this pass.
    pub fn load_all(&mut self) -> usize {
        self.state = KernelState::Loading;
        self.failures.clear();

        let units = self.discover();
        // A missing directory has already been reported by the scan.
        if units.is_empty() && self.config.plugin_dir.is_dir() {
            tracing::warn!(dir = %self.config.plugin_dir.display(), "No plugins found to load");
        }

        let mut claimed: HashMap<&str, &PluginUnit> = HashMap::new();
        for unit in &units {
            let result = match claimed.get(unit.key()) {
                Some(first) => Err(LoadError::ResolutionFailed(format!(
                    "duplicate plugin key, already loaded from '{}'",
                    first.source().display()
                ))),
                None => self.load_unit(unit),
            };

            match result {
                Ok(plugin) => {
                    tracing::info!(plugin = unit.key(), name = plugin.name(), "Plugin loaded");
                    self.registry.insert(unit.key(), plugin);
                    claimed.insert(unit.key(), unit);
                }
                Err(error) => {
                    let failure = LoadFailure {
                        key: unit.key().to_string(),
                        source: unit.source().to_path_buf(),
                        error,
                    };
                    report(&failure);
                    self.failures.push(failure);
                }
            }
        }

        let loaded = claimed.len();
        tracing::info!(loaded, discovered = units.len(), "Plugin load pass complete");
        self.state = KernelState::Populated;
        loaded
    }

    /// Clear the registry and load everything again.
    pub fn reload(&mut self) -> usize {
        tracing::debug!(previous = self.registry.len(), "Reloading plugins");
        self.registry.clear();
        self.load_all()
    }

    /// Iterate over loaded plugins in registry order.
    pub fn list(&self) -> impl Iterator<Item = (&str, &dyn Plugin)> + '_ {
        self.registry.list()
    }

    /// Describe loaded plugins for listing.
    pub fn summaries(&self) -> Vec<PluginSummary> {
        self.registry.summaries()
    }

    /// Execute the plugin at the 1-based `index` with `input`.
    ///
    /// Errors and panics raised by the plugin are returned as
    /// [`DispatchError::PluginExecutionFailed`].
    pub fn try_dispatch(&mut self, index: usize, input: &str) -> Result<String, DispatchError> {
        let (key, plugin) = self.registry.get_by_index_mut(index)?;
        tracing::debug!(plugin = key, index, "Dispatching to plugin");

        let failed = |reason: String| {
            tracing::warn!(plugin = key, error = %reason, "Plugin execution failed");
            DispatchError::PluginExecutionFailed { plugin: key.to_string(), reason }
        };

        match catch_unwind(AssertUnwindSafe(|| plugin.execute(input))) {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(failed(e.to_string())),
            Err(payload) => Err(failed(format!("panicked: {}", panic_message(payload.as_ref())))),
        }
    }

    /// Execute the plugin at the 1-based `index`, rendering failures as text.
    ///
    /// Never panics, whatever the registry state or plugin behavior.
    pub fn dispatch(&mut self, index: usize, input: &str) -> String {
        self.try_dispatch(index, input).unwrap_or_else(|e| format!("Error: {e}"))
    }

    fn load_unit(&self, unit: &PluginUnit) -> Result<crate::plugin::LoadedPlugin, LoadError> {
        catch_unwind(AssertUnwindSafe(|| self.loader.load(unit))).unwrap_or_else(|payload| {
            Err(LoadError::InitializationFailed(format!(
                "loader panicked: {}",
                panic_message(payload.as_ref())
            )))
        })
    }
}

fn validate(config: &KernelConfig) -> KernelResult<()> {
    let path = &config.plugin_dir;
    let invalid = |reason: &str| KernelError::InvalidPluginDir {
        path: path.clone(),
        reason: reason.to_string(),
    };

    if path.as_os_str().is_empty() {
        return Err(invalid("path is empty"));
    }
    if path.to_str().is_none() {
        return Err(invalid("path is not valid UTF-8"));
    }

    Ok(())
}

fn report(failure: &LoadFailure) {
    let source = failure.source.display();
    match failure.error.severity() {
        Severity::Error => {
            tracing::error!(plugin = %failure.key, source = %source, error = %failure.error, "Failed to load plugin");
        }
        Severity::Warning => {
            tracing::warn!(plugin = %failure.key, source = %source, error = %failure.error, "Skipping unit that is not a plugin");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
