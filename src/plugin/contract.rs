//! The capability set every plugin must satisfy.

use super::PluginResult;

/// Plugin interface.
///
/// The kernel is polymorphic over this trait and never inspects concrete
/// plugin types. Implementations are validated once, when loaded, so the
/// kernel can call them without re-checking.
pub trait Plugin: Send {
    /// Human-readable plugin name.
    fn name(&self) -> &str;

    /// One-line description of what the plugin does.
    fn description(&self) -> &str;

    /// Process `input` and return the plugin's output.
    ///
    /// This is the only operation allowed to fail. The kernel contains both
    /// errors and panics raised here.
    fn execute(&mut self, input: &str) -> PluginResult<String>;
}

/// A plugin instance that passed the contract check.
///
/// Owned exclusively by the [`PluginRegistry`](super::PluginRegistry).
pub type LoadedPlugin = Box<dyn Plugin>;

impl std::fmt::Debug for dyn Plugin + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin").field("name", &self.name()).finish()
    }
}
