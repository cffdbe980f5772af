//! Loader interface.
//!
//! A loader turns a discovered [`PluginUnit`] into a [`LoadedPlugin`] or a
//! [`LoadError`]. Loaders must tolerate malformed, empty, or non-conforming
//! sources and report them as errors rather than panicking.

use super::{LoadError, LoadedPlugin, PluginUnit};

/// Materializes plugin units.
pub trait PluginLoader {
    /// Load and validate a single unit.
    fn load(&self, unit: &PluginUnit) -> Result<LoadedPlugin, LoadError>;
}

impl<F> PluginLoader for F
where
    F: Fn(&PluginUnit) -> Result<LoadedPlugin, LoadError>,
{
    fn load(&self, unit: &PluginUnit) -> Result<LoadedPlugin, LoadError> {
        self(unit)
    }
}
