//! Registry of loaded plugins.
//!
//! The registry owns every successfully loaded plugin, keyed by the unit key
//! it was discovered under. Insertion order is preserved and drives the
//! 1-based numbering front-ends show to users. Entries are only ever added
//! or cleared all at once; there is no single-entry removal.

use indexmap::IndexMap;

use super::{DispatchError, LoadedPlugin, Plugin, PluginSummary};

/// Ordered collection of loaded plugins.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: IndexMap<String, LoadedPlugin>,
}

impl PluginRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a plugin under `key`.
    ///
    /// An existing entry under the same key is replaced in place and keeps
    /// its position.
    pub fn insert(&mut self, key: impl Into<String>, plugin: LoadedPlugin) {
        let key = key.into();
        if self.plugins.insert(key.clone(), plugin).is_some() {
            tracing::debug!(plugin = %key, "Replaced existing registry entry");
        }
    }

    /// Iterate over `(key, plugin)` pairs in insertion order.
    pub fn list(&self) -> impl Iterator<Item = (&str, &dyn Plugin)> + '_ {
        self.plugins.iter().map(entry)
    }

    /// Iterate over registry keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.plugins.keys().map(String::as_str)
    }

    /// Look up a plugin by key.
    pub fn get(&self, key: &str) -> Option<&dyn Plugin> {
        self.plugins.get(key).map(as_plugin)
    }

    /// Look up a plugin by its 1-based position.
    pub fn get_by_index(&self, index: usize) -> Result<(&str, &dyn Plugin), DispatchError> {
        let position = self.position(index)?;
        self.plugins
            .get_index(position)
            .map(entry)
            .ok_or(DispatchError::IndexOutOfRange { index, count: self.len() })
    }

    /// Look up a plugin by its 1-based position, for execution.
    pub fn get_by_index_mut(
        &mut self,
        index: usize,
    ) -> Result<(&str, &mut dyn Plugin), DispatchError> {
        let count = self.len();
        let position = self.position(index)?;
        self.plugins
            .get_index_mut(position)
            .map(entry_mut)
            .ok_or(DispatchError::IndexOutOfRange { index, count })
    }

    /// Describe every plugin for listing.
    pub fn summaries(&self) -> Vec<PluginSummary> {
        self.list()
            .enumerate()
            .map(|(i, (key, plugin))| PluginSummary {
                index: i + 1,
                key: key.to_string(),
                name: plugin.name().to_string(),
                description: plugin.description().to_string(),
            })
            .collect()
    }

    /// Remove every plugin.
    pub fn clear(&mut self) {
        self.plugins.clear();
    }

    /// Get the number of loaded plugins.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Check if no plugins are loaded.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    fn position(&self, index: usize) -> Result<usize, DispatchError> {
        if index == 0 || index > self.len() {
            return Err(DispatchError::IndexOutOfRange { index, count: self.len() });
        }
        Ok(index - 1)
    }
}

fn as_plugin(plugin: &LoadedPlugin) -> &dyn Plugin {
    &**plugin
}

fn entry<'a>((key, plugin): (&'a String, &'a LoadedPlugin)) -> (&'a str, &'a dyn Plugin) {
    (key.as_str(), as_plugin(plugin))
}

fn entry_mut<'a>(
    (key, plugin): (&'a String, &'a mut LoadedPlugin),
) -> (&'a str, &'a mut dyn Plugin) {
    let plugin: &'a mut dyn Plugin = &mut **plugin;
    (key.as_str(), plugin)
}
