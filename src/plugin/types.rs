//! Core plugin types.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A discovered plugin candidate that has not been loaded yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PluginUnit {
    key: String,
    source: PathBuf,
}

impl PluginUnit {
    /// Create a unit for `source`, keyed by its file stem.
    ///
    /// Returns `None` when the path has no UTF-8 file stem.
    pub fn from_path(source: impl Into<PathBuf>) -> Option<Self> {
        let source = source.into();
        let key = source.file_stem()?.to_str()?.to_string();
        if key.is_empty() {
            return None;
        }
        Some(Self { key, source })
    }

    /// Stable identifier of this unit (file name without extension).
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Where the unit's source lives.
    pub fn source(&self) -> &Path {
        &self.source
    }
}

impl std::fmt::Display for PluginUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.key, self.source.display())
    }
}

/// Listing entry for a loaded plugin, as shown to front-ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginSummary {
    /// 1-based position in the registry.
    pub index: usize,
    /// Registry key.
    pub key: String,
    /// Plugin name.
    pub name: String,
    /// Plugin description.
    pub description: String,
}

/// Plugin ABI version the host implements.
pub const PLUGIN_ABI_VERSION: i32 = 1;

/// Name of the export that marks a module as a plugin instance.
pub const PLUGIN_EXPORT: &str = "plugin";

/// Module name for host functions imported by plugins.
pub const HOST_MODULE: &str = "host";

/// File extensions recognised as plugin sources by default.
pub const DEFAULT_EXTENSIONS: &[&str] = &["wasm", "wat"];

/// File name prefix that hides a file from discovery.
pub const RESERVED_PREFIX: &str = "__";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_key_is_file_stem() {
        let unit = PluginUnit::from_path("/plugins/greet.wasm").unwrap();
        assert_eq!(unit.key(), "greet");
        assert_eq!(unit.source(), Path::new("/plugins/greet.wasm"));
    }

    #[test]
    fn test_unit_key_keeps_inner_dots() {
        let unit = PluginUnit::from_path("plugins/text.tools.wat").unwrap();
        assert_eq!(unit.key(), "text.tools");
    }

    #[test]
    fn test_unit_without_stem() {
        assert!(PluginUnit::from_path("/").is_none());
        assert!(PluginUnit::from_path("").is_none());
    }

    #[test]
    fn test_summary_json() {
        let summary = PluginSummary {
            index: 1,
            key: "greet".to_string(),
            name: "Greeting Plugin".to_string(),
            description: "Greets".to_string(),
        };

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"index\":1"));
        assert!(json.contains("\"key\":\"greet\""));
    }
}
