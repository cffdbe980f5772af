//! Configuration management for Microkern.
//!
//! Handles loading configuration from TOML files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::plugin::{PluginDirectory, DEFAULT_EXTENSIONS, RESERVED_PREFIX};

/// Local configuration file name, looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = ".microkern.toml";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Kernel settings
    pub kernel: KernelConfig,
}

/// Kernel settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Directory scanned for plugin sources
    pub plugin_dir: PathBuf,

    /// File extensions treated as plugin sources (without the dot)
    pub extensions: Vec<String>,

    /// Files whose name starts with this prefix are ignored
    pub reserved_prefix: String,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            plugin_dir: PathBuf::from("plugins"),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
            reserved_prefix: RESERVED_PREFIX.to_string(),
        }
    }
}

impl KernelConfig {
    /// Create a configuration for the given plugin directory.
    pub fn new(plugin_dir: impl Into<PathBuf>) -> Self {
        Self { plugin_dir: plugin_dir.into(), ..Self::default() }
    }

    /// Build the discovery source described by this configuration.
    pub fn plugin_directory(&self) -> PluginDirectory {
        PluginDirectory::new(&self.plugin_dir)
            .with_extensions(self.extensions.iter().cloned())
            .with_reserved_prefix(self.reserved_prefix.clone())
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Looks for config in:
    /// 1. `.microkern.toml` in current directory
    /// 2. `~/.config/microkern/config.toml`
    /// 3. Falls back to defaults
    pub fn load() -> anyhow::Result<Self> {
        match Self::locate() {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Find the config file [`Config::load`] would read, if any.
    pub fn locate() -> Option<PathBuf> {
        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Some(local_config);
        }

        Self::config_dir().map(|dir| dir.join("config.toml")).filter(|path| path.exists())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("microkern"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.kernel.plugin_dir, PathBuf::from("plugins"));
        assert_eq!(config.kernel.extensions, vec!["wasm", "wat"]);
        assert_eq!(config.kernel.reserved_prefix, "__");
    }

    #[test]
    fn test_parse_partial_config() {
        let config = Config::from_toml(
            r#"
[kernel]
plugin_dir = "/opt/plugins"
"#,
        )
        .unwrap();

        assert_eq!(config.kernel.plugin_dir, PathBuf::from("/opt/plugins"));
        assert_eq!(config.kernel.extensions, vec!["wasm", "wat"]);
    }

    #[test]
    fn test_parse_empty_config() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn test_invalid_config() {
        assert!(Config::from_toml("[kernel]\nextensions = 3").is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = Config::default();
        config.kernel.extensions = vec!["wasm".to_string()];

        let serialized = config.to_toml().unwrap();
        assert!(serialized.contains("plugin_dir"));
        assert_eq!(Config::from_toml(&serialized).unwrap(), config);
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[kernel]\nreserved_prefix = \"_\"\n").unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.kernel.reserved_prefix, "_");
    }

    #[test]
    fn test_plugin_directory_uses_convention() {
        let mut kernel = KernelConfig::new("/plugins");
        kernel.extensions = vec!["plug".to_string()];
        kernel.reserved_prefix = ".".to_string();

        let dir = kernel.plugin_directory();
        assert_eq!(dir.path(), Path::new("/plugins"));
        assert!(dir.matches("a.plug"));
        assert!(!dir.matches("a.wasm"));
        assert!(!dir.matches(".a.plug"));
    }
}
