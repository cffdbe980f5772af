//! Plugin discovery.
//!
//! Enumerates candidate plugin sources from a single directory. Discovery is
//! never fatal: a missing directory means "no plugins", which is a valid
//! steady state.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{PluginUnit, DEFAULT_EXTENSIONS, RESERVED_PREFIX};

/// A directory scanned for plugin sources.
#[derive(Debug, Clone)]
pub struct PluginDirectory {
    path: PathBuf,
    extensions: Vec<String>,
    reserved_prefix: String,
}

impl PluginDirectory {
    /// Create a scanner for `path` with the default naming convention.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
            reserved_prefix: RESERVED_PREFIX.to_string(),
        }
    }

    /// Override the accepted file extensions (without the leading dot).
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Override the file name prefix that hides a file from discovery.
    pub fn with_reserved_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.reserved_prefix = prefix.into();
        self
    }

    /// The scanned directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check whether a file name follows the plugin naming convention.
    pub fn matches(&self, file_name: &str) -> bool {
        if !self.reserved_prefix.is_empty() && file_name.starts_with(&self.reserved_prefix) {
            return false;
        }

        Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|allowed| allowed == ext))
    }

    /// List candidate units, sorted by file name.
    ///
    /// Returns an empty list when the directory does not exist.
    pub fn scan(&self) -> Vec<PluginUnit> {
        if !self.path.is_dir() {
            tracing::warn!(
                dir = %self.path.display(),
                "Plugin directory does not exist, no plugins to load"
            );
            return Vec::new();
        }

        let mut units = Vec::new();

        for entry in WalkDir::new(&self.path)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable plugin directory entry");
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let Some(file_name) = entry.file_name().to_str() else {
                tracing::debug!(path = %entry.path().display(), "Skipping non UTF-8 file name");
                continue;
            };

            if !self.matches(file_name) {
                continue;
            }

            if let Some(unit) = PluginUnit::from_path(entry.path()) {
                units.push(unit);
            }
        }

        tracing::debug!(dir = %self.path.display(), count = units.len(), "Scanned plugin directory");
        units
    }
}
