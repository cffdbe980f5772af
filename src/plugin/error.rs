//! Plugin system error types.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;

/// Errors raised by a plugin while it runs.
///
/// These originate in third-party code; the kernel converts them into
/// [`DispatchError::PluginExecutionFailed`] before they reach a caller.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The WASM instance trapped.
    #[error("plugin trapped: {0}")]
    Trap(String),

    /// The plugin broke the string ABI (bad pointer, bad length, invalid UTF-8).
    #[error("plugin ABI violation: {0}")]
    Abi(String),

    /// The plugin reported a failure of its own.
    #[error("{0}")]
    Failed(String),
}

/// How loudly a load failure should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// The unit is not a plugin; skipping it is routine.
    Warning,
    /// The unit looked like a plugin but could not be brought up.
    Error,
}

impl Severity {
    /// Get the icon used when rendering this severity.
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Warning => "⚠️ ",
            Self::Error => "❌",
        }
    }
}

/// Errors that can occur while loading a single plugin unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The source could not be read or compiled into a module.
    #[error("could not resolve module: {0}")]
    ResolutionFailed(String),

    /// Instantiating the module failed (start function trap, unknown import, ...).
    #[error("initialization failed: {0}")]
    InitializationFailed(String),

    /// The module does not expose the well-known plugin export.
    #[error("missing '{0}' export")]
    MissingExport(String),

    /// The module exposes the export but does not satisfy the plugin contract.
    #[error("contract violation: {0}")]
    ContractViolation(String),
}

impl LoadError {
    /// Get the reporting severity of this failure.
    pub fn severity(&self) -> Severity {
        match self {
            Self::ResolutionFailed(_) | Self::InitializationFailed(_) => Severity::Error,
            Self::MissingExport(_) | Self::ContractViolation(_) => Severity::Warning,
        }
    }
}

/// A load failure for one discovered unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailure {
    /// Key of the unit that failed.
    pub key: String,
    /// Source the unit was discovered at.
    pub source: PathBuf,
    /// Why it failed.
    pub error: LoadError,
}

impl fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.error)
    }
}

impl std::error::Error for LoadFailure {}

impl LoadFailure {
    /// Render as a single line for human-facing output.
    pub fn render(&self) -> String {
        format!("{} {}", self.error.severity().icon(), self)
    }
}

/// Errors returned by dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The requested 1-based index does not name a loaded plugin.
    #[error("invalid plugin number {index} (loaded plugins: {count})")]
    IndexOutOfRange { index: usize, count: usize },

    /// The plugin failed while executing.
    #[error("plugin '{plugin}' failed: {reason}")]
    PluginExecutionFailed { plugin: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_split() {
        assert_eq!(LoadError::ResolutionFailed("x".into()).severity(), Severity::Error);
        assert_eq!(LoadError::InitializationFailed("x".into()).severity(), Severity::Error);
        assert_eq!(LoadError::MissingExport("plugin".into()).severity(), Severity::Warning);
        assert_eq!(LoadError::ContractViolation("x".into()).severity(), Severity::Warning);
    }

    #[test]
    fn test_load_failure_render_is_one_line() {
        let failure = LoadFailure {
            key: "broken".to_string(),
            source: PathBuf::from("plugins/broken.wat"),
            error: LoadError::InitializationFailed("wasm trap: unreachable".to_string()),
        };

        let line = failure.render();
        assert!(line.starts_with("❌"));
        assert!(line.contains("broken: initialization failed: wasm trap: unreachable"));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_dispatch_error_display() {
        let err = DispatchError::IndexOutOfRange { index: 5, count: 3 };
        assert_eq!(err.to_string(), "invalid plugin number 5 (loaded plugins: 3)");

        let err = DispatchError::PluginExecutionFailed {
            plugin: "calc".to_string(),
            reason: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "plugin 'calc' failed: boom");
    }
}
