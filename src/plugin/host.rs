//! Host functions for plugins.
//!
//! This module defines the imports that the host offers to WASM plugins.
//! Everything is exposed under the [`HOST_MODULE`] import module.

use wasmtime::{Caller, Extern, Linker};

use super::HOST_MODULE;

/// Log level for plugin logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Trace level (most verbose).
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Decode the level argument of `host.log`.
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Trace),
            1 => Some(Self::Debug),
            2 => Some(Self::Info),
            3 => Some(Self::Warn),
            4 => Some(Self::Error),
            _ => None,
        }
    }
}

/// Per-instance state stored in the wasmtime `Store`.
#[derive(Debug, Clone)]
pub struct HostState {
    /// Key of the plugin this store belongs to.
    pub plugin: String,
}

impl HostState {
    /// Create state for the plugin with the given key.
    pub fn new(plugin: impl Into<String>) -> Self {
        Self { plugin: plugin.into() }
    }
}

/// Register the host functions on `linker`.
pub fn link_host_functions(linker: &mut Linker<HostState>) -> wasmtime::Result<()> {
    linker.func_wrap(
        HOST_MODULE,
        "log",
        |mut caller: Caller<'_, HostState>, level: i32, ptr: i32, len: i32| {
            let Some(memory) = caller.get_export("memory").and_then(Extern::into_memory) else {
                tracing::debug!(plugin = %caller.data().plugin, "log called without exported memory");
                return;
            };

            let plugin = caller.data().plugin.as_str();
            match guest_str(memory.data(&caller), ptr as u32, len as u32) {
                Ok(message) => log(plugin, LogLevel::from_u32(level as u32), message),
                Err(e) => tracing::debug!(plugin, error = %e, "Ignoring malformed plugin log call"),
            }
        },
    )?;

    Ok(())
}

fn log(plugin: &str, level: Option<LogLevel>, message: &str) {
    match level {
        Some(LogLevel::Trace) => tracing::trace!(plugin, "{}", message),
        Some(LogLevel::Debug) => tracing::debug!(plugin, "{}", message),
        Some(LogLevel::Info) | None => tracing::info!(plugin, "{}", message),
        Some(LogLevel::Warn) => tracing::warn!(plugin, "{}", message),
        Some(LogLevel::Error) => tracing::error!(plugin, "{}", message),
    }
}

/// Borrow a UTF-8 string out of guest memory.
pub(crate) fn guest_str(data: &[u8], ptr: u32, len: u32) -> Result<&str, String> {
    let start = ptr as usize;
    let end = start
        .checked_add(len as usize)
        .ok_or_else(|| format!("buffer {ptr}+{len} overflows"))?;

    let bytes = data
        .get(start..end)
        .ok_or_else(|| format!("buffer {ptr}+{len} is outside linear memory ({} bytes)", data.len()))?;

    std::str::from_utf8(bytes).map_err(|e| format!("buffer is not valid UTF-8: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(LogLevel::from_u32(0), Some(LogLevel::Trace));
        assert_eq!(LogLevel::from_u32(2), Some(LogLevel::Info));
        assert_eq!(LogLevel::from_u32(4), Some(LogLevel::Error));
        assert_eq!(LogLevel::from_u32(5), None);
        assert_eq!(LogLevel::from_u32(u32::MAX), None);
    }

    #[test]
    fn test_guest_str() {
        let memory = b"....hello....";

        assert_eq!(guest_str(memory, 4, 5), Ok("hello"));
        assert_eq!(guest_str(memory, 0, 0), Ok(""));
        assert!(guest_str(memory, 10, 5).is_err());
        assert!(guest_str(memory, u32::MAX, u32::MAX).is_err());
    }

    #[test]
    fn test_guest_str_rejects_invalid_utf8() {
        let memory = [0xff, 0xfe, 0xfd];
        let err = guest_str(&memory, 0, 3).unwrap_err();
        assert!(err.contains("UTF-8"));
    }

    #[test]
    fn test_link_host_functions() {
        let engine = wasmtime::Engine::default();
        let mut linker = Linker::new(&engine);
        link_host_functions(&mut linker).unwrap();

        let mut store = wasmtime::Store::new(&engine, HostState::new("test"));
        assert!(linker.get(&mut store, HOST_MODULE, "log").is_some());
    }
}
