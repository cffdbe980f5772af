//! WASM plugin runtime using wasmtime.
//!
//! This module provides the [`WasmLoader`], which resolves plugin sources
//! into wasmtime modules, instantiates them, and checks them against the
//! plugin ABI before handing them to the registry.
//!
//! # Plugin ABI
//!
//! A plugin module must export:
//!
//! - `plugin`: an i32 global holding [`PLUGIN_ABI_VERSION`]. It marks the
//!   module instance itself as the plugin object.
//! - `memory`: the linear memory strings are exchanged through.
//! - `alloc(len: i32) -> i32`: returns a buffer the host writes input into.
//! - `name() -> i64`, `description() -> i64`: packed string results.
//! - `execute(ptr: i32, len: i32) -> i64`: processes the input buffer and
//!   returns a packed string result.
//!
//! Packed results are `(ptr << 32) | len`.

use wasmtime::{
    Engine, Extern, Instance, Linker, Memory, Module, Store, TypedFunc, Val, WasmParams,
    WasmResults,
};

use super::host::{guest_str, link_host_functions, HostState};
use super::{
    LoadError, LoadedPlugin, Plugin, PluginError, PluginLoader, PluginResult, PluginUnit,
    PLUGIN_ABI_VERSION, PLUGIN_EXPORT,
};

/// Loads WASM plugins (binary `.wasm` or text `.wat`).
pub struct WasmLoader {
    engine: Engine,
    linker: Linker<HostState>,
}

impl std::fmt::Debug for WasmLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmLoader").finish_non_exhaustive()
    }
}

impl WasmLoader {
    /// Create a loader with a default engine and the host functions linked.
    pub fn new() -> wasmtime::Result<Self> {
        let engine = Engine::default();
        let mut linker = Linker::new(&engine);
        link_host_functions(&mut linker)?;

        Ok(Self { engine, linker })
    }

    /// Get the wasmtime engine used for compilation.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Read and compile the unit's source.
    fn resolve(&self, unit: &PluginUnit) -> Result<Module, LoadError> {
        let bytes = std::fs::read(unit.source()).map_err(|e| {
            LoadError::ResolutionFailed(format!("cannot read {}: {e}", unit.source().display()))
        })?;

        if bytes.is_empty() {
            return Err(LoadError::ResolutionFailed(format!(
                "{} is empty",
                unit.source().display()
            )));
        }

        Module::new(&self.engine, &bytes).map_err(|e| LoadError::ResolutionFailed(describe(&e)))
    }

    /// Instantiate the module in a fresh store, running its start function.
    fn materialize(
        &self,
        unit: &PluginUnit,
        module: &Module,
    ) -> Result<(Store<HostState>, Instance), LoadError> {
        let mut store = Store::new(&self.engine, HostState::new(unit.key()));
        let instance = self
            .linker
            .instantiate(&mut store, module)
            .map_err(|e| LoadError::InitializationFailed(describe(&e)))?;

        Ok((store, instance))
    }
}

impl PluginLoader for WasmLoader {
    fn load(&self, unit: &PluginUnit) -> Result<LoadedPlugin, LoadError> {
        let module = self.resolve(unit)?;
        let (store, instance) = self.materialize(unit, &module)?;
        let plugin = WasmPlugin::verify(store, instance)?;

        tracing::debug!(plugin = unit.key(), name = plugin.name(), "Plugin passed contract check");
        Ok(Box::new(plugin))
    }
}

/// A WASM instance that satisfies the plugin contract.
///
/// The typed function handles are resolved once, at load time.
pub struct WasmPlugin {
    name: String,
    description: String,
    store: Store<HostState>,
    memory: Memory,
    alloc: TypedFunc<i32, i32>,
    execute: TypedFunc<(i32, i32), i64>,
}

impl std::fmt::Debug for WasmPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmPlugin")
            .field("key", &self.store.data().plugin)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl WasmPlugin {
    /// Check an instance against the ABI and adopt it.
    fn verify(mut store: Store<HostState>, instance: Instance) -> Result<Self, LoadError> {
        let marker = instance
            .get_export(&mut store, PLUGIN_EXPORT)
            .ok_or_else(|| LoadError::MissingExport(PLUGIN_EXPORT.to_string()))?;
        check_marker(&mut store, marker)?;

        let memory = instance
            .get_memory(&mut store, "memory")
            .ok_or_else(|| LoadError::ContractViolation("missing 'memory' export".to_string()))?;

        let alloc = typed_func::<i32, i32>(&mut store, &instance, "alloc")?;
        let name = typed_func::<(), i64>(&mut store, &instance, "name")?;
        let description = typed_func::<(), i64>(&mut store, &instance, "description")?;
        let execute = typed_func::<(i32, i32), i64>(&mut store, &instance, "execute")?;

        let name = call_string(&mut store, &memory, &name, "name")?;
        let description = call_string(&mut store, &memory, &description, "description")?;

        Ok(Self { name, description, store, memory, alloc, execute })
    }
}

impl Plugin for WasmPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&mut self, input: &str) -> PluginResult<String> {
        let len = i32::try_from(input.len())
            .map_err(|_| PluginError::Abi(format!("input of {} bytes is too large", input.len())))?;

        let ptr = self.alloc.call(&mut self.store, len).map_err(|e| PluginError::Trap(describe(&e)))?;
        self.memory
            .write(&mut self.store, ptr as u32 as usize, input.as_bytes())
            .map_err(|e| PluginError::Abi(format!("alloc returned an unusable buffer: {e}")))?;

        let packed = self
            .execute
            .call(&mut self.store, (ptr, len))
            .map_err(|e| PluginError::Trap(describe(&e)))?;

        read_packed(self.memory.data(&self.store), packed).map_err(PluginError::Abi)
    }
}

fn check_marker(store: &mut Store<HostState>, marker: Extern) -> Result<(), LoadError> {
    match marker {
        Extern::Global(global) => match global.get(&mut *store) {
            Val::I32(version) if version == PLUGIN_ABI_VERSION => Ok(()),
            Val::I32(version) => Err(LoadError::ContractViolation(format!(
                "'{PLUGIN_EXPORT}' declares ABI version {version}, host supports {PLUGIN_ABI_VERSION}"
            ))),
            _ => Err(LoadError::ContractViolation(format!(
                "'{PLUGIN_EXPORT}' must be an i32 global"
            ))),
        },
        Extern::Func(_) => Err(LoadError::ContractViolation(format!(
            "'{PLUGIN_EXPORT}' is a function; expected an instance marker global"
        ))),
        _ => Err(LoadError::ContractViolation(format!("'{PLUGIN_EXPORT}' must be an i32 global"))),
    }
}

fn typed_func<P, R>(
    store: &mut Store<HostState>,
    instance: &Instance,
    name: &str,
) -> Result<TypedFunc<P, R>, LoadError>
where
    P: WasmParams,
    R: WasmResults,
{
    let func = instance
        .get_func(&mut *store, name)
        .ok_or_else(|| LoadError::ContractViolation(format!("missing '{name}' function export")))?;

    func.typed::<P, R>(&*store)
        .map_err(|e| LoadError::ContractViolation(format!("'{name}' has the wrong signature: {e}")))
}

fn call_string(
    store: &mut Store<HostState>,
    memory: &Memory,
    func: &TypedFunc<(), i64>,
    name: &str,
) -> Result<String, LoadError> {
    let packed = func
        .call(&mut *store, ())
        .map_err(|e| LoadError::ContractViolation(format!("'{name}' failed: {}", describe(&e))))?;

    read_packed(memory.data(&*store), packed)
        .map_err(|e| LoadError::ContractViolation(format!("'{name}' returned {e}")))
}

/// Decode a packed `(ptr << 32) | len` result from guest memory.
fn read_packed(data: &[u8], packed: i64) -> Result<String, String> {
    let packed = packed as u64;
    let ptr = (packed >> 32) as u32;
    let len = packed as u32;

    guest_str(data, ptr, len).map(str::to_owned)
}

/// Render a wasmtime error as a single line.
fn describe(err: &wasmtime::Error) -> String {
    if let Some(trap) = err.downcast_ref::<wasmtime::Trap>() {
        return format!("wasm trap: {trap}");
    }

    format!("{err:#}").lines().map(str::trim).filter(|l| !l.is_empty()).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ECHO: &str = r#"
(module
  (memory (export "memory") 1)
  (global (export "plugin") i32 (i32.const 1))
  (data (i32.const 0) "Echo")
  (data (i32.const 16) "Returns its input")
  (func (export "alloc") (param i32) (result i32) (i32.const 1024))
  (func (export "name") (result i64) (i64.const 4))
  (func (export "description") (result i64)
    (i64.or (i64.shl (i64.const 16) (i64.const 32)) (i64.const 17)))
  (func (export "execute") (param $ptr i32) (param $len i32) (result i64)
    (i64.or
      (i64.shl (i64.extend_i32_u (local.get $ptr)) (i64.const 32))
      (i64.extend_i32_u (local.get $len)))))
"#;

    fn unit(dir: &TempDir, file: &str, source: &str) -> PluginUnit {
        let path = dir.path().join(file);
        std::fs::write(&path, source).unwrap();
        PluginUnit::from_path(path).unwrap()
    }

    fn load(file: &str, source: &str) -> Result<LoadedPlugin, LoadError> {
        let dir = TempDir::new().unwrap();
        let unit = unit(&dir, file, source);
        WasmLoader::new().unwrap().load(&unit)
    }

    #[test]
    fn test_load_and_execute() {
        let mut plugin = load("echo.wat", ECHO).unwrap();

        assert_eq!(plugin.name(), "Echo");
        assert_eq!(plugin.description(), "Returns its input");
        assert_eq!(plugin.execute("hello").unwrap(), "hello");
        assert_eq!(plugin.execute("").unwrap(), "");
    }

    #[test]
    fn test_unreadable_source() {
        let loader = WasmLoader::new().unwrap();
        let unit = PluginUnit::from_path("/definitely/not/here.wasm").unwrap();

        assert!(matches!(loader.load(&unit), Err(LoadError::ResolutionFailed(_))));
    }

    #[test]
    fn test_garbage_source() {
        assert!(matches!(load("junk.wasm", "not a module ("), Err(LoadError::ResolutionFailed(_))));
        assert!(matches!(load("empty.wasm", ""), Err(LoadError::ResolutionFailed(_))));
    }

    #[test]
    fn test_start_trap_is_initialization_failure() {
        let source = r#"(module (func $boom unreachable) (start $boom))"#;

        match load("boom.wat", source) {
            Err(LoadError::InitializationFailed(message)) => {
                assert!(message.contains("trap"), "{message}");
                assert!(!message.contains('\n'));
            }
            other => panic!("expected initialization failure, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_import_is_initialization_failure() {
        let source = r#"(module (import "env" "missing" (func)))"#;

        assert!(matches!(load("imports.wat", source), Err(LoadError::InitializationFailed(_))));
    }

    #[test]
    fn test_missing_marker() {
        let source = ECHO.replace(r#"(global (export "plugin") i32 (i32.const 1))"#, "");

        assert_eq!(
            load("nomarker.wat", &source).unwrap_err(),
            LoadError::MissingExport("plugin".to_string())
        );
    }

    #[test]
    fn test_marker_must_be_instance_not_function() {
        let source = ECHO.replace(
            r#"(global (export "plugin") i32 (i32.const 1))"#,
            r#"(func (export "plugin") (result i32) (i32.const 1))"#,
        );

        assert!(matches!(load("ctor.wat", &source), Err(LoadError::ContractViolation(_))));
    }

    #[test]
    fn test_marker_version_mismatch() {
        let source = ECHO.replace("(i32.const 1))", "(i32.const 7))");

        match load("v7.wat", &source) {
            Err(LoadError::ContractViolation(message)) => assert!(message.contains("ABI version 7")),
            other => panic!("expected contract violation, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_operation() {
        let source = ECHO.replace(r#"(export "description")"#, "");

        match load("nodesc.wat", &source) {
            Err(LoadError::ContractViolation(message)) => assert!(message.contains("description")),
            other => panic!("expected contract violation, got {other:?}"),
        }
    }

    #[test]
    fn test_wrong_signature() {
        let source = ECHO.replace(
            r#"(func (export "name") (result i64) (i64.const 4))"#,
            r#"(func (export "name") (result i32) (i32.const 4))"#,
        );

        match load("badsig.wat", &source) {
            Err(LoadError::ContractViolation(message)) => assert!(message.contains("'name'")),
            other => panic!("expected contract violation, got {other:?}"),
        }
    }

    #[test]
    fn test_name_out_of_bounds() {
        let source = ECHO.replace("(i64.const 4))", "(i64.const 0x7fff000000000004))");

        assert!(matches!(load("oob.wat", &source), Err(LoadError::ContractViolation(_))));
    }

    #[test]
    fn test_execute_trap_is_reported() {
        let source = ECHO.replace(
            "(i64.or\n      (i64.shl (i64.extend_i32_u (local.get $ptr)) (i64.const 32))\n      (i64.extend_i32_u (local.get $len)))",
            "unreachable",
        );

        let mut plugin = load("trap.wat", &source).unwrap();
        assert!(matches!(plugin.execute("x"), Err(PluginError::Trap(_))));

        // The instance stays usable after a trap.
        assert!(matches!(plugin.execute("y"), Err(PluginError::Trap(_))));
    }

    #[test]
    fn test_describe_is_single_line() {
        let engine = Engine::default();
        let err = Module::new(&engine, "(module (func (result i32)))").unwrap_err();

        assert!(!describe(&err).contains('\n'));
    }
}
