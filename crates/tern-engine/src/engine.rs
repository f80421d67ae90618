//! Embedder-facing entry points.
//!
//! # Example
//!
//! ```rust,ignore
//! use tern_engine::{CompileOptions, Engine, EngineOptions, Value};
//!
//! let engine = Engine::new(EngineOptions::default())?;
//! let unit = engine.compile("var x = 20; x * 2 + 2;", &CompileOptions::default())?;
//! let mut context = engine.new_context();
//! assert_eq!(engine.execute(&unit, &mut context)?, Value::Int(42));
//! ```
//!
//! An [`Engine`] is shared between threads. Contexts and compiled units
//! stay on the thread that created them.

use std::rc::Rc;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::compiler::ir::{IrModule, PrettyPrint, SiteId, SpecId};
use crate::compiler::{compile, CompileError, CompileResult};
use crate::config::{CompileOptions, ConfigError, EngineOptions};
use crate::vm::dispatch::{DiagnosticsHook, SiteSnapshot, SiteTransition};
use crate::vm::error::{RuntimeError, Thrown};
use crate::vm::host::HostObject;
use crate::vm::interpreter::Interpreter;
use crate::vm::object::{ObjectKind, ObjectRef, Slot};
use crate::vm::realm::Realm;
use crate::vm::safepoint::{InterruptHandle, Safepoint};
use crate::vm::shape::{PropertyAttrs, ShapeTable};
use crate::vm::unit::UnitCode;
use crate::vm::value::Value;
use crate::vm::SpecState;

/// Compiles and runs scripts. Owns the options, the shape table every
/// context shares and the diagnostics hook.
pub struct Engine {
    options: EngineOptions,
    shapes: Arc<ShapeTable>,
    hook: RwLock<Option<DiagnosticsHook>>,
}

impl Engine {
    pub fn new(options: EngineOptions) -> Result<Self, ConfigError> {
        options.validate()?;
        log::debug!(
            "engine created (fanout={}, relink_window={}, optimistic={})",
            options.polymorphic_fanout,
            options.relink_window,
            options.optimistic_types
        );
        Ok(Self {
            options,
            shapes: Arc::new(ShapeTable::new()),
            hook: RwLock::new(None),
        })
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn shape_table(&self) -> &ShapeTable {
        &self.shapes
    }

    /// Compile `source`. Fails on the first syntax or early reference
    /// error; nothing is executed.
    pub fn compile(&self, source: &str, options: &CompileOptions) -> Result<CompiledUnit, CompileError> {
        let module = self.compile_module(source, options)?;
        let unit = UnitCode::new(module);
        log::debug!(
            "compiled unit {}: {} functions, {} sites, {} speculations",
            unit.id,
            unit.module.functions.len(),
            unit.module.sites.len(),
            unit.module.speculation_count
        );
        Ok(CompiledUnit(Rc::new(unit)))
    }

    /// Compile with the compile options implied by the engine options.
    pub fn compile_script(&self, source: &str) -> Result<CompiledUnit, CompileError> {
        self.compile(source, &self.options.compile_options())
    }

    /// Compile to IR without creating runtime state.
    pub fn compile_module(&self, source: &str, options: &CompileOptions) -> CompileResult<IrModule> {
        compile(source, options, self.options.max_parse_depth)
    }

    /// A fresh realm with its own global object and builtins.
    pub fn new_context(&self) -> Context {
        Context {
            realm: Realm::new(self.shapes.clone()),
            interrupt: InterruptHandle::new(),
        }
    }

    /// Run the script body of `unit` against `context`'s global object and
    /// return its completion value.
    pub fn execute(&self, unit: &CompiledUnit, context: &mut Context) -> Result<Value, RuntimeError> {
        self.run(context, |interp| interp.run_script(unit.0.clone()))
    }

    /// Call `function` with `this` and `args` inside `context`.
    pub fn call_function(
        &self,
        context: &mut Context,
        function: &Value,
        this: Value,
        args: &[Value],
    ) -> Result<Value, RuntimeError> {
        self.run(context, |interp| interp.call(function, this, args))
    }

    fn run<F>(&self, context: &mut Context, body: F) -> Result<Value, RuntimeError>
    where
        F: FnOnce(&mut Interpreter<'_>) -> Result<Value, Thrown>,
    {
        let hook = self.hook.read().clone();
        let safepoint = Safepoint::new(context.interrupt.clone(), self.options.execution_timeout());
        let mut interp = Interpreter::new(&context.realm, &self.options, hook.as_ref(), safepoint);
        match body(&mut interp) {
            Ok(value) => Ok(value),
            Err(thrown) => {
                let interrupted = matches!(thrown, Thrown::Interrupt(_));
                let error = interp.into_runtime_error(thrown);
                if interrupted {
                    context.interrupt.clear();
                }
                log::debug!("execution failed: {}", error);
                Err(error)
            }
        }
    }

    /// Install `hook`; it receives every later site transition.
    pub fn set_diagnostics_hook<F>(&self, hook: F)
    where
        F: Fn(&SiteTransition) + Send + Sync + 'static,
    {
        *self.hook.write() = Some(Arc::new(hook));
    }

    pub fn clear_diagnostics_hook(&self) {
        *self.hook.write() = None;
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            options: EngineOptions::default(),
            shapes: Arc::new(ShapeTable::new()),
            hook: RwLock::new(None),
        }
    }
}

/// A realm plus the handle that interrupts executions running in it.
///
/// Dropping a context empties every object it created, including objects
/// the embedder still holds.
pub struct Context {
    realm: Realm,
    interrupt: InterruptHandle,
}

impl Context {
    pub fn global(&self) -> &ObjectRef {
        &self.realm.global
    }

    pub fn realm(&self) -> &Realm {
        &self.realm
    }

    /// Handle other threads can use to stop the running execution.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    /// Create or replace a global variable.
    pub fn define_global(&self, name: &str, value: Value) {
        self.realm
            .global
            .borrow_mut()
            .define_raw(&self.realm.heap, name, Slot::Data(value), PropertyAttrs::DEFAULT);
    }

    /// Read a global data property without running script code.
    pub fn get_global(&self, name: &str) -> Option<Value> {
        self.realm.global.get_data(name)
    }

    /// Wrap `host` in an object and bind it to the global `name`.
    pub fn define_host_object(&self, name: &str, host: Rc<dyn HostObject>) -> ObjectRef {
        let proto = if host.is_callable() {
            self.realm.intrinsics.function_prototype.clone()
        } else {
            self.realm.intrinsics.object_prototype.clone()
        };
        let object = ObjectRef::new(&self.realm.heap, Some(proto), ObjectKind::Host(host));
        self.define_global(name, Value::Object(object.clone()));
        object
    }
}

/// A compiled script with its runtime dispatch and speculation state.
/// Running the same unit again reuses that state.
#[derive(Debug, Clone)]
pub struct CompiledUnit(Rc<UnitCode>);

impl CompiledUnit {
    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn module(&self) -> &IrModule {
        &self.0.module
    }

    pub fn sites(&self) -> Vec<SiteSnapshot> {
        self.0.sites.borrow().iter().map(|site| site.snapshot()).collect()
    }

    pub fn site_snapshot(&self, id: SiteId) -> Option<SiteSnapshot> {
        self.0.sites.borrow().get(id.0 as usize).map(|site| site.snapshot())
    }

    /// First site whose kind renders as `kind`, e.g. `"property .x"`.
    pub fn find_site(&self, kind: &str) -> Option<SiteSnapshot> {
        self.sites().into_iter().find(|site| site.kind.to_string() == kind)
    }

    pub fn speculation_state(&self, id: SpecId) -> Option<SpecState> {
        self.0.speculations.borrow().state(id)
    }

    pub fn speculation_states(&self) -> Vec<SpecState> {
        let table = self.0.speculations.borrow();
        (0..table.len() as u32).filter_map(|i| table.state(SpecId(i))).collect()
    }

    pub fn deopt_count(&self) -> usize {
        self.0.speculations.borrow().deopt_count()
    }

    pub fn pretty_ir(&self) -> String {
        self.0.module.pretty_print()
    }
}
