//! IR executor.
//!
//! Functions run block by block over a register frame. Property and call
//! instructions go through their dispatch sites; speculative arithmetic
//! tries its fast path until the first failure and then stays generic.
//!
//! Exceptions travel as `Err(Thrown::Exception)` and are routed to the
//! innermost handler of the frame that sees them. Interrupts unwind every
//! frame without running handlers.

mod frame;
mod ops;
mod property;

use std::rc::Rc;

use rustc_hash::FxHashSet;

pub use frame::{Frame, Handler};
pub use ops::Hint;

use super::convert::to_boolean;
use super::dispatch::{DiagnosticsHook, Linker};
use super::error::{ErrorKind, RuntimeError, StackFrame, Thrown, VmResult};
use super::object::{
    ArrayStorage, Cell, Closure, FunctionKind, Heap, NativeFunction, ObjectError, ObjectKind, ObjectRef,
    PropertyDescriptor, Slot,
};
use super::realm::Realm;
use super::safepoint::Safepoint;
use super::shape::PropertyAttrs;
use super::unit::UnitCode;
use super::value::Value;
use crate::analysis::{Binding, Capture, UpvalueSource};
use crate::compiler::ir::{
    BasicBlock, BasicBlockId, Coercion, FunctionId, IrConstant, IrFunction, IrInstr, Terminator, UnaryOp,
};
use crate::compiler::{compile, CompileErrorKind};
use crate::config::EngineOptions;

/// How a block ended.
enum Flow {
    Jump(BasicBlockId),
    Return(Value),
}

/// Function name and current line of an active call.
#[derive(Debug, Clone)]
struct TraceEntry {
    function: Rc<str>,
    line: u32,
}

/// Executes compiled units against one realm.
pub struct Interpreter<'a> {
    realm: &'a Realm,
    options: &'a EngineOptions,
    hook: Option<&'a DiagnosticsHook>,
    safepoint: Safepoint,
    depth: usize,
    trace: Vec<TraceEntry>,
    /// Stack captured where the propagating exception left its last handler
    pending_trace: Option<Vec<StackFrame>>,
}

impl<'a> Interpreter<'a> {
    pub fn new(
        realm: &'a Realm,
        options: &'a EngineOptions,
        hook: Option<&'a DiagnosticsHook>,
        safepoint: Safepoint,
    ) -> Self {
        Self {
            realm,
            options,
            hook,
            safepoint,
            depth: 0,
            trace: Vec::new(),
            pending_trace: None,
        }
    }

    pub fn realm(&self) -> &'a Realm {
        self.realm
    }

    pub fn shapes(&self) -> &'a Heap {
        &self.realm.heap
    }

    pub fn options(&self) -> &'a EngineOptions {
        self.options
    }

    fn linker(&self, unit: u64) -> Linker<'a> {
        Linker {
            fanout: self.options.polymorphic_fanout,
            relink_window: self.options.relink_window,
            unit,
            hook: self.hook,
        }
    }

    // ========================================================================
    // Entry points
    // ========================================================================

    /// Run the script body of `unit` in the global scope and return its
    /// completion value.
    pub fn run_script(&mut self, unit: Rc<UnitCode>) -> VmResult<Value> {
        let main = unit.module.main;
        let function = self.function_of(&unit, main)?;
        self.enter_call()?;
        let this = Value::Object(self.realm.global.clone());
        let mut frame = Frame::new(unit.clone(), function, Rc::from(Vec::new()), Vec::new(), this, None, &[]);
        self.trace.push(TraceEntry {
            function: Rc::from(function.display_name()),
            line: function.source_span.line,
        });
        let result = self.run_frame(&mut frame, function);
        self.trace.pop();
        self.depth -= 1;
        result
    }

    /// Compile and run `source` as a separate script (indirect `eval`).
    pub fn eval_source(&mut self, source: &str) -> VmResult<Value> {
        let module = match compile(source, &self.options.compile_options(), self.options.max_parse_depth) {
            Ok(module) => module,
            Err(err) => {
                let kind = match err.kind {
                    CompileErrorKind::Syntax => ErrorKind::SyntaxError,
                    CompileErrorKind::Reference => ErrorKind::ReferenceError,
                };
                return Err(self.throw(kind, err.message));
            }
        };
        self.run_script(Rc::new(UnitCode::new(module)))
    }

    /// Convert an escaped exception into the embedder-facing error.
    pub fn into_runtime_error(&mut self, thrown: Thrown) -> RuntimeError {
        let stack_trace = self.pending_trace.take().unwrap_or_default();
        let (kind, message) = match thrown {
            Thrown::Interrupt(reason) => (ErrorKind::Interrupted, reason.to_string()),
            Thrown::Exception(value) => describe_exception(&value),
        };
        RuntimeError {
            kind,
            message,
            stack_trace,
        }
    }

    // ========================================================================
    // Calls
    // ========================================================================

    fn enter_call(&mut self) -> VmResult<()> {
        if self.depth >= self.options.max_call_depth {
            return Err(self.throw(ErrorKind::RangeError, "Maximum call stack size exceeded"));
        }
        self.safepoint.poll()?;
        self.depth += 1;
        Ok(())
    }

    fn function_of<'u>(&self, unit: &'u UnitCode, id: FunctionId) -> VmResult<&'u IrFunction> {
        match unit.module.function(id) {
            Some(function) => Ok(function),
            None => Err(self.throw(ErrorKind::Error, format!("Unknown function {}", id))),
        }
    }

    /// `[[Call]]`
    pub fn call(&mut self, callee: &Value, this: Value, args: &[Value]) -> VmResult<Value> {
        let Value::Object(object) = callee else {
            return Err(self.not_callable(callee));
        };
        let kind = match &object.borrow().kind {
            ObjectKind::Function(kind) => Some(kind.clone()),
            _ => None,
        };
        match kind {
            Some(FunctionKind::Script(closure)) => self.call_closure(object, &closure, this, args),
            Some(FunctionKind::Native(native)) => self.call_native(&native, &this, args, false),
            None => match object.host() {
                Some(host) if host.is_callable() => host.invoke(&this, args).map_err(|e| self.host_error(e)),
                _ => Err(self.not_callable(callee)),
            },
        }
    }

    fn call_native(&mut self, native: &NativeFunction, this: &Value, args: &[Value], construct: bool) -> VmResult<Value> {
        self.enter_call()?;
        let result = (native.call)(self, this, args, construct);
        self.depth -= 1;
        result
    }

    fn call_closure(&mut self, callee: &ObjectRef, closure: &Closure, this: Value, args: &[Value]) -> VmResult<Value> {
        let unit = closure.unit.clone();
        let function = self.function_of(&unit, closure.function)?;
        let this = if function.strict {
            this
        } else {
            match this {
                Value::Undefined | Value::Null => Value::Object(self.realm.global.clone()),
                Value::Object(_) => this,
                primitive => Value::Object(self.to_object(&primitive)?),
            }
        };
        self.enter_call()?;
        let mut frame = Frame::new(
            unit.clone(),
            function,
            closure.upvalues.clone(),
            closure.with_stack.to_vec(),
            this,
            Some(callee.clone()),
            args,
        );
        self.trace.push(TraceEntry {
            function: Rc::from(function.display_name()),
            line: function.source_span.line,
        });
        let result = self.run_frame(&mut frame, function);
        self.trace.pop();
        self.depth -= 1;
        result
    }

    /// `[[Construct]]`
    pub fn construct(&mut self, callee: &Value, args: &[Value]) -> VmResult<Value> {
        let Value::Object(object) = callee else {
            return Err(self.not_constructor(callee));
        };
        let kind = match &object.borrow().kind {
            ObjectKind::Function(kind) => Some(kind.clone()),
            _ => None,
        };
        match kind {
            Some(FunctionKind::Script(closure)) => {
                let constructible = closure.unit.module.function(closure.function).is_some_and(|f| f.constructible);
                if !constructible {
                    return Err(self.not_constructor(callee));
                }
                let proto = match self.get_value(callee, "prototype")? {
                    Value::Object(proto) => proto,
                    _ => self.realm.intrinsics.object_prototype.clone(),
                };
                let instance = ObjectRef::new(self.shapes(), Some(proto), ObjectKind::Ordinary);
                let result = self.call_closure(object, &closure, Value::Object(instance.clone()), args)?;
                Ok(match result {
                    Value::Object(_) => result,
                    _ => Value::Object(instance),
                })
            }
            Some(FunctionKind::Native(native)) if native.constructible => {
                self.call_native(&native, &Value::Undefined, args, true)
            }
            _ => Err(self.not_constructor(callee)),
        }
    }

    // ========================================================================
    // Run loop
    // ========================================================================

    fn run_frame(&mut self, frame: &mut Frame, function: &IrFunction) -> VmResult<Value> {
        let mut current = function.entry_block;
        loop {
            let Some(block) = function.get_block(current) else {
                return Err(self.throw(ErrorKind::Error, format!("Missing block {}", current)));
            };
            match self.run_block(frame, block) {
                Ok(Flow::Jump(next)) => current = next,
                Ok(Flow::Return(value)) => return Ok(value),
                Err(Thrown::Exception(value)) => match frame.handlers.pop() {
                    Some(handler) => {
                        self.pending_trace = None;
                        frame.with_stack.truncate(handler.with_depth);
                        frame.set(handler.exception, value);
                        current = handler.catch_block;
                    }
                    None => {
                        self.capture_trace();
                        return Err(Thrown::Exception(value));
                    }
                },
                Err(interrupt) => {
                    self.capture_trace();
                    return Err(interrupt);
                }
            }
        }
    }

    fn capture_trace(&mut self) {
        if self.pending_trace.is_none() {
            let frames = self
                .trace
                .iter()
                .rev()
                .map(|entry| StackFrame {
                    function: entry.function.to_string(),
                    line: entry.line,
                })
                .collect();
            self.pending_trace = Some(frames);
        }
    }

    fn run_block(&mut self, frame: &mut Frame, block: &BasicBlock) -> VmResult<Flow> {
        for (instr, line) in block.instructions.iter().zip(block.lines.iter()) {
            if let Some(entry) = self.trace.last_mut() {
                entry.line = *line;
            }
            self.step(frame, instr)?;
        }
        match &block.terminator {
            Terminator::Jump(target) => Ok(Flow::Jump(*target)),
            Terminator::LoopBack(target) => {
                self.safepoint.poll()?;
                Ok(Flow::Jump(*target))
            }
            Terminator::Branch {
                cond,
                then_block,
                else_block,
            } => Ok(Flow::Jump(if to_boolean(frame.get(*cond)) { *then_block } else { *else_block })),
            Terminator::Return(value) => Ok(Flow::Return(frame.get(*value).clone())),
            Terminator::Throw(value) => Err(Thrown::Exception(frame.get(*value).clone())),
            Terminator::Unreachable => Ok(Flow::Return(Value::Undefined)),
        }
    }

    fn step(&mut self, frame: &mut Frame, instr: &IrInstr) -> VmResult<()> {
        match instr {
            IrInstr::Const { dest, value } => {
                let value = match value {
                    IrConstant::Undefined => Value::Undefined,
                    IrConstant::Null => Value::Null,
                    IrConstant::Boolean(b) => Value::Boolean(*b),
                    IrConstant::Int(i) => Value::Int(*i),
                    IrConstant::Number(n) => Value::Number(*n),
                    IrConstant::String(s) => Value::String(s.clone()),
                };
                frame.set(*dest, value);
            }
            IrInstr::Move { dest, src } => {
                let value = frame.get(*src).clone();
                frame.set(*dest, value);
            }

            IrInstr::LoadLocal { dest, slot } => {
                let value = frame.locals[*slot as usize].clone();
                frame.set(*dest, value);
            }
            IrInstr::StoreLocal { slot, value } => {
                frame.locals[*slot as usize] = frame.get(*value).clone();
            }
            IrInstr::LoadCell { dest, cell } => {
                let value = frame.cells[*cell as usize].borrow().clone();
                frame.set(*dest, value);
            }
            IrInstr::StoreCell { cell, value } => {
                *frame.cells[*cell as usize].borrow_mut() = frame.get(*value).clone();
            }
            IrInstr::ResetCell { cell } => {
                frame.cells[*cell as usize] = Rc::new(std::cell::RefCell::new(Value::Undefined));
            }
            IrInstr::LoadUpvalue { dest, index } => {
                let value = frame.upvalues[*index as usize].borrow().clone();
                frame.set(*dest, value);
            }
            IrInstr::StoreUpvalue { index, value } => {
                *frame.upvalues[*index as usize].borrow_mut() = frame.get(*value).clone();
            }
            IrInstr::LoadGlobal {
                dest,
                name,
                typeof_guard,
            } => {
                let value = self.load_global(name, *typeof_guard)?;
                frame.set(*dest, value);
            }
            IrInstr::StoreGlobal { name, value, strict } => {
                let value = frame.get(*value).clone();
                self.store_global(name, value, *strict)?;
            }
            IrInstr::DeclareGlobal { name } => {
                let global = &self.realm.global;
                let missing = !global.borrow().has_own(name);
                if missing {
                    global
                        .borrow_mut()
                        .add_own(self.shapes(), name, Value::Undefined, PropertyAttrs::data(true, true, false))
                        .map_err(|e| self.object_error(e))?;
                }
            }
            IrInstr::LoadName {
                dest,
                name,
                fallback,
                typeof_guard,
            } => {
                let value = match self.with_holder(frame, name)? {
                    Some(holder) => self.get_from(&holder, name, &Value::Object(holder.clone()))?,
                    None => self.load_binding(frame, fallback, name, *typeof_guard)?,
                };
                frame.set(*dest, value);
            }
            IrInstr::StoreName {
                name,
                value,
                fallback,
                strict,
            } => {
                let value = frame.get(*value).clone();
                match self.with_holder(frame, name)? {
                    Some(holder) => self.put_on(&holder, name, value, *strict)?,
                    None => self.store_binding(frame, fallback, name, value, *strict)?,
                }
            }
            IrInstr::DeleteName { dest, name, binding } => {
                let deleted = match self.with_holder(frame, name)? {
                    Some(holder) => self.delete_property(&holder, name, false)?,
                    None => match binding.fallback() {
                        Binding::Global => {
                            let global = self.realm.global.clone();
                            self.delete_property(&global, name, false)?
                        }
                        _ => false,
                    },
                };
                frame.set(*dest, Value::Boolean(deleted));
            }

            IrInstr::Binary {
                dest,
                op,
                left,
                right,
                speculation,
            } => {
                let left = frame.get(*left).clone();
                let right = frame.get(*right).clone();
                let fast = match speculation {
                    Some(spec) => self.speculate_binary(&frame.unit, *spec, *op, &left, &right),
                    None => None,
                };
                let value = match fast {
                    Some(value) => value,
                    None => self.binary(*op, &left, &right)?,
                };
                frame.set(*dest, value);
            }
            IrInstr::Unary {
                dest,
                op,
                operand,
                speculation,
            } => {
                let operand = frame.get(*operand).clone();
                let fast = match speculation {
                    Some(spec) if *op == UnaryOp::Neg => self.speculate_negate(&frame.unit, *spec, &operand),
                    _ => None,
                };
                let value = match fast {
                    Some(value) => value,
                    None => self.unary(*op, &operand)?,
                };
                frame.set(*dest, value);
            }
            IrInstr::Coerce { dest, value, kind } => {
                let value = frame.get(*value).clone();
                let coerced = match kind {
                    Coercion::ToNumber => match value {
                        Value::Int(_) => value,
                        other => Value::number(self.to_number(&other)?),
                    },
                    Coercion::ToString => Value::String(self.to_string(&value)?),
                    Coercion::ToPropertyKey => Value::String(self.to_property_key(&value)?),
                    Coercion::ToObject => Value::Object(self.to_object(&value)?),
                };
                frame.set(*dest, coerced);
            }

            IrInstr::GetProperty {
                dest,
                object,
                key,
                site,
            } => {
                let receiver = frame.get(*object).clone();
                let value = self.get_at_site(&frame.unit, *site, &receiver, key, false)?;
                frame.set(*dest, value);
            }
            IrInstr::SetProperty {
                object,
                key,
                value,
                site,
                strict,
            } => {
                let receiver = frame.get(*object).clone();
                let value = frame.get(*value).clone();
                self.set_at_site(&frame.unit, *site, &receiver, key, value, false, *strict)?;
            }
            IrInstr::ElementKey {
                dest,
                object,
                key,
                write,
            } => {
                let action = if *write { "set" } else { "read" };
                self.require_object_coercible(frame.get(*object), frame.get(*key), action)?;
                let key = self.to_property_key(frame.get(*key))?;
                frame.set(*dest, Value::String(key));
            }
            IrInstr::GetElement {
                dest,
                object,
                key,
                site,
            } => {
                let receiver = frame.get(*object).clone();
                self.require_object_coercible(&receiver, frame.get(*key), "read")?;
                let key = self.to_property_key(frame.get(*key))?;
                let value = self.get_at_site(&frame.unit, *site, &receiver, &key, true)?;
                frame.set(*dest, value);
            }
            IrInstr::SetElement {
                object,
                key,
                value,
                site,
                strict,
            } => {
                let receiver = frame.get(*object).clone();
                self.require_object_coercible(&receiver, frame.get(*key), "set")?;
                let key = self.to_property_key(frame.get(*key))?;
                let value = frame.get(*value).clone();
                self.set_at_site(&frame.unit, *site, &receiver, &key, value, true, *strict)?;
            }
            IrInstr::Delete {
                dest,
                object,
                key,
                strict,
            } => {
                let target = frame.get(*object).clone();
                self.require_object_coercible(&target, frame.get(*key), "delete")?;
                let key = self.to_property_key(frame.get(*key))?;
                let object = self.to_object(&target)?;
                let deleted = self.delete_property(&object, &key, *strict)?;
                frame.set(*dest, Value::Boolean(deleted));
            }
            IrInstr::Call {
                dest,
                callee,
                this,
                args,
                site,
            } => {
                let callee = frame.get(*callee).clone();
                let this = this.map(|r| frame.get(r).clone()).unwrap_or_default();
                let args: Vec<Value> = args.iter().map(|r| frame.get(*r).clone()).collect();
                let value = self.call_at_site(&frame.unit, *site, &callee, this, &args)?;
                frame.set(*dest, value);
            }
            IrInstr::New {
                dest,
                callee,
                args,
                site,
            } => {
                let callee = frame.get(*callee).clone();
                let args: Vec<Value> = args.iter().map(|r| frame.get(*r).clone()).collect();
                let value = self.construct_at_site(&frame.unit, *site, &callee, &args)?;
                frame.set(*dest, value);
            }

            IrInstr::MakeClosure { dest, function } => {
                let unit = frame.unit.clone();
                let target = self.function_of(&unit, *function)?;
                let upvalues: Rc<[Cell]> = target
                    .upvalues
                    .iter()
                    .map(|source| match source {
                        UpvalueSource::ParentCell(i) => frame.cells[*i as usize].clone(),
                        UpvalueSource::ParentUpvalue(i) => frame.upvalues[*i as usize].clone(),
                    })
                    .collect();
                let closure = Closure {
                    unit: unit.clone(),
                    function: *function,
                    upvalues,
                    with_stack: Rc::from(frame.with_stack.as_slice()),
                };
                let object = self.make_closure(closure, target)?;
                frame.set(*dest, Value::Object(object));
            }
            IrInstr::LoadThis { dest } => {
                let this = frame.this.clone();
                frame.set(*dest, this);
            }
            IrInstr::LoadCallee { dest } => {
                let callee = frame.callee.clone().map(Value::Object).unwrap_or_default();
                frame.set(*dest, callee);
            }
            IrInstr::CreateArguments { dest } => {
                let arguments = self.create_arguments(frame)?;
                frame.set(*dest, Value::Object(arguments));
            }
            IrInstr::NewObject { dest } => {
                let object = self.new_object();
                frame.set(*dest, Value::Object(object));
            }
            IrInstr::NewArray { dest, elements } => {
                let values = elements.iter().map(|e| e.map(|r| frame.get(r).clone())).collect();
                let array = self.array_from(ArrayStorage::with_holes(values));
                frame.set(*dest, Value::Object(array));
            }
            IrInstr::NewRegExp { dest, pattern, flags } => {
                let regexp = self.new_regexp(pattern.clone(), flags.clone())?;
                frame.set(*dest, Value::Object(regexp));
            }
            IrInstr::DefineField { object, key, value } => {
                let Value::Object(target) = frame.get(*object).clone() else {
                    return Err(self.throw(ErrorKind::TypeError, "Object literal target is not an object"));
                };
                let value = frame.get(*value).clone();
                self.define_property(&target, key, PropertyDescriptor::data(value, PropertyAttrs::DEFAULT))?;
            }
            IrInstr::DefineAccessor {
                object,
                key,
                getter,
                setter,
            } => {
                let Value::Object(target) = frame.get(*object).clone() else {
                    return Err(self.throw(ErrorKind::TypeError, "Object literal target is not an object"));
                };
                let function = |reg: Option<crate::compiler::ir::Register>| {
                    reg.map(|r| frame.get(r).as_object().cloned())
                };
                let desc = PropertyDescriptor {
                    get: function(*getter),
                    set: function(*setter),
                    enumerable: Some(true),
                    configurable: Some(true),
                    ..PropertyDescriptor::default()
                };
                self.define_property(&target, key, desc)?;
            }

            IrInstr::EnterWith { object } => {
                let object = self.to_object(frame.get(*object))?;
                frame.with_stack.push(object);
            }
            IrInstr::ExitWith => {
                frame.with_stack.pop();
            }
            IrInstr::ForInIterator { dest, object } => {
                let target = frame.get(*object).clone();
                let iterator = self.key_iterator(&target)?;
                frame.set(*dest, Value::Object(iterator));
            }
            IrInstr::ForInNext { dest, done, iterator } => {
                let Value::Object(iterator) = frame.get(*iterator).clone() else {
                    return Err(self.throw(ErrorKind::TypeError, "Invalid for-in iterator"));
                };
                match self.next_key(&iterator)? {
                    Some(key) => {
                        frame.set(*dest, Value::String(key));
                        frame.set(*done, Value::Boolean(false));
                    }
                    None => {
                        frame.set(*dest, Value::Undefined);
                        frame.set(*done, Value::Boolean(true));
                    }
                }
            }
            IrInstr::PushHandler { catch_block, exception } => {
                let with_depth = frame.with_stack.len();
                frame.handlers.push(Handler {
                    catch_block: *catch_block,
                    exception: *exception,
                    with_depth,
                });
            }
            IrInstr::PopHandler => {
                frame.handlers.pop();
            }
        }
        Ok(())
    }

    // ========================================================================
    // Bindings
    // ========================================================================

    fn load_global(&mut self, name: &str, typeof_guard: bool) -> VmResult<Value> {
        let global = self.realm.global.clone();
        if self.has_property(&global, name)? {
            return self.get_from(&global, name, &Value::Object(global.clone()));
        }
        if typeof_guard {
            Ok(Value::Undefined)
        } else {
            Err(self.throw(ErrorKind::ReferenceError, format!("{} is not defined", name)))
        }
    }

    fn store_global(&mut self, name: &str, value: Value, strict: bool) -> VmResult<()> {
        let global = self.realm.global.clone();
        if strict && !self.has_property(&global, name)? {
            return Err(self.throw(ErrorKind::ReferenceError, format!("{} is not defined", name)));
        }
        self.put_on(&global, name, value, strict)
    }

    /// Innermost `with` object that has `name`.
    fn with_holder(&mut self, frame: &Frame, name: &str) -> VmResult<Option<ObjectRef>> {
        for object in frame.with_stack.iter().rev() {
            if self.has_property(object, name)? {
                return Ok(Some(object.clone()));
            }
        }
        Ok(None)
    }

    fn load_binding(&mut self, frame: &Frame, binding: &Binding, name: &str, typeof_guard: bool) -> VmResult<Value> {
        Ok(match binding.fallback() {
            Binding::Local(slot) => frame.locals[*slot as usize].clone(),
            Binding::Captured(Capture::Own(cell)) => frame.cells[*cell as usize].borrow().clone(),
            Binding::Captured(Capture::Upvalue(index)) => frame.upvalues[*index as usize].borrow().clone(),
            Binding::Global | Binding::Dynamic(_) => return self.load_global(name, typeof_guard),
        })
    }

    fn store_binding(&mut self, frame: &mut Frame, binding: &Binding, name: &str, value: Value, strict: bool) -> VmResult<()> {
        match binding.fallback() {
            Binding::Local(slot) => frame.locals[*slot as usize] = value,
            Binding::Captured(Capture::Own(cell)) => *frame.cells[*cell as usize].borrow_mut() = value,
            Binding::Captured(Capture::Upvalue(index)) => *frame.upvalues[*index as usize].borrow_mut() = value,
            Binding::Global | Binding::Dynamic(_) => self.store_global(name, value, strict)?,
        }
        Ok(())
    }

    // ========================================================================
    // Allocation
    // ========================================================================

    pub fn new_object(&self) -> ObjectRef {
        ObjectRef::new(
            self.shapes(),
            Some(self.realm.intrinsics.object_prototype.clone()),
            ObjectKind::Ordinary,
        )
    }

    pub fn new_array(&self, elements: Vec<Value>) -> ObjectRef {
        self.array_from(ArrayStorage::from_elements(elements))
    }

    fn array_from(&self, storage: ArrayStorage) -> ObjectRef {
        ObjectRef::new(
            self.shapes(),
            Some(self.realm.intrinsics.array_prototype.clone()),
            ObjectKind::Array(storage),
        )
    }

    /// An error object of `kind` with an own `message`.
    pub fn new_error(&self, kind: ErrorKind, message: &str) -> ObjectRef {
        let error = ObjectRef::new(
            self.shapes(),
            Some(self.realm.intrinsics.error_prototype_for(kind).clone()),
            ObjectKind::Error,
        );
        error.borrow_mut().define_raw(
            self.shapes(),
            "message",
            Slot::Data(Value::from(message)),
            PropertyAttrs::HIDDEN,
        );
        error
    }

    /// Build the exception for a runtime failure.
    pub fn throw(&self, kind: ErrorKind, message: impl AsRef<str>) -> Thrown {
        Thrown::Exception(Value::Object(self.new_error(kind, message.as_ref())))
    }

    pub fn object_error(&self, err: ObjectError) -> Thrown {
        let kind = match err {
            ObjectError::InvalidArrayLength => ErrorKind::RangeError,
            _ => ErrorKind::TypeError,
        };
        self.throw(kind, err.to_string())
    }

    pub fn host_error(&self, err: super::host::HostError) -> Thrown {
        self.throw(ErrorKind::TypeError, err.to_string())
    }

    fn not_callable(&self, value: &Value) -> Thrown {
        self.throw(ErrorKind::TypeError, format!("{} is not a function", describe(value)))
    }

    fn not_constructor(&self, value: &Value) -> Thrown {
        self.throw(ErrorKind::TypeError, format!("{} is not a constructor", describe(value)))
    }

    fn make_closure(&self, closure: Closure, function: &IrFunction) -> VmResult<ObjectRef> {
        let shapes = self.shapes();
        let name = function.name.clone().unwrap_or_else(|| Rc::from(""));
        let object = ObjectRef::new(
            shapes,
            Some(self.realm.intrinsics.function_prototype.clone()),
            ObjectKind::Function(FunctionKind::Script(closure)),
        );
        {
            let mut body = object.borrow_mut();
            body.define_raw(shapes, "length", Slot::Data(Value::Int(function.param_count as i32)), PropertyAttrs::FROZEN);
            body.define_raw(shapes, "name", Slot::Data(Value::String(name)), PropertyAttrs::FROZEN);
        }
        if function.constructible {
            let prototype = self.new_object();
            prototype.borrow_mut().define_raw(
                shapes,
                "constructor",
                Slot::Data(Value::Object(object.clone())),
                PropertyAttrs::HIDDEN,
            );
            object.borrow_mut().define_raw(
                shapes,
                "prototype",
                Slot::Data(Value::Object(prototype)),
                PropertyAttrs::data(true, false, false),
            );
        }
        Ok(object)
    }

    fn create_arguments(&self, frame: &Frame) -> VmResult<ObjectRef> {
        let shapes = self.shapes();
        let arguments = ObjectRef::new(
            shapes,
            Some(self.realm.intrinsics.object_prototype.clone()),
            ObjectKind::Arguments,
        );
        let strict = frame
            .unit
            .module
            .function(frame.function)
            .is_some_and(|f| f.strict);
        {
            let mut body = arguments.borrow_mut();
            for (index, value) in frame.args.iter().enumerate() {
                body.add_own(shapes, &index.to_string(), value.clone(), PropertyAttrs::DEFAULT)
                    .map_err(|e| self.object_error(e))?;
            }
            body.define_raw(shapes, "length", Slot::Data(Value::number(frame.args.len() as f64)), PropertyAttrs::HIDDEN);
            if !strict {
                if let Some(callee) = &frame.callee {
                    body.define_raw(shapes, "callee", Slot::Data(Value::Object(callee.clone())), PropertyAttrs::HIDDEN);
                }
            }
        }
        Ok(arguments)
    }

    fn new_regexp(&self, source: Rc<str>, flags: Rc<str>) -> VmResult<ObjectRef> {
        let shapes = self.shapes();
        let regexp = ObjectRef::new(
            shapes,
            Some(self.realm.intrinsics.regexp_prototype.clone()),
            ObjectKind::RegExp {
                source: source.clone(),
                flags: flags.clone(),
            },
        );
        {
            let mut body = regexp.borrow_mut();
            body.define_raw(shapes, "source", Slot::Data(Value::String(source)), PropertyAttrs::FROZEN);
            for (name, flag) in [("global", 'g'), ("ignoreCase", 'i'), ("multiline", 'm')] {
                body.define_raw(
                    shapes,
                    name,
                    Slot::Data(Value::Boolean(flags.contains(flag))),
                    PropertyAttrs::FROZEN,
                );
            }
            body.define_raw(shapes, "lastIndex", Slot::Data(Value::Int(0)), PropertyAttrs::data(true, false, false));
        }
        Ok(regexp)
    }

    // ========================================================================
    // for-in
    // ========================================================================

    fn key_iterator(&mut self, target: &Value) -> VmResult<ObjectRef> {
        let (keys, object) = if target.is_nullish() {
            (Vec::new(), None)
        } else {
            let object = self.to_object(target)?;
            (self.enumerable_keys(&object), Some(object))
        };
        Ok(ObjectRef::new(
            self.shapes(),
            None,
            ObjectKind::KeyIterator { keys, next: 0, object },
        ))
    }

    /// Enumerable keys of `object` and its prototypes, each reported once
    /// and shadowed by non-enumerable own properties.
    fn enumerable_keys(&self, object: &ObjectRef) -> Vec<Rc<str>> {
        let mut seen: FxHashSet<Rc<str>> = FxHashSet::default();
        let mut keys = Vec::new();
        let mut cursor = Some(object.clone());
        while let Some(current) = cursor {
            let body = current.borrow();
            if !matches!(body.kind, ObjectKind::Host(_)) {
                let enumerable: FxHashSet<Rc<str>> = body.own_keys(true).into_iter().collect();
                for key in body.own_keys(false) {
                    if seen.insert(key.clone()) && enumerable.contains(&key) {
                        keys.push(key);
                    }
                }
            }
            cursor = body.proto().cloned();
        }
        keys
    }

    fn next_key(&mut self, iterator: &ObjectRef) -> VmResult<Option<Rc<str>>> {
        loop {
            let (key, object) = {
                let mut body = iterator.borrow_mut();
                let ObjectKind::KeyIterator { keys, next, object } = &mut body.kind else {
                    return Ok(None);
                };
                let Some(key) = keys.get(*next).cloned() else {
                    return Ok(None);
                };
                *next += 1;
                (key, object.clone())
            };
            // Keys deleted during the loop are skipped
            match object {
                Some(object) if !self.has_property(&object, &key)? => continue,
                _ => return Ok(Some(key)),
            }
        }
    }
}

/// Short rendering of a value for error messages.
fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Object(o) if o.is_callable() => "function".to_string(),
        Value::Object(_) => "object".to_string(),
        other => other.to_string(),
    }
}

/// Kind and message of an uncaught exception, read without running
/// script code.
fn describe_exception(value: &Value) -> (ErrorKind, String) {
    if let Value::Object(object) = value {
        let is_error = matches!(object.borrow().kind, ObjectKind::Error);
        if is_error {
            let kind = object
                .get_data("name")
                .and_then(|name| name.as_str().and_then(ErrorKind::from_name))
                .unwrap_or(ErrorKind::Error);
            let message = match object.get_data("message") {
                Some(Value::Object(_)) | None => String::new(),
                Some(message) => message.to_string(),
            };
            return (kind, message);
        }
    }
    let rendered = match value {
        Value::String(s) => s.to_string(),
        other => other.to_string(),
    };
    (ErrorKind::Error, format!("Uncaught {}", rendered))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_exception_for_primitives() {
        let (kind, message) = describe_exception(&Value::Int(42));
        assert_eq!(kind, ErrorKind::Error);
        assert_eq!(message, "Uncaught 42");
        let (_, message) = describe_exception(&Value::from("boom"));
        assert_eq!(message, "Uncaught boom");
    }

    #[test]
    fn test_describe_values() {
        assert_eq!(describe(&Value::Undefined), "undefined");
        assert_eq!(describe(&Value::from("f")), "\"f\"");
    }
}
