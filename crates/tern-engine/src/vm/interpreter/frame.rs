//! Activation records.

use std::cell::RefCell;
use std::rc::Rc;

use crate::compiler::ir::{BasicBlockId, FunctionId, IrFunction, Register};
use crate::vm::object::{Cell, ObjectRef};
use crate::vm::unit::UnitCode;
use crate::vm::value::Value;

/// An installed `try` handler.
#[derive(Debug, Clone, Copy)]
pub struct Handler {
    pub catch_block: BasicBlockId,
    pub exception: Register,
    /// `with` depth to restore when the handler fires
    pub with_depth: usize,
}

/// One script call.
pub struct Frame {
    pub unit: Rc<UnitCode>,
    pub function: FunctionId,
    pub registers: Vec<Value>,
    /// Parameters first, then `var` and `let` slots
    pub locals: Vec<Value>,
    pub cells: Vec<Cell>,
    pub upvalues: Rc<[Cell]>,
    pub this: Value,
    pub callee: Option<ObjectRef>,
    pub args: Vec<Value>,
    pub with_stack: Vec<ObjectRef>,
    pub handlers: Vec<Handler>,
}

impl Frame {
    pub fn new(
        unit: Rc<UnitCode>,
        function: &IrFunction,
        upvalues: Rc<[Cell]>,
        with_stack: Vec<ObjectRef>,
        this: Value,
        callee: Option<ObjectRef>,
        args: &[Value],
    ) -> Self {
        let mut locals = vec![Value::Undefined; function.local_count.max(function.param_count) as usize];
        for (slot, arg) in locals.iter_mut().zip(args.iter().take(function.param_count as usize)) {
            *slot = arg.clone();
        }
        let cells = (0..function.cell_count)
            .map(|_| Rc::new(RefCell::new(Value::Undefined)))
            .collect();
        Self {
            unit,
            function: function.id,
            registers: vec![Value::Undefined; function.register_count as usize],
            locals,
            cells,
            upvalues,
            this,
            callee,
            args: args.to_vec(),
            with_stack,
            handlers: Vec::new(),
        }
    }

    #[inline]
    pub fn get(&self, reg: Register) -> &Value {
        &self.registers[reg.index()]
    }

    #[inline]
    pub fn set(&mut self, reg: Register, value: Value) {
        self.registers[reg.index()] = value;
    }
}
