//! Operands: typed virtual registers and inline constants.

use std::fmt;
use std::rc::Rc;

use crate::analysis::OptType;

/// Slot in the executing frame's register file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterId(pub u32);

impl fmt::Display for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// A register tagged with the optimistic type lowering assumed for it.
/// The tag is advisory; the executor never trusts it without a guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Register {
    pub id: RegisterId,
    pub ty: OptType,
}

impl Register {
    pub fn new(id: RegisterId, ty: OptType) -> Self {
        Self { id, ty }
    }

    /// Frame index of this register.
    pub fn index(&self) -> usize {
        self.id.0 as usize
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ty == OptType::Generic {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{}:{}", self.id, self.ty)
        }
    }
}

/// Constant operand
#[derive(Debug, Clone, PartialEq)]
pub enum IrConstant {
    Undefined,
    Null,
    Boolean(bool),
    Int(i32),
    Number(f64),
    String(Rc<str>),
}

impl IrConstant {
    /// Integral values without a sign problem become `Int`.
    pub fn number(value: f64) -> Self {
        if value.fract() == 0.0
            && value >= i32::MIN as f64
            && value <= i32::MAX as f64
            && !(value == 0.0 && value.is_sign_negative())
        {
            IrConstant::Int(value as i32)
        } else {
            IrConstant::Number(value)
        }
    }
}

impl fmt::Display for IrConstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrConstant::Undefined => write!(f, "undefined"),
            IrConstant::Null => write!(f, "null"),
            IrConstant::Boolean(b) => write!(f, "{}", b),
            IrConstant::Int(i) => write!(f, "{}", i),
            IrConstant::Number(n) => write!(f, "{:?}", n),
            IrConstant::String(s) => write!(f, "{:?}", s),
        }
    }
}
