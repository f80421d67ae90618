//! IR Instructions
//!
//! Three-address instructions over virtual registers. Property and call
//! instructions carry the [`SiteId`] of their dispatch site; speculative
//! arithmetic carries a [`Speculation`].

use std::rc::Rc;

use super::block::BasicBlockId;
use super::value::{IrConstant, Register};
use crate::analysis::{Binding, OptType};

/// Function identifier in the IR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionId(pub u32);

impl FunctionId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for FunctionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fn{}", self.0)
    }
}

/// Dispatch site identifier, sequential per compiled unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SiteId(pub u32);

impl SiteId {
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for SiteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "site{}", self.0)
    }
}

/// Index into the speculation table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpecId(pub u32);

impl std::fmt::Display for SpecId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "spec{}", self.0)
    }
}

/// Optimistic assumption attached to an arithmetic instruction. The
/// generic form of the same instruction is its deoptimization target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Speculation {
    pub id: SpecId,
    pub ty: OptType,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
    In,
    InstanceOf,
}

impl BinaryOp {
    pub fn is_arithmetic(self) -> bool {
        matches!(self, BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod)
    }

    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Mod => "mod",
            BinaryOp::Eq => "eq",
            BinaryOp::Ne => "ne",
            BinaryOp::StrictEq => "strict_eq",
            BinaryOp::StrictNe => "strict_ne",
            BinaryOp::Lt => "lt",
            BinaryOp::Le => "le",
            BinaryOp::Gt => "gt",
            BinaryOp::Ge => "ge",
            BinaryOp::BitAnd => "and",
            BinaryOp::BitOr => "or",
            BinaryOp::BitXor => "xor",
            BinaryOp::Shl => "shl",
            BinaryOp::Shr => "shr",
            BinaryOp::UShr => "ushr",
            BinaryOp::In => "in",
            BinaryOp::InstanceOf => "instanceof",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
    Typeof,
}

impl UnaryOp {
    pub fn name(self) -> &'static str {
        match self {
            UnaryOp::Neg => "neg",
            UnaryOp::Not => "not",
            UnaryOp::BitNot => "bitnot",
            UnaryOp::Typeof => "typeof",
        }
    }
}

/// Explicit conversions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Coercion {
    ToNumber,
    ToString,
    ToPropertyKey,
    ToObject,
}

impl Coercion {
    pub fn name(self) -> &'static str {
        match self {
            Coercion::ToNumber => "to_number",
            Coercion::ToString => "to_string",
            Coercion::ToPropertyKey => "to_property_key",
            Coercion::ToObject => "to_object",
        }
    }
}

/// IR instruction
#[derive(Debug, Clone, PartialEq)]
pub enum IrInstr {
    Const {
        dest: Register,
        value: IrConstant,
    },
    Move {
        dest: Register,
        src: Register,
    },

    // ------------------------------------------------------------------
    // Environment access
    // ------------------------------------------------------------------
    LoadLocal {
        dest: Register,
        slot: u32,
    },
    StoreLocal {
        slot: u32,
        value: Register,
    },
    LoadCell {
        dest: Register,
        cell: u32,
    },
    StoreCell {
        cell: u32,
        value: Register,
    },
    /// Replace a frame cell with a fresh one holding `undefined`
    ResetCell {
        cell: u32,
    },
    LoadUpvalue {
        dest: Register,
        index: u32,
    },
    StoreUpvalue {
        index: u32,
        value: Register,
    },
    /// Read a global; a missing name is a `ReferenceError` unless
    /// `typeof_guard` is set
    LoadGlobal {
        dest: Register,
        name: Rc<str>,
        typeof_guard: bool,
    },
    /// Write a global; strict code may not create one implicitly
    StoreGlobal {
        name: Rc<str>,
        value: Register,
        strict: bool,
    },
    /// Create a global property holding `undefined` if it does not exist
    DeclareGlobal {
        name: Rc<str>,
    },
    /// Look a name up in the active `with` objects, then in `fallback`
    LoadName {
        dest: Register,
        name: Rc<str>,
        fallback: Binding,
        typeof_guard: bool,
    },
    StoreName {
        name: Rc<str>,
        value: Register,
        fallback: Binding,
        strict: bool,
    },
    /// `delete name` in sloppy code
    DeleteName {
        dest: Register,
        name: Rc<str>,
        binding: Binding,
    },

    // ------------------------------------------------------------------
    // Arithmetic and conversion
    // ------------------------------------------------------------------
    Binary {
        dest: Register,
        op: BinaryOp,
        left: Register,
        right: Register,
        speculation: Option<Speculation>,
    },
    Unary {
        dest: Register,
        op: UnaryOp,
        operand: Register,
        speculation: Option<Speculation>,
    },
    Coerce {
        dest: Register,
        value: Register,
        kind: Coercion,
    },

    // ------------------------------------------------------------------
    // Property access and calls
    // ------------------------------------------------------------------
    GetProperty {
        dest: Register,
        object: Register,
        key: Rc<str>,
        site: SiteId,
    },
    SetProperty {
        object: Register,
        key: Rc<str>,
        value: Register,
        site: SiteId,
        strict: bool,
    },
    /// Check `object` is not null or undefined and convert `key` to a
    /// property key string. Emitted once per computed member expression,
    /// before any right-hand side runs.
    ElementKey {
        dest: Register,
        object: Register,
        key: Register,
        write: bool,
    },
    GetElement {
        dest: Register,
        object: Register,
        key: Register,
        site: SiteId,
    },
    SetElement {
        object: Register,
        key: Register,
        value: Register,
        site: SiteId,
        strict: bool,
    },
    Delete {
        dest: Register,
        object: Register,
        key: Register,
        strict: bool,
    },
    Call {
        dest: Register,
        callee: Register,
        this: Option<Register>,
        args: Vec<Register>,
        site: SiteId,
    },
    New {
        dest: Register,
        callee: Register,
        args: Vec<Register>,
        site: SiteId,
    },

    // ------------------------------------------------------------------
    // Closures and allocation
    // ------------------------------------------------------------------
    MakeClosure {
        dest: Register,
        function: FunctionId,
    },
    LoadThis {
        dest: Register,
    },
    LoadCallee {
        dest: Register,
    },
    CreateArguments {
        dest: Register,
    },
    NewObject {
        dest: Register,
    },
    NewArray {
        dest: Register,
        elements: Vec<Option<Register>>,
    },
    NewRegExp {
        dest: Register,
        pattern: Rc<str>,
        flags: Rc<str>,
    },
    /// Own data property of an object literal
    DefineField {
        object: Register,
        key: Rc<str>,
        value: Register,
    },
    DefineAccessor {
        object: Register,
        key: Rc<str>,
        getter: Option<Register>,
        setter: Option<Register>,
    },

    // ------------------------------------------------------------------
    // Scopes, iteration and handlers
    // ------------------------------------------------------------------
    EnterWith {
        object: Register,
    },
    ExitWith,
    /// Snapshot the enumerable keys of `object`
    ForInIterator {
        dest: Register,
        object: Register,
    },
    /// Next key into `dest`; `done` is true once the snapshot is exhausted
    ForInNext {
        dest: Register,
        done: Register,
        iterator: Register,
    },
    /// Route exceptions to `catch_block`, storing the thrown value in
    /// `exception`
    PushHandler {
        catch_block: BasicBlockId,
        exception: Register,
    },
    PopHandler,
}

impl IrInstr {
    /// Register written by this instruction, if any.
    pub fn dest(&self) -> Option<Register> {
        match self {
            IrInstr::Const { dest, .. }
            | IrInstr::Move { dest, .. }
            | IrInstr::LoadLocal { dest, .. }
            | IrInstr::LoadCell { dest, .. }
            | IrInstr::LoadUpvalue { dest, .. }
            | IrInstr::LoadGlobal { dest, .. }
            | IrInstr::LoadName { dest, .. }
            | IrInstr::DeleteName { dest, .. }
            | IrInstr::Binary { dest, .. }
            | IrInstr::Unary { dest, .. }
            | IrInstr::Coerce { dest, .. }
            | IrInstr::ElementKey { dest, .. }
            | IrInstr::GetProperty { dest, .. }
            | IrInstr::GetElement { dest, .. }
            | IrInstr::Delete { dest, .. }
            | IrInstr::Call { dest, .. }
            | IrInstr::New { dest, .. }
            | IrInstr::MakeClosure { dest, .. }
            | IrInstr::LoadThis { dest }
            | IrInstr::LoadCallee { dest }
            | IrInstr::CreateArguments { dest }
            | IrInstr::NewObject { dest }
            | IrInstr::NewArray { dest, .. }
            | IrInstr::NewRegExp { dest, .. }
            | IrInstr::ForInIterator { dest, .. }
            | IrInstr::ForInNext { dest, .. } => Some(*dest),
            _ => None,
        }
    }

    /// Dispatch site of a property or call instruction.
    pub fn site(&self) -> Option<SiteId> {
        match self {
            IrInstr::GetProperty { site, .. }
            | IrInstr::SetProperty { site, .. }
            | IrInstr::GetElement { site, .. }
            | IrInstr::SetElement { site, .. }
            | IrInstr::Call { site, .. }
            | IrInstr::New { site, .. } => Some(*site),
            _ => None,
        }
    }

    pub fn speculation(&self) -> Option<Speculation> {
        match self {
            IrInstr::Binary { speculation, .. } | IrInstr::Unary { speculation, .. } => *speculation,
            _ => None,
        }
    }
}

fn write_registers(f: &mut std::fmt::Formatter<'_>, regs: &[Register]) -> std::fmt::Result {
    for (i, reg) in regs.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", reg)?;
    }
    Ok(())
}

fn write_binding(f: &mut std::fmt::Formatter<'_>, binding: &Binding) -> std::fmt::Result {
    match binding {
        Binding::Local(slot) => write!(f, "local{}", slot),
        Binding::Captured(crate::analysis::Capture::Own(cell)) => write!(f, "cell{}", cell),
        Binding::Captured(crate::analysis::Capture::Upvalue(index)) => write!(f, "upvalue{}", index),
        Binding::Global => write!(f, "global"),
        Binding::Dynamic(inner) => write_binding(f, inner),
    }
}

impl std::fmt::Display for IrInstr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IrInstr::Const { dest, value } => write!(f, "{} = {}", dest, value),
            IrInstr::Move { dest, src } => write!(f, "{} = {}", dest, src),
            IrInstr::LoadLocal { dest, slot } => write!(f, "{} = load_local {}", dest, slot),
            IrInstr::StoreLocal { slot, value } => write!(f, "store_local {}, {}", slot, value),
            IrInstr::LoadCell { dest, cell } => write!(f, "{} = load_cell {}", dest, cell),
            IrInstr::StoreCell { cell, value } => write!(f, "store_cell {}, {}", cell, value),
            IrInstr::ResetCell { cell } => write!(f, "reset_cell {}", cell),
            IrInstr::LoadUpvalue { dest, index } => write!(f, "{} = load_upvalue {}", dest, index),
            IrInstr::StoreUpvalue { index, value } => write!(f, "store_upvalue {}, {}", index, value),
            IrInstr::LoadGlobal { dest, name, typeof_guard } => {
                let op = if *typeof_guard { "load_global?" } else { "load_global" };
                write!(f, "{} = {} {:?}", dest, op, name)
            }
            IrInstr::StoreGlobal { name, value, strict } => {
                let op = if *strict { "store_global!" } else { "store_global" };
                write!(f, "{} {:?}, {}", op, name, value)
            }
            IrInstr::DeclareGlobal { name } => write!(f, "declare_global {:?}", name),
            IrInstr::LoadName { dest, name, fallback, .. } => {
                write!(f, "{} = load_name {:?} else ", dest, name)?;
                write_binding(f, fallback)
            }
            IrInstr::StoreName { name, value, fallback, .. } => {
                write!(f, "store_name {:?}, {} else ", name, value)?;
                write_binding(f, fallback)
            }
            IrInstr::DeleteName { dest, name, .. } => write!(f, "{} = delete_name {:?}", dest, name),
            IrInstr::Binary {
                dest,
                op,
                left,
                right,
                speculation,
            } => {
                write!(f, "{} = {} {}, {}", dest, op.name(), left, right)?;
                if let Some(spec) = speculation {
                    write!(f, " [{} {}]", spec.id, spec.ty)?;
                }
                Ok(())
            }
            IrInstr::Unary {
                dest,
                op,
                operand,
                speculation,
            } => {
                write!(f, "{} = {} {}", dest, op.name(), operand)?;
                if let Some(spec) = speculation {
                    write!(f, " [{} {}]", spec.id, spec.ty)?;
                }
                Ok(())
            }
            IrInstr::Coerce { dest, value, kind } => write!(f, "{} = {} {}", dest, kind.name(), value),
            IrInstr::ElementKey { dest, object, key, .. } => write!(f, "{} = key {}[{}]", dest, object, key),
            IrInstr::GetProperty { dest, object, key, site } => {
                write!(f, "{} = get {}.{} @{}", dest, object, key, site)
            }
            IrInstr::SetProperty {
                object, key, value, site, ..
            } => write!(f, "set {}.{}, {} @{}", object, key, value, site),
            IrInstr::GetElement { dest, object, key, site } => {
                write!(f, "{} = get {}[{}] @{}", dest, object, key, site)
            }
            IrInstr::SetElement {
                object, key, value, site, ..
            } => write!(f, "set {}[{}], {} @{}", object, key, value, site),
            IrInstr::Delete { dest, object, key, .. } => write!(f, "{} = delete {}[{}]", dest, object, key),
            IrInstr::Call {
                dest,
                callee,
                this,
                args,
                site,
            } => {
                write!(f, "{} = call {}", dest, callee)?;
                if let Some(this) = this {
                    write!(f, " this={}", this)?;
                }
                write!(f, " (")?;
                write_registers(f, args)?;
                write!(f, ") @{}", site)
            }
            IrInstr::New { dest, callee, args, site } => {
                write!(f, "{} = new {} (", dest, callee)?;
                write_registers(f, args)?;
                write!(f, ") @{}", site)
            }
            IrInstr::MakeClosure { dest, function } => write!(f, "{} = closure {}", dest, function),
            IrInstr::LoadThis { dest } => write!(f, "{} = this", dest),
            IrInstr::LoadCallee { dest } => write!(f, "{} = callee", dest),
            IrInstr::CreateArguments { dest } => write!(f, "{} = arguments", dest),
            IrInstr::NewObject { dest } => write!(f, "{} = new_object", dest),
            IrInstr::NewArray { dest, elements } => {
                write!(f, "{} = new_array [", dest)?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match element {
                        Some(reg) => write!(f, "{}", reg)?,
                        None => write!(f, "_")?,
                    }
                }
                write!(f, "]")
            }
            IrInstr::NewRegExp { dest, pattern, flags } => write!(f, "{} = regexp /{}/{}", dest, pattern, flags),
            IrInstr::DefineField { object, key, value } => write!(f, "define {}.{}, {}", object, key, value),
            IrInstr::DefineAccessor {
                object,
                key,
                getter,
                setter,
            } => {
                write!(f, "define_accessor {}.{}", object, key)?;
                if let Some(getter) = getter {
                    write!(f, " get={}", getter)?;
                }
                if let Some(setter) = setter {
                    write!(f, " set={}", setter)?;
                }
                Ok(())
            }
            IrInstr::EnterWith { object } => write!(f, "enter_with {}", object),
            IrInstr::ExitWith => write!(f, "exit_with"),
            IrInstr::ForInIterator { dest, object } => write!(f, "{} = for_in {}", dest, object),
            IrInstr::ForInNext { dest, done, iterator } => {
                write!(f, "{}, {} = for_in_next {}", dest, done, iterator)
            }
            IrInstr::PushHandler { catch_block, exception } => {
                write!(f, "push_handler {} -> {}", catch_block, exception)
            }
            IrInstr::PopHandler => write!(f, "pop_handler"),
        }
    }
}
