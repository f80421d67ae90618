//! Intermediate Representation
//!
//! Three-address code over virtual registers, grouped into basic blocks
//! with explicit terminators.
//!
//! # Structure
//!
//! - `IrModule` - all functions of a compiled script, plus its site table
//! - `IrFunction` - frame layout and basic blocks of one function
//! - `BasicBlock` - instructions with a single entry and exit
//! - `IrInstr` - three-address instructions
//! - `Register` - virtual registers tagged with an optimistic type

pub mod block;
pub mod function;
pub mod instr;
pub mod module;
pub mod pretty;
pub mod value;

pub use block::{BasicBlock, BasicBlockId, Terminator};
pub use function::IrFunction;
pub use instr::{BinaryOp, Coercion, FunctionId, IrInstr, SiteId, SpecId, Speculation, UnaryOp};
pub use module::{IrModule, SiteInfo, SiteKind};
pub use pretty::PrettyPrint;
pub use value::{IrConstant, Register, RegisterId};
