//! Blocks of straight-line IR closed by a terminator.
//!
//! Every instruction carries the source line it was lowered from so the
//! executor can attribute stack frames without a separate line table.

use std::fmt;

use super::instr::IrInstr;
use super::value::Register;

/// Index of a block inside its [`IrFunction`](super::IrFunction).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BasicBlockId(pub u32);

impl fmt::Display for BasicBlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    pub id: BasicBlockId,
    /// Lowering hint shown by the IR printer (`loop.head`, `catch`, ...).
    pub label: Option<String>,
    pub instructions: Vec<IrInstr>,
    /// Parallel to `instructions`.
    pub lines: Vec<u32>,
    pub terminator: Terminator,
}

impl BasicBlock {
    pub fn new(id: BasicBlockId) -> Self {
        BasicBlock {
            id,
            label: None,
            instructions: Vec::new(),
            lines: Vec::new(),
            terminator: Terminator::Unreachable,
        }
    }

    pub fn with_label(id: BasicBlockId, label: impl Into<String>) -> Self {
        let mut block = BasicBlock::new(id);
        block.label = Some(label.into());
        block
    }

    pub fn add_instr(&mut self, instr: IrInstr, line: u32) {
        debug_assert_eq!(self.instructions.len(), self.lines.len());
        self.instructions.push(instr);
        self.lines.push(line);
    }

    pub fn set_terminator(&mut self, term: Terminator) {
        self.terminator = term;
    }

    /// A block still ending in `Unreachable` has not been closed by lowering.
    pub fn is_terminated(&self) -> bool {
        self.terminator != Terminator::Unreachable
    }

    /// Normal control-flow successors, taken from the terminator.
    pub fn successors(&self) -> impl Iterator<Item = BasicBlockId> + '_ {
        self.terminator.targets()
    }

    /// Catch blocks installed by `PushHandler` inside this block. These are
    /// reachable only by unwinding.
    pub fn handler_targets(&self) -> impl Iterator<Item = BasicBlockId> + '_ {
        self.instructions.iter().filter_map(|instr| match instr {
            IrInstr::PushHandler { catch_block, .. } => Some(*catch_block),
            _ => None,
        })
    }

    /// Rewrite every block reference, in the terminator and in handler
    /// installs, through `map`.
    pub fn retarget(&mut self, map: impl Fn(BasicBlockId) -> BasicBlockId) {
        self.terminator.remap(&map);
        for instr in &mut self.instructions {
            if let IrInstr::PushHandler { catch_block, .. } = instr {
                *catch_block = map(*catch_block);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    Jump(BasicBlockId),
    /// Backward edge of a loop. The executor polls for interruption here.
    LoopBack(BasicBlockId),
    /// Branch on the ToBoolean of `cond`.
    Branch {
        cond: Register,
        then_block: BasicBlockId,
        else_block: BasicBlockId,
    },
    Return(Register),
    Throw(Register),
    Unreachable,
}

impl Terminator {
    pub fn targets(&self) -> impl Iterator<Item = BasicBlockId> {
        let (first, second) = match *self {
            Terminator::Jump(to) | Terminator::LoopBack(to) => (Some(to), None),
            Terminator::Branch {
                then_block,
                else_block,
                ..
            } => (Some(then_block), Some(else_block)),
            Terminator::Return(_) | Terminator::Throw(_) | Terminator::Unreachable => (None, None),
        };
        first.into_iter().chain(second)
    }

    pub fn remap(&mut self, map: impl Fn(BasicBlockId) -> BasicBlockId) {
        match self {
            Terminator::Jump(to) | Terminator::LoopBack(to) => *to = map(*to),
            Terminator::Branch {
                then_block,
                else_block,
                ..
            } => {
                *then_block = map(*then_block);
                *else_block = map(*else_block);
            }
            Terminator::Return(_) | Terminator::Throw(_) | Terminator::Unreachable => {}
        }
    }
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminator::Jump(to) => write!(f, "jump {}", to),
            Terminator::LoopBack(to) => write!(f, "loop {}", to),
            Terminator::Branch {
                cond,
                then_block,
                else_block,
            } => write!(f, "branch {} ? {} : {}", cond, then_block, else_block),
            Terminator::Return(value) => write!(f, "return {}", value),
            Terminator::Throw(value) => write!(f, "throw {}", value),
            Terminator::Unreachable => f.write_str("unreachable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::OptType;
    use crate::compiler::ir::RegisterId;

    fn cond() -> Register {
        Register::new(RegisterId(0), OptType::Boolean)
    }

    #[test]
    fn test_terminator_targets() {
        let branch = Terminator::Branch {
            cond: cond(),
            then_block: BasicBlockId(1),
            else_block: BasicBlockId(2),
        };
        assert_eq!(branch.targets().collect::<Vec<_>>(), vec![BasicBlockId(1), BasicBlockId(2)]);
        assert_eq!(Terminator::LoopBack(BasicBlockId(0)).targets().count(), 1);
        assert_eq!(Terminator::Throw(cond()).targets().count(), 0);
    }

    #[test]
    fn test_remap() {
        let mut term = Terminator::Jump(BasicBlockId(7));
        term.remap(|id| BasicBlockId(id.0 - 5));
        assert_eq!(term, Terminator::Jump(BasicBlockId(2)));
    }

    #[test]
    fn test_unterminated_block() {
        let mut block = BasicBlock::with_label(BasicBlockId(3), "exit");
        assert!(!block.is_terminated());
        block.set_terminator(Terminator::Return(cond()));
        assert!(block.is_terminated());
        assert_eq!(block.label.as_deref(), Some("exit"));
    }
}
