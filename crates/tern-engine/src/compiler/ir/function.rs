//! IR Functions

use std::rc::Rc;

use rustc_hash::FxHashMap;

use super::block::{BasicBlock, BasicBlockId};
use super::instr::FunctionId;
use crate::analysis::UpvalueSource;
use crate::parser::token::Span;

/// An IR function: the script body or one function literal.
#[derive(Debug, Clone, PartialEq)]
pub struct IrFunction {
    pub id: FunctionId,
    pub name: Option<Rc<str>>,
    pub param_count: u32,
    /// Local slots, parameters first
    pub local_count: u32,
    pub cell_count: u32,
    pub register_count: u32,
    pub upvalues: Vec<UpvalueSource>,
    pub strict: bool,
    /// Script body rather than a function literal
    pub is_script: bool,
    /// Accessor bodies cannot be used with `new`
    pub constructible: bool,
    pub blocks: Vec<BasicBlock>,
    pub entry_block: BasicBlockId,
    block_map: FxHashMap<BasicBlockId, usize>,
    pub source_span: Span,
}

impl IrFunction {
    pub fn new(id: FunctionId, name: Option<Rc<str>>) -> Self {
        Self {
            id,
            name,
            param_count: 0,
            local_count: 0,
            cell_count: 0,
            register_count: 0,
            upvalues: Vec::new(),
            strict: false,
            is_script: false,
            constructible: true,
            blocks: Vec::new(),
            entry_block: BasicBlockId(0),
            block_map: FxHashMap::default(),
            source_span: Span::default(),
        }
    }

    /// Add a basic block and return its ID
    pub fn add_block(&mut self, block: BasicBlock) -> BasicBlockId {
        let id = block.id;
        let index = self.blocks.len();
        self.block_map.insert(id, index);
        self.blocks.push(block);
        id
    }

    /// Create and add a new empty block
    pub fn create_block(&mut self, id: BasicBlockId) -> BasicBlockId {
        self.add_block(BasicBlock::new(id))
    }

    pub fn get_block(&self, id: BasicBlockId) -> Option<&BasicBlock> {
        self.block_map.get(&id).map(|&idx| &self.blocks[idx])
    }

    pub fn get_block_mut(&mut self, id: BasicBlockId) -> Option<&mut BasicBlock> {
        self.block_map.get(&id).copied().map(|idx| &mut self.blocks[idx])
    }

    pub fn entry(&self) -> Option<&BasicBlock> {
        self.get_block(self.entry_block)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn instruction_count(&self) -> usize {
        self.blocks.iter().map(|b| b.instructions.len()).sum()
    }

    /// Display name used in stack traces.
    pub fn display_name(&self) -> &str {
        match &self.name {
            Some(name) => name,
            None if self.is_script => "<script>",
            None => "<anonymous>",
        }
    }

    /// Blocks reachable from the entry, following terminators and
    /// exception handler targets.
    fn reachable(&self) -> Vec<bool> {
        let mut seen = vec![false; self.blocks.len()];
        let mut work = vec![self.entry_block];
        while let Some(id) = work.pop() {
            let Some(&index) = self.block_map.get(&id) else {
                continue;
            };
            if seen[index] {
                continue;
            }
            seen[index] = true;
            let block = &self.blocks[index];
            work.extend(block.successors());
            work.extend(block.handler_targets());
        }
        seen
    }

    /// Drop unreachable blocks and renumber the rest so that a block's id
    /// equals its index, entry first.
    pub fn compact(&mut self) {
        let seen = self.reachable();
        let mut blocks: Vec<BasicBlock> = std::mem::take(&mut self.blocks)
            .into_iter()
            .zip(seen)
            .filter_map(|(block, keep)| keep.then_some(block))
            .collect();
        if let Some(pos) = blocks.iter().position(|b| b.id == self.entry_block) {
            let entry = blocks.remove(pos);
            blocks.insert(0, entry);
        }

        let renumber: FxHashMap<BasicBlockId, BasicBlockId> = blocks
            .iter()
            .enumerate()
            .map(|(i, b)| (b.id, BasicBlockId(i as u32)))
            .collect();
        let map = |id: BasicBlockId| renumber.get(&id).copied().unwrap_or(id);

        self.block_map.clear();
        for (i, block) in blocks.iter_mut().enumerate() {
            block.id = BasicBlockId(i as u32);
            block.retarget(map);
            self.block_map.insert(block.id, i);
        }
        self.entry_block = BasicBlockId(0);
        self.blocks = blocks;
    }

    /// Validate the function structure
    pub fn validate(&self) -> Result<(), String> {
        if self.blocks.is_empty() {
            return Err(format!("Function {} has no blocks", self.id));
        }
        if self.get_block(self.entry_block).is_none() {
            return Err(format!("Entry block {} does not exist", self.entry_block));
        }
        for block in &self.blocks {
            if !block.is_terminated() {
                return Err(format!("Block {} is not terminated", block.id));
            }
            for succ in block.successors() {
                if self.get_block(succ).is_none() {
                    return Err(format!("Block {} has invalid successor {}", block.id, succ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::OptType;
    use crate::compiler::ir::{IrConstant, IrInstr, Register, RegisterId, Terminator};

    fn reg(n: u32) -> Register {
        Register::new(RegisterId(n), OptType::Generic)
    }

    #[test]
    fn test_compact_drops_dead_blocks() {
        let mut func = IrFunction::new(FunctionId(0), None);
        for i in 0..4 {
            func.create_block(BasicBlockId(i));
        }
        func.get_block_mut(BasicBlockId(0))
            .unwrap()
            .set_terminator(Terminator::Jump(BasicBlockId(2)));
        func.get_block_mut(BasicBlockId(1))
            .unwrap()
            .set_terminator(Terminator::Return(reg(0)));
        let last = func.get_block_mut(BasicBlockId(2)).unwrap();
        last.add_instr(
            IrInstr::Const {
                dest: reg(0),
                value: IrConstant::Int(1),
            },
            1,
        );
        last.set_terminator(Terminator::Return(reg(0)));

        func.compact();
        assert_eq!(func.block_count(), 2);
        assert_eq!(func.blocks[0].terminator, Terminator::Jump(BasicBlockId(1)));
        assert!(func.validate().is_ok());
    }

    #[test]
    fn test_compact_keeps_handler_targets() {
        let mut func = IrFunction::new(FunctionId(0), None);
        func.create_block(BasicBlockId(0));
        func.create_block(BasicBlockId(1));
        let entry = func.get_block_mut(BasicBlockId(0)).unwrap();
        entry.add_instr(
            IrInstr::PushHandler {
                catch_block: BasicBlockId(1),
                exception: reg(0),
            },
            1,
        );
        entry.set_terminator(Terminator::Throw(reg(0)));
        func.get_block_mut(BasicBlockId(1))
            .unwrap()
            .set_terminator(Terminator::Return(reg(0)));

        func.compact();
        assert_eq!(func.block_count(), 2);
    }

    #[test]
    fn test_validate_reports_unterminated_block() {
        let mut func = IrFunction::new(FunctionId(3), Some("f".into()));
        func.create_block(BasicBlockId(0));
        assert!(func.validate().is_err());
        assert_eq!(func.display_name(), "f");
    }
}
