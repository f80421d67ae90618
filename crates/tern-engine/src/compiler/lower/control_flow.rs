//! Control Flow Lowering Utilities
//!
//! The control stack records every construct a `break`, `continue` or
//! `return` may have to unwind: loops, breakable statements, exception
//! handlers, `finally` bodies and `with` scopes.

use crate::compiler::ir::BasicBlockId;
use crate::parser::ast::BlockStatement;
use crate::parser::interner::Symbol;

/// One entry of the control stack.
#[derive(Debug, Clone)]
pub enum ControlEntry<'a> {
    Loop {
        labels: Vec<Symbol>,
        break_block: BasicBlockId,
        continue_block: BasicBlockId,
    },
    /// `switch`, or a labeled statement that is not a loop
    Breakable {
        labels: Vec<Symbol>,
        break_block: BasicBlockId,
        /// An unlabeled `break` may target it (`switch` only)
        unlabeled: bool,
    },
    /// Catch handler pushed for a `try` block
    Handler,
    /// A `finally` body to run on exit; its handler is pushed while the
    /// protected region is active
    Finally { body: &'a BlockStatement },
    With,
}

/// Where a jump lands and how many entries it unwinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpTarget {
    pub block: BasicBlockId,
    /// Index of the target entry; entries above it are unwound
    pub depth: usize,
}

/// Stack of active control entries, innermost last
#[derive(Debug, Default)]
pub struct ControlStack<'a> {
    stack: Vec<ControlEntry<'a>>,
}

impl<'a> ControlStack<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ControlEntry<'a>) {
        self.stack.push(entry);
    }

    pub fn pop(&mut self) -> Option<ControlEntry<'a>> {
        self.stack.pop()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ControlEntry<'a>> {
        self.stack.get(index)
    }

    /// Remove and return every entry from `depth` upward.
    pub fn split_off(&mut self, depth: usize) -> Vec<ControlEntry<'a>> {
        self.stack.split_off(depth)
    }

    pub fn restore(&mut self, entries: Vec<ControlEntry<'a>>) {
        self.stack.extend(entries);
    }

    pub fn break_target(&self, label: Option<Symbol>) -> Option<JumpTarget> {
        self.stack.iter().enumerate().rev().find_map(|(depth, entry)| match (entry, label) {
            (ControlEntry::Loop { break_block, .. }, None) => Some(JumpTarget {
                block: *break_block,
                depth,
            }),
            (
                ControlEntry::Breakable {
                    break_block,
                    unlabeled: true,
                    ..
                },
                None,
            ) => Some(JumpTarget {
                block: *break_block,
                depth,
            }),
            (
                ControlEntry::Loop {
                    labels, break_block, ..
                }
                | ControlEntry::Breakable {
                    labels, break_block, ..
                },
                Some(label),
            ) if labels.contains(&label) => Some(JumpTarget {
                block: *break_block,
                depth,
            }),
            _ => None,
        })
    }

    pub fn continue_target(&self, label: Option<Symbol>) -> Option<JumpTarget> {
        self.stack.iter().enumerate().rev().find_map(|(depth, entry)| match entry {
            ControlEntry::Loop {
                labels,
                continue_block,
                ..
            } if label.map_or(true, |l| labels.contains(&l)) => Some(JumpTarget {
                block: *continue_block,
                depth,
            }),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::interner::Interner;

    #[test]
    fn test_unlabeled_break_skips_labeled_blocks() {
        let mut interner = Interner::new();
        let outer = interner.intern("outer");
        let mut stack = ControlStack::new();
        stack.push(ControlEntry::Loop {
            labels: vec![],
            break_block: BasicBlockId(1),
            continue_block: BasicBlockId(2),
        });
        stack.push(ControlEntry::Breakable {
            labels: vec![outer],
            break_block: BasicBlockId(3),
            unlabeled: false,
        });
        stack.push(ControlEntry::Handler);

        assert_eq!(
            stack.break_target(None),
            Some(JumpTarget {
                block: BasicBlockId(1),
                depth: 0
            })
        );
        assert_eq!(stack.break_target(Some(outer)).map(|t| t.block), Some(BasicBlockId(3)));
        assert_eq!(stack.continue_target(None).map(|t| t.block), Some(BasicBlockId(2)));
        assert_eq!(stack.continue_target(Some(outer)), None);
    }

    #[test]
    fn test_split_and_restore() {
        let mut stack = ControlStack::new();
        stack.push(ControlEntry::With);
        stack.push(ControlEntry::Handler);
        let above = stack.split_off(1);
        assert_eq!(stack.len(), 1);
        stack.restore(above);
        assert_eq!(stack.len(), 2);
    }
}
