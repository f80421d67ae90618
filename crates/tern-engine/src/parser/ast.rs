//! Abstract syntax tree for Tern programs.
//!
//! The tree is a closed set of tagged variants. Nodes own their children and
//! carry a [`Span`]. Nodes that later passes annotate (expressions, binding
//! identifiers, functions and scope-introducing statements) also carry a
//! [`NodeId`]; the resolver and type analyzer store their results in
//! side-tables keyed by that id instead of mutating the tree.

use crate::parser::interner::Symbol;
use crate::parser::token::Span;

pub mod expression;
pub mod statement;

pub use expression::*;
pub use statement::*;

/// Identity of an annotatable node, assigned by the parser in source order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Root node: a complete script.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub body: Vec<Statement>,
    /// The script opened with a `"use strict"` directive or was compiled in
    /// strict mode.
    pub strict: bool,
    pub id: NodeId,
    pub span: Span,
}

impl Program {
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }
}

/// A name in binding or reference position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub name: Symbol,
    pub id: NodeId,
    pub span: Span,
}

/// How a function node was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Declaration,
    Expression,
    Getter,
    Setter,
}

/// A function declaration, function expression or accessor body.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionNode {
    pub kind: FunctionKind,
    pub name: Option<Identifier>,
    pub params: Vec<Identifier>,
    pub body: Vec<Statement>,
    /// Strict either by inheritance or through its own directive prologue.
    pub strict: bool,
    pub id: NodeId,
    pub span: Span,
}
