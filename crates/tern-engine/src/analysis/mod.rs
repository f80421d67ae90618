//! Static analysis between parsing and lowering: name resolution and
//! optimistic typing. Results live in side-tables keyed by [`NodeId`];
//! the tree itself is never modified.
//!
//! [`NodeId`]: crate::parser::ast::NodeId

pub mod resolver;
pub mod scope;
pub mod types;

pub use resolver::{resolve, ResolveError};
pub use scope::{Binding, Capture, DeclKind, FunctionScope, Resolution, ScopeId, ScopeKind, ScopeTree, SymbolRef, UpvalueSource};
pub use types::{analyze, OptType, TypeMap};
