//! Lexical scope tree and binding classification.

use rustc_hash::FxHashMap;

use crate::parser::ast::NodeId;
use crate::parser::interner::Symbol;

/// Index of a scope in the [`ScopeTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

/// A declared symbol: a scope plus its position in that scope's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolRef {
    pub scope: ScopeId,
    pub index: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Top level of a script
    Script,
    Function,
    Block,
    Catch,
    /// Body of a `with` statement; holds no symbols
    With,
}

/// How a name was introduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Var,
    Let,
    Const,
    Param,
    Function,
    CatchParam,
    /// Name of a function expression, visible inside its own body
    SelfName,
    /// Implicit `arguments` object
    Arguments,
}

impl DeclKind {
    pub fn is_lexical(self) -> bool {
        matches!(self, DeclKind::Let | DeclKind::Const)
    }
}

/// A symbol in a scope's table.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolInfo {
    pub name: Symbol,
    pub kind: DeclKind,
    pub scope: ScopeId,
    /// Referenced from a nested function
    pub captured: bool,
    /// Source offset after which a lexical binding is initialized
    pub ready_at: usize,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    /// Nearest enclosing function or script scope (itself for those kinds)
    pub function_scope: ScopeId,
    /// Symbols in declaration order
    pub symbols: Vec<SymbolInfo>,
    names: FxHashMap<Symbol, u32>,
}

impl Scope {
    pub fn lookup(&self, name: Symbol) -> Option<u32> {
        self.names.get(&name).copied()
    }

    pub fn is_function_boundary(&self) -> bool {
        matches!(self.kind, ScopeKind::Script | ScopeKind::Function)
    }
}

/// Arena of scopes, owned top-down from the script scope.
#[derive(Debug, Clone, Default)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: ScopeKind, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        let function_scope = match (kind, parent) {
            (ScopeKind::Script | ScopeKind::Function, _) | (_, None) => id,
            (_, Some(parent)) => self.scopes[parent.0 as usize].function_scope,
        };
        self.scopes.push(Scope {
            id,
            kind,
            parent,
            function_scope,
            symbols: Vec::new(),
            names: FxHashMap::default(),
        });
        id
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0 as usize]
    }

    pub fn symbol(&self, sym: SymbolRef) -> &SymbolInfo {
        &self.get(sym.scope).symbols[sym.index as usize]
    }

    pub fn mark_captured(&mut self, sym: SymbolRef) {
        self.get_mut(sym.scope).symbols[sym.index as usize].captured = true;
    }

    /// Declare `name` in `scope`. Returns the existing symbol when the name
    /// is already present.
    pub fn declare(&mut self, scope: ScopeId, name: Symbol, kind: DeclKind, ready_at: usize) -> (SymbolRef, bool) {
        let target = self.get_mut(scope);
        if let Some(index) = target.names.get(&name) {
            return (SymbolRef { scope, index: *index }, false);
        }
        let index = target.symbols.len() as u32;
        target.symbols.push(SymbolInfo {
            name,
            kind,
            scope,
            captured: false,
            ready_at,
        });
        target.names.insert(name, index);
        (SymbolRef { scope, index }, true)
    }

    /// Innermost declaration of `name` visible from `scope`.
    pub fn resolve(&self, mut scope: ScopeId, name: Symbol) -> Option<SymbolRef> {
        loop {
            let current = self.get(scope);
            if let Some(index) = current.lookup(name) {
                return Some(SymbolRef { scope, index });
            }
            scope = current.parent?;
        }
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scope> {
        self.scopes.iter()
    }
}

/// Where a captured variable lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capture {
    /// A cell owned by the current frame
    Own(u32),
    /// A cell inherited through the closure
    Upvalue(u32),
}

/// Storage class of an identifier reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Binding {
    Local(u32),
    Captured(Capture),
    /// Property of the global object
    Global,
    /// Looked up through the active `with` objects first
    Dynamic(Box<Binding>),
}

impl Binding {
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Binding::Dynamic(_))
    }

    /// Binding used once no `with` object supplies the name.
    pub fn fallback(&self) -> &Binding {
        match self {
            Binding::Dynamic(inner) => inner.fallback(),
            other => other,
        }
    }
}

/// How a closure obtains one upvalue from the frame that creates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpvalueSource {
    ParentCell(u32),
    ParentUpvalue(u32),
}

/// Frame layout and flags of one function (or the script).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FunctionScope {
    pub scope: Option<ScopeId>,
    pub param_count: u32,
    /// Local slots, parameters first
    pub local_count: u32,
    pub cell_count: u32,
    /// Cell for each parameter that a closure captures
    pub param_cells: Vec<Option<u32>>,
    pub upvalues: Vec<UpvalueSource>,
    /// Where the materialized `arguments` object is stored
    pub arguments: Option<Binding>,
    /// Where a named function expression stores itself
    pub self_name: Option<Binding>,
    /// Contains `with` or a call to `eval`
    pub dynamic: bool,
    pub strict: bool,
    /// Script only: `var` and function names declared on the global object
    pub global_declarations: Vec<Symbol>,
}

/// Output of name resolution.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub scopes: ScopeTree,
    /// Binding of every identifier node, references and declarations alike
    pub bindings: FxHashMap<NodeId, Binding>,
    /// Declared symbol behind an identifier node, when there is one
    pub symbols: FxHashMap<NodeId, SymbolRef>,
    /// Keyed by function node id, or the program id for the script
    pub functions: FxHashMap<NodeId, FunctionScope>,
    /// Cells a block re-creates on entry, keyed by the block's node id
    pub block_cells: FxHashMap<NodeId, Vec<u32>>,
}

impl Resolution {
    pub fn binding(&self, id: NodeId) -> Option<&Binding> {
        self.bindings.get(&id)
    }

    pub fn function(&self, id: NodeId) -> Option<&FunctionScope> {
        self.functions.get(&id)
    }

    pub fn block_cells(&self, id: NodeId) -> &[u32] {
        self.block_cells.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::interner::Interner;

    #[test]
    fn test_resolve_walks_parents() {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let y = interner.intern("y");
        let mut tree = ScopeTree::new();
        let script = tree.push(ScopeKind::Script, None);
        let func = tree.push(ScopeKind::Function, Some(script));
        let block = tree.push(ScopeKind::Block, Some(func));

        let (outer_x, _) = tree.declare(script, x, DeclKind::Var, 0);
        let (inner_y, _) = tree.declare(block, y, DeclKind::Let, 10);

        assert_eq!(tree.resolve(block, x), Some(outer_x));
        assert_eq!(tree.resolve(block, y), Some(inner_y));
        assert_eq!(tree.resolve(func, y), None);
        assert_eq!(tree.get(block).function_scope, func);
    }

    #[test]
    fn test_redeclare_returns_existing() {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let mut tree = ScopeTree::new();
        let script = tree.push(ScopeKind::Script, None);
        let (first, fresh) = tree.declare(script, x, DeclKind::Var, 0);
        let (second, again) = tree.declare(script, x, DeclKind::Var, 5);
        assert!(fresh);
        assert!(!again);
        assert_eq!(first, second);
        assert_eq!(tree.get(script).symbols.len(), 1);
    }

    #[test]
    fn test_dynamic_fallback() {
        let binding = Binding::Dynamic(Box::new(Binding::Local(3)));
        assert!(binding.is_dynamic());
        assert_eq!(binding.fallback(), &Binding::Local(3));
    }
}
