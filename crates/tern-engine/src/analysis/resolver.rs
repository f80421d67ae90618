//! Name resolution.
//!
//! Builds the scope tree, classifies every identifier as a local slot, a
//! closure cell, a global property or a dynamic (`with`) lookup, and lays
//! out each function's frame. Statically detectable misuse of `let` and
//! `const` is rejected here.

use rustc_hash::FxHashMap;
use thiserror::Error;

use super::scope::*;
use crate::parser::ast::*;
use crate::parser::interner::{Interner, Symbol};
use crate::parser::token::Span;

/// Static binding errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error("Cannot access '{name}' before initialization")]
    TemporalDeadZone { name: String, span: Span },

    #[error("Assignment to constant variable '{name}'")]
    ConstAssignment { name: String, span: Span },

    #[error("Identifier '{name}' has already been declared")]
    Redeclaration { name: String, span: Span },
}

impl ResolveError {
    pub fn span(&self) -> Span {
        match self {
            ResolveError::TemporalDeadZone { span, .. }
            | ResolveError::ConstAssignment { span, .. }
            | ResolveError::Redeclaration { span, .. } => *span,
        }
    }
}

/// Resolve all names in `program`.
pub fn resolve(program: &Program, interner: &Interner) -> Result<Resolution, ResolveError> {
    Resolver::new(interner).run(program)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Read,
    Write,
    ReadWrite,
}

/// Storage chosen for a symbol when frames are laid out.
#[derive(Debug, Clone, Copy)]
enum Storage {
    Local(u32),
    Cell(u32),
    Global,
}

struct FnState {
    scope: ScopeId,
    node: NodeId,
    parent: Option<usize>,
    is_script: bool,
    strict: bool,
    dynamic: bool,
    /// Positional parameters; duplicates map to the same symbol
    params: Vec<SymbolRef>,
    upvalues: Vec<SymbolRef>,
    upvalue_index: FxHashMap<SymbolRef, u32>,
    arguments: Option<SymbolRef>,
    self_name: Option<SymbolRef>,
}

struct PendingRef {
    node: NodeId,
    target: Option<SymbolRef>,
    func: usize,
    dynamic: bool,
}

struct Resolver<'a> {
    interner: &'a Interner,
    tree: ScopeTree,
    current: ScopeId,
    functions: Vec<FnState>,
    fn_stack: Vec<usize>,
    fn_of_scope: FxHashMap<ScopeId, usize>,
    refs: Vec<PendingRef>,
    block_nodes: FxHashMap<ScopeId, NodeId>,
    arguments_name: Option<Symbol>,
    eval_name: Option<Symbol>,
}

impl<'a> Resolver<'a> {
    fn new(interner: &'a Interner) -> Self {
        Self {
            interner,
            tree: ScopeTree::new(),
            current: ScopeId(0),
            functions: Vec::new(),
            fn_stack: Vec::new(),
            fn_of_scope: FxHashMap::default(),
            refs: Vec::new(),
            block_nodes: FxHashMap::default(),
            arguments_name: interner.lookup("arguments"),
            eval_name: interner.lookup("eval"),
        }
    }

    fn run(mut self, program: &Program) -> Result<Resolution, ResolveError> {
        let scope = self.tree.push(ScopeKind::Script, None);
        self.current = scope;
        self.enter_function(scope, program.id, None, true, program.strict);

        for statement in &program.body {
            self.hoist_vars(statement, scope)?;
        }
        self.declare_block_level(&program.body, scope)?;
        self.visit_statements(&program.body)?;

        self.fn_stack.pop();
        Ok(self.finish())
    }

    fn enter_function(&mut self, scope: ScopeId, node: NodeId, parent: Option<usize>, is_script: bool, strict: bool) -> usize {
        let index = self.functions.len();
        self.functions.push(FnState {
            scope,
            node,
            parent,
            is_script,
            strict,
            dynamic: false,
            params: Vec::new(),
            upvalues: Vec::new(),
            upvalue_index: FxHashMap::default(),
            arguments: None,
            self_name: None,
        });
        self.fn_stack.push(index);
        self.fn_of_scope.insert(scope, index);
        index
    }

    fn current_fn(&self) -> usize {
        self.fn_stack.last().copied().unwrap_or(0)
    }

    fn owner_of(&self, sym: SymbolRef) -> usize {
        let function_scope = self.tree.get(sym.scope).function_scope;
        self.fn_of_scope.get(&function_scope).copied().unwrap_or(0)
    }

    fn name_of(&self, name: Symbol) -> String {
        self.interner.resolve(name).to_string()
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    fn declare(&mut self, scope: ScopeId, ident: &Identifier, kind: DeclKind, ready_at: usize) -> Result<SymbolRef, ResolveError> {
        let (sym, fresh) = self.tree.declare(scope, ident.name, kind, ready_at);
        if !fresh {
            let existing = self.tree.symbol(sym).kind;
            if kind.is_lexical() || existing.is_lexical() {
                return Err(ResolveError::Redeclaration {
                    name: self.name_of(ident.name),
                    span: ident.span,
                });
            }
        }
        Ok(sym)
    }

    /// Declare every `var` reachable from `statement` without entering
    /// nested functions.
    fn hoist_vars(&mut self, statement: &Statement, scope: ScopeId) -> Result<(), ResolveError> {
        match statement {
            Statement::Variable(decl) => self.hoist_var_declaration(decl, scope)?,
            Statement::If(s) => {
                self.hoist_vars(&s.consequent, scope)?;
                if let Some(alternate) = &s.alternate {
                    self.hoist_vars(alternate, scope)?;
                }
            }
            Statement::For(s) => {
                if let Some(ForInit::Variable(decl)) = &s.init {
                    self.hoist_var_declaration(decl, scope)?;
                }
                self.hoist_vars(&s.body, scope)?;
            }
            Statement::ForIn(s) => {
                if let ForInTarget::Variable(decl) = &s.left {
                    self.hoist_var_declaration(decl, scope)?;
                }
                self.hoist_vars(&s.body, scope)?;
            }
            Statement::While(s) => self.hoist_vars(&s.body, scope)?,
            Statement::DoWhile(s) => self.hoist_vars(&s.body, scope)?,
            Statement::Labeled(s) => self.hoist_vars(&s.body, scope)?,
            Statement::With(s) => self.hoist_vars(&s.body, scope)?,
            Statement::Block(b) => {
                for inner in &b.body {
                    self.hoist_vars(inner, scope)?;
                }
            }
            Statement::Try(s) => {
                for inner in &s.block.body {
                    self.hoist_vars(inner, scope)?;
                }
                if let Some(handler) = &s.handler {
                    for inner in &handler.body.body {
                        self.hoist_vars(inner, scope)?;
                    }
                }
                if let Some(finalizer) = &s.finalizer {
                    for inner in &finalizer.body {
                        self.hoist_vars(inner, scope)?;
                    }
                }
            }
            Statement::Switch(s) => {
                for case in &s.cases {
                    for inner in &case.consequent {
                        self.hoist_vars(inner, scope)?;
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn hoist_var_declaration(&mut self, decl: &VariableDeclaration, scope: ScopeId) -> Result<(), ResolveError> {
        if decl.kind == VariableKind::Var {
            for d in &decl.declarations {
                self.declare(scope, &d.name, DeclKind::Var, 0)?;
            }
        }
        Ok(())
    }

    /// Declare the `let`/`const` bindings and function declarations that
    /// appear directly in a statement list.
    fn declare_block_level(&mut self, statements: &[Statement], scope: ScopeId) -> Result<(), ResolveError> {
        for statement in statements {
            match statement {
                Statement::Variable(decl) if decl.kind != VariableKind::Var => {
                    let kind = if decl.kind == VariableKind::Let {
                        DeclKind::Let
                    } else {
                        DeclKind::Const
                    };
                    for d in &decl.declarations {
                        self.declare(scope, &d.name, kind, d.span.end)?;
                    }
                }
                Statement::Function(f) => {
                    if let Some(name) = &f.name {
                        self.declare(scope, name, DeclKind::Function, 0)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    // ========================================================================
    // References
    // ========================================================================

    /// Innermost symbol for `name`, and whether the search crossed a
    /// `with` body.
    fn lookup(&self, name: Symbol) -> (Option<SymbolRef>, bool) {
        let mut scope = Some(self.current);
        let mut through_with = false;
        while let Some(id) = scope {
            let current = self.tree.get(id);
            if current.kind == ScopeKind::With {
                through_with = true;
            } else if let Some(index) = current.lookup(name) {
                return (Some(SymbolRef { scope: id, index }), through_with);
            }
            scope = current.parent;
        }
        (None, through_with)
    }

    /// Declare the implicit `arguments` object on first use.
    fn ensure_arguments(&mut self, name: Symbol) {
        let func = self.current_fn();
        if self.functions[func].is_script || self.functions[func].arguments.is_some() {
            return;
        }
        let function_scope = self.functions[func].scope;
        let mut scope = Some(self.current);
        while let Some(id) = scope {
            if self.tree.get(id).lookup(name).is_some() {
                return;
            }
            if id == function_scope {
                break;
            }
            scope = self.tree.get(id).parent;
        }
        let (sym, _) = self.tree.declare(function_scope, name, DeclKind::Arguments, 0);
        self.functions[func].arguments = Some(sym);
    }

    fn reference(&mut self, ident: &Identifier, access: Access) -> Result<(), ResolveError> {
        if Some(ident.name) == self.arguments_name {
            self.ensure_arguments(ident.name);
        }
        let func = self.current_fn();
        let (target, dynamic) = self.lookup(ident.name);

        if let Some(sym) = target {
            let info = self.tree.symbol(sym);
            let owner = self.owner_of(sym);
            if info.kind.is_lexical() && owner == func && ident.span.start < info.ready_at {
                return Err(ResolveError::TemporalDeadZone {
                    name: self.name_of(ident.name),
                    span: ident.span,
                });
            }
            if info.kind == DeclKind::Const && access != Access::Read {
                return Err(ResolveError::ConstAssignment {
                    name: self.name_of(ident.name),
                    span: ident.span,
                });
            }
            if owner != func && !self.is_global_symbol(sym) {
                self.capture(sym, func, owner);
            }
        }
        if dynamic {
            self.functions[func].dynamic = true;
        }
        self.refs.push(PendingRef {
            node: ident.id,
            target,
            func,
            dynamic,
        });
        Ok(())
    }

    /// Record the binding of a declaring identifier.
    fn declaration(&mut self, ident: &Identifier, may_be_dynamic: bool) {
        let func = self.current_fn();
        let (target, dynamic) = self.lookup(ident.name);
        self.refs.push(PendingRef {
            node: ident.id,
            target,
            func,
            dynamic: dynamic && may_be_dynamic,
        });
    }

    fn is_global_symbol(&self, sym: SymbolRef) -> bool {
        let scope = self.tree.get(sym.scope);
        scope.kind == ScopeKind::Script
            && matches!(self.tree.symbol(sym).kind, DeclKind::Var | DeclKind::Function)
    }

    /// Thread `sym` through every function between `func` and its owner.
    fn capture(&mut self, sym: SymbolRef, func: usize, owner: usize) {
        self.tree.mark_captured(sym);
        let mut current = Some(func);
        while let Some(index) = current {
            if index == owner {
                break;
            }
            let state = &mut self.functions[index];
            if !state.upvalue_index.contains_key(&sym) {
                let slot = state.upvalues.len() as u32;
                state.upvalues.push(sym);
                state.upvalue_index.insert(sym, slot);
            }
            current = state.parent;
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn visit_statements(&mut self, statements: &[Statement]) -> Result<(), ResolveError> {
        for statement in statements {
            self.visit_statement(statement)?;
        }
        Ok(())
    }

    fn with_scope<T>(
        &mut self,
        kind: ScopeKind,
        node: Option<NodeId>,
        body: impl FnOnce(&mut Self, ScopeId) -> Result<T, ResolveError>,
    ) -> Result<T, ResolveError> {
        let saved = self.current;
        let scope = self.tree.push(kind, Some(saved));
        if let Some(node) = node {
            self.block_nodes.insert(scope, node);
        }
        self.current = scope;
        let result = body(self, scope);
        self.current = saved;
        result
    }

    fn visit_block(&mut self, block: &BlockStatement) -> Result<(), ResolveError> {
        self.with_scope(ScopeKind::Block, Some(block.id), |r, scope| {
            r.declare_block_level(&block.body, scope)?;
            r.visit_statements(&block.body)
        })
    }

    fn visit_variable_declaration(&mut self, decl: &VariableDeclaration) -> Result<(), ResolveError> {
        for d in &decl.declarations {
            if let Some(init) = &d.init {
                self.visit_expression(init)?;
            }
            self.declaration(&d.name, decl.kind == VariableKind::Var);
        }
        Ok(())
    }

    fn visit_statement(&mut self, statement: &Statement) -> Result<(), ResolveError> {
        match statement {
            Statement::Variable(decl) => self.visit_variable_declaration(decl),
            Statement::Function(f) => {
                if let Some(name) = &f.name {
                    self.declaration(name, false);
                }
                self.visit_function(f)
            }
            Statement::Expression(s) => self.visit_expression(&s.expression),
            Statement::Block(b) => self.visit_block(b),
            Statement::Empty(_) | Statement::Debugger(_) | Statement::Break(_) | Statement::Continue(_) => Ok(()),
            Statement::If(s) => {
                self.visit_expression(&s.test)?;
                self.visit_statement(&s.consequent)?;
                if let Some(alternate) = &s.alternate {
                    self.visit_statement(alternate)?;
                }
                Ok(())
            }
            Statement::For(s) => self.with_scope(ScopeKind::Block, Some(s.id), |r, scope| {
                match &s.init {
                    Some(ForInit::Variable(decl)) => {
                        r.declare_for_head(decl, scope)?;
                        r.visit_variable_declaration(decl)?;
                    }
                    Some(ForInit::Expression(e)) => r.visit_expression(e)?,
                    None => {}
                }
                if let Some(test) = &s.test {
                    r.visit_expression(test)?;
                }
                if let Some(update) = &s.update {
                    r.visit_expression(update)?;
                }
                r.visit_statement(&s.body)
            }),
            Statement::ForIn(s) => {
                self.visit_expression(&s.right)?;
                self.with_scope(ScopeKind::Block, Some(s.id), |r, scope| {
                    match &s.left {
                        ForInTarget::Variable(decl) => {
                            r.declare_for_head(decl, scope)?;
                            for d in &decl.declarations {
                                r.declaration(&d.name, decl.kind == VariableKind::Var);
                            }
                        }
                        ForInTarget::Expression(e) => r.visit_target(e, Access::Write)?,
                    }
                    r.visit_statement(&s.body)
                })
            }
            Statement::While(s) => {
                self.visit_expression(&s.test)?;
                self.visit_statement(&s.body)
            }
            Statement::DoWhile(s) => {
                self.visit_statement(&s.body)?;
                self.visit_expression(&s.test)
            }
            Statement::Return(s) => match &s.argument {
                Some(argument) => self.visit_expression(argument),
                None => Ok(()),
            },
            Statement::Throw(s) => self.visit_expression(&s.argument),
            Statement::Try(s) => {
                self.visit_block(&s.block)?;
                if let Some(handler) = &s.handler {
                    self.with_scope(ScopeKind::Catch, Some(handler.id), |r, scope| {
                        r.declare(scope, &handler.param, DeclKind::CatchParam, 0)?;
                        r.declaration(&handler.param, false);
                        r.visit_block(&handler.body)
                    })?;
                }
                if let Some(finalizer) = &s.finalizer {
                    self.visit_block(finalizer)?;
                }
                Ok(())
            }
            Statement::Switch(s) => {
                self.visit_expression(&s.discriminant)?;
                self.with_scope(ScopeKind::Block, Some(s.id), |r, scope| {
                    for case in &s.cases {
                        r.declare_block_level(&case.consequent, scope)?;
                    }
                    for case in &s.cases {
                        if let Some(test) = &case.test {
                            r.visit_expression(test)?;
                        }
                        r.visit_statements(&case.consequent)?;
                    }
                    Ok(())
                })
            }
            Statement::Labeled(s) => self.visit_statement(&s.body),
            Statement::With(s) => {
                self.visit_expression(&s.object)?;
                let func = self.current_fn();
                self.functions[func].dynamic = true;
                self.with_scope(ScopeKind::With, None, |r, _| r.visit_statement(&s.body))
            }
        }
    }

    /// `let`/`const` in a loop head live in the loop's own scope.
    fn declare_for_head(&mut self, decl: &VariableDeclaration, scope: ScopeId) -> Result<(), ResolveError> {
        let kind = match decl.kind {
            VariableKind::Var => return Ok(()),
            VariableKind::Let => DeclKind::Let,
            VariableKind::Const => DeclKind::Const,
        };
        for d in &decl.declarations {
            self.declare(scope, &d.name, kind, d.span.end)?;
        }
        Ok(())
    }

    // ========================================================================
    // Functions
    // ========================================================================

    fn visit_function(&mut self, f: &FunctionNode) -> Result<(), ResolveError> {
        let parent = self.current_fn();
        let saved = self.current;
        let scope = self.tree.push(ScopeKind::Function, Some(saved));
        self.current = scope;
        let index = self.enter_function(scope, f.id, Some(parent), false, f.strict);

        let result = (|| {
            for param in &f.params {
                let (sym, _) = self.tree.declare(scope, param.name, DeclKind::Param, 0);
                self.functions[index].params.push(sym);
                self.declaration(param, false);
            }
            for statement in &f.body {
                self.hoist_vars(statement, scope)?;
            }
            self.declare_block_level(&f.body, scope)?;
            if f.kind == FunctionKind::Expression {
                if let Some(name) = &f.name {
                    let (sym, fresh) = self.tree.declare(scope, name.name, DeclKind::SelfName, 0);
                    if fresh {
                        self.functions[index].self_name = Some(sym);
                        self.declaration(name, false);
                    }
                }
            }
            self.visit_statements(&f.body)
        })();

        self.fn_stack.pop();
        self.current = saved;
        result
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn visit_target(&mut self, target: &Expression, access: Access) -> Result<(), ResolveError> {
        match target {
            Expression::Identifier(ident) => self.reference(ident, access),
            other => self.visit_expression(other),
        }
    }

    fn visit_expression(&mut self, expression: &Expression) -> Result<(), ResolveError> {
        match expression {
            Expression::Number(_)
            | Expression::String(_)
            | Expression::Boolean(_)
            | Expression::Null(_)
            | Expression::RegExp(_)
            | Expression::This(_) => Ok(()),
            Expression::Template(t) => {
                for e in &t.expressions {
                    self.visit_expression(e)?;
                }
                Ok(())
            }
            Expression::Identifier(ident) => self.reference(ident, Access::Read),
            Expression::Array(a) => {
                for element in a.elements.iter().flatten() {
                    self.visit_expression(element)?;
                }
                Ok(())
            }
            Expression::Object(o) => {
                for property in &o.properties {
                    match &property.value {
                        PropertyValue::Init(value) => self.visit_expression(value)?,
                        PropertyValue::Getter(f) | PropertyValue::Setter(f) => self.visit_function(f)?,
                    }
                }
                Ok(())
            }
            Expression::Function(f) => self.visit_function(f),
            Expression::Unary(u) => self.visit_expression(&u.operand),
            Expression::Update(u) => self.visit_target(&u.target, Access::ReadWrite),
            Expression::Binary(b) => {
                self.visit_expression(&b.left)?;
                self.visit_expression(&b.right)
            }
            Expression::Logical(l) => {
                self.visit_expression(&l.left)?;
                self.visit_expression(&l.right)
            }
            Expression::Assignment(a) => {
                let access = if a.operator == AssignmentOperator::Assign {
                    Access::Write
                } else {
                    Access::ReadWrite
                };
                self.visit_target(&a.target, access)?;
                self.visit_expression(&a.value)
            }
            Expression::Conditional(c) => {
                self.visit_expression(&c.test)?;
                self.visit_expression(&c.consequent)?;
                self.visit_expression(&c.alternate)
            }
            Expression::Call(c) => {
                if let Expression::Identifier(callee) = c.callee.as_ref() {
                    if Some(callee.name) == self.eval_name {
                        let func = self.current_fn();
                        self.functions[func].dynamic = true;
                    }
                }
                self.visit_expression(&c.callee)?;
                for argument in &c.arguments {
                    self.visit_expression(argument)?;
                }
                Ok(())
            }
            Expression::New(n) => {
                self.visit_expression(&n.callee)?;
                for argument in &n.arguments {
                    self.visit_expression(argument)?;
                }
                Ok(())
            }
            Expression::Member(m) => {
                self.visit_expression(&m.object)?;
                if let MemberProperty::Computed(key) = &m.property {
                    self.visit_expression(key)?;
                }
                Ok(())
            }
            Expression::Sequence(s) => {
                for e in &s.expressions {
                    self.visit_expression(e)?;
                }
                Ok(())
            }
        }
    }

    // ========================================================================
    // Frame layout
    // ========================================================================

    fn finish(self) -> Resolution {
        let mut storage: FxHashMap<SymbolRef, Storage> = FxHashMap::default();
        let mut resolution = Resolution::default();

        for f in &self.functions {
            let mut layout = FunctionScope {
                scope: Some(f.scope),
                param_count: f.params.len() as u32,
                strict: f.strict,
                dynamic: f.dynamic,
                param_cells: vec![None; f.params.len()],
                ..FunctionScope::default()
            };
            let mut param_slot: FxHashMap<SymbolRef, u32> = FxHashMap::default();
            for (slot, sym) in f.params.iter().enumerate() {
                param_slot.insert(*sym, slot as u32);
            }
            let mut next_local = layout.param_count;
            let mut next_cell = 0u32;

            for scope in self.tree.iter().filter(|s| s.function_scope == f.scope) {
                for (i, info) in scope.symbols.iter().enumerate() {
                    let sym = SymbolRef {
                        scope: scope.id,
                        index: i as u32,
                    };
                    if f.is_script && self.is_global_symbol(sym) {
                        storage.insert(sym, Storage::Global);
                        layout.global_declarations.push(info.name);
                        continue;
                    }
                    if info.captured {
                        let cell = next_cell;
                        next_cell += 1;
                        storage.insert(sym, Storage::Cell(cell));
                        if let Some(slot) = param_slot.get(&sym) {
                            layout.param_cells[*slot as usize] = Some(cell);
                        }
                        if let Some(node) = self.block_nodes.get(&scope.id) {
                            resolution.block_cells.entry(*node).or_default().push(cell);
                        }
                    } else if let Some(slot) = param_slot.get(&sym) {
                        storage.insert(sym, Storage::Local(*slot));
                    } else {
                        storage.insert(sym, Storage::Local(next_local));
                        next_local += 1;
                    }
                }
            }
            layout.local_count = next_local;
            layout.cell_count = next_cell;

            let own = |sym: SymbolRef| match storage.get(&sym) {
                Some(Storage::Local(slot)) => Binding::Local(*slot),
                Some(Storage::Cell(cell)) => Binding::Captured(Capture::Own(*cell)),
                _ => Binding::Global,
            };
            layout.arguments = f.arguments.map(own);
            layout.self_name = f.self_name.map(own);
            resolution.functions.insert(f.node, layout);
        }

        // Upvalue sources need the parent's finished layout.
        for f in &self.functions {
            let Some(parent) = f.parent else { continue };
            let sources: Vec<UpvalueSource> = f
                .upvalues
                .iter()
                .map(|sym| {
                    if self.owner_of(*sym) == parent {
                        match storage.get(sym) {
                            Some(Storage::Cell(cell)) => UpvalueSource::ParentCell(*cell),
                            _ => UpvalueSource::ParentCell(0),
                        }
                    } else {
                        let slot = self.functions[parent].upvalue_index.get(sym).copied().unwrap_or(0);
                        UpvalueSource::ParentUpvalue(slot)
                    }
                })
                .collect();
            if let Some(layout) = resolution.functions.get_mut(&f.node) {
                layout.upvalues = sources;
            }
        }

        for r in &self.refs {
            let binding = match r.target {
                None => Binding::Global,
                Some(sym) => {
                    resolution.symbols.insert(r.node, sym);
                    let owned_here = self.owner_of(sym) == r.func;
                    match storage.get(&sym) {
                        Some(Storage::Local(slot)) if owned_here => Binding::Local(*slot),
                        Some(Storage::Cell(cell)) if owned_here => Binding::Captured(Capture::Own(*cell)),
                        Some(Storage::Cell(_)) => {
                            let slot = self.functions[r.func].upvalue_index.get(&sym).copied().unwrap_or(0);
                            Binding::Captured(Capture::Upvalue(slot))
                        }
                        _ => Binding::Global,
                    }
                }
            };
            let binding = if r.dynamic {
                Binding::Dynamic(Box::new(binding))
            } else {
                binding
            };
            resolution.bindings.insert(r.node, binding);
        }

        log::debug!(
            "resolved {} scopes, {} functions, {} references",
            self.tree.len(),
            self.functions.len(),
            self.refs.len()
        );
        resolution.scopes = self.tree;
        resolution
    }
}
