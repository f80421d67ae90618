//! Optimistic type analysis.
//!
//! Every expression gets an optimistic type from the lattice
//! `Int32 ⊑ Number ⊑ Generic` (plus the disjoint `Boolean`, `String` and
//! `Object` kinds). The pessimistic fallback type is always `Generic`.
//!
//! Symbols are typed flow-insensitively: every store joins into the
//! symbol's type and the walk repeats until nothing changes. Values the
//! analysis cannot see (parameters, property reads, call results,
//! unassigned globals) are assumed to be `Int32`. The runtime checks that
//! assumption and deoptimizes when it fails.

use rustc_hash::FxHashMap;

use super::scope::{Binding, DeclKind, Resolution, SymbolRef};
use crate::parser::ast::*;
use crate::parser::interner::Symbol;

/// Upper bound on fixpoint iterations; the lattice has height three so
/// this is only reached by pathological inputs.
const MAX_PASSES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptType {
    Int32,
    Number,
    Boolean,
    String,
    Object,
    Generic,
}

impl OptType {
    /// Least upper bound.
    pub fn join(self, other: OptType) -> OptType {
        match (self, other) {
            (a, b) if a == b => a,
            (OptType::Int32, OptType::Number) | (OptType::Number, OptType::Int32) => OptType::Number,
            _ => OptType::Generic,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, OptType::Int32 | OptType::Number)
    }

    /// Type that is always safe to assume.
    pub fn fallback(self) -> OptType {
        OptType::Generic
    }

    pub fn name(self) -> &'static str {
        match self {
            OptType::Int32 => "int32",
            OptType::Number => "number",
            OptType::Boolean => "boolean",
            OptType::String => "string",
            OptType::Object => "object",
            OptType::Generic => "any",
        }
    }
}

impl std::fmt::Display for OptType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Optimistic type of each expression node.
#[derive(Debug, Clone, Default)]
pub struct TypeMap {
    types: FxHashMap<NodeId, OptType>,
}

impl TypeMap {
    /// A map that answers `Generic` for every node.
    pub fn pessimistic() -> Self {
        Self::default()
    }

    pub fn get(&self, id: NodeId) -> OptType {
        self.types.get(&id).copied().unwrap_or(OptType::Generic)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Run the analysis. With `optimistic` off every node is `Generic`.
pub fn analyze(program: &Program, resolution: &Resolution, optimistic: bool) -> TypeMap {
    if !optimistic {
        return TypeMap::pessimistic();
    }
    let mut analyzer = Analyzer {
        resolution,
        symbols: FxHashMap::default(),
        types: FxHashMap::default(),
        changed: false,
        dynamic: Vec::new(),
    };
    for pass in 0..MAX_PASSES {
        analyzer.changed = false;
        analyzer.types.clear();
        analyzer.enter(program.id);
        analyzer.statements(&program.body);
        analyzer.dynamic.pop();
        if !analyzer.changed {
            log::debug!("type analysis converged after {} passes", pass + 1);
            break;
        }
    }
    TypeMap { types: analyzer.types }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum SymKey {
    Declared(SymbolRef),
    Global(Symbol),
}

struct Analyzer<'a> {
    resolution: &'a Resolution,
    symbols: FxHashMap<SymKey, OptType>,
    types: FxHashMap<NodeId, OptType>,
    changed: bool,
    /// Dynamic flag of each function being walked
    dynamic: Vec<bool>,
}

impl<'a> Analyzer<'a> {
    fn enter(&mut self, function: NodeId) {
        let dynamic = self.resolution.function(function).map_or(false, |f| f.dynamic);
        let inherited = self.dynamic.last().copied().unwrap_or(false);
        self.dynamic.push(dynamic || inherited);
    }

    fn in_dynamic(&self) -> bool {
        self.dynamic.last().copied().unwrap_or(false)
    }

    fn key(&self, ident: &Identifier) -> Option<SymKey> {
        match self.resolution.binding(ident.id) {
            Some(Binding::Dynamic(_)) => None,
            _ => Some(match self.resolution.symbols.get(&ident.id) {
                Some(sym) => SymKey::Declared(*sym),
                None => SymKey::Global(ident.name),
            }),
        }
    }

    /// Join `ty` into the type of the symbol behind `ident`.
    fn store(&mut self, ident: &Identifier, ty: OptType) {
        let Some(key) = self.key(ident) else { return };
        let ty = if self.in_dynamic() { OptType::Generic } else { ty };
        let joined = match self.symbols.get(&key) {
            Some(old) => old.join(ty),
            None => ty,
        };
        if self.symbols.get(&key) != Some(&joined) {
            self.symbols.insert(key, joined);
            self.changed = true;
        }
    }

    fn load(&self, ident: &Identifier) -> OptType {
        if self.in_dynamic() {
            return OptType::Generic;
        }
        match self.key(ident) {
            None => OptType::Generic,
            Some(key) => {
                if let SymKey::Declared(sym) = key {
                    match self.resolution.scopes.symbol(sym).kind {
                        DeclKind::Function | DeclKind::SelfName | DeclKind::Arguments => return OptType::Object,
                        DeclKind::CatchParam => return OptType::Generic,
                        _ => {}
                    }
                }
                self.symbols.get(&key).copied().unwrap_or(OptType::Int32)
            }
        }
    }

    fn record(&mut self, id: NodeId, ty: OptType) -> OptType {
        let ty = if self.in_dynamic() { OptType::Generic } else { ty };
        self.types.insert(id, ty);
        ty
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn statements(&mut self, statements: &[Statement]) {
        for statement in statements {
            self.statement(statement);
        }
    }

    fn statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Variable(decl) => self.variable_declaration(decl),
            Statement::Function(f) => self.function(f),
            Statement::Expression(s) => {
                self.expression(&s.expression);
            }
            Statement::Block(b) => self.statements(&b.body),
            Statement::Empty(_) | Statement::Debugger(_) | Statement::Break(_) | Statement::Continue(_) => {}
            Statement::If(s) => {
                self.expression(&s.test);
                self.statement(&s.consequent);
                if let Some(alternate) = &s.alternate {
                    self.statement(alternate);
                }
            }
            Statement::For(s) => {
                match &s.init {
                    Some(ForInit::Variable(decl)) => self.variable_declaration(decl),
                    Some(ForInit::Expression(e)) => {
                        self.expression(e);
                    }
                    None => {}
                }
                if let Some(test) = &s.test {
                    self.expression(test);
                }
                if let Some(update) = &s.update {
                    self.expression(update);
                }
                self.statement(&s.body);
            }
            Statement::ForIn(s) => {
                self.expression(&s.right);
                match &s.left {
                    ForInTarget::Variable(decl) => {
                        for d in &decl.declarations {
                            self.store(&d.name, OptType::String);
                        }
                    }
                    ForInTarget::Expression(Expression::Identifier(ident)) => self.store(ident, OptType::String),
                    ForInTarget::Expression(other) => {
                        self.expression(other);
                    }
                }
                self.statement(&s.body);
            }
            Statement::While(s) => {
                self.expression(&s.test);
                self.statement(&s.body);
            }
            Statement::DoWhile(s) => {
                self.statement(&s.body);
                self.expression(&s.test);
            }
            Statement::Return(s) => {
                if let Some(argument) = &s.argument {
                    self.expression(argument);
                }
            }
            Statement::Throw(s) => {
                self.expression(&s.argument);
            }
            Statement::Try(s) => {
                self.statements(&s.block.body);
                if let Some(handler) = &s.handler {
                    self.statements(&handler.body.body);
                }
                if let Some(finalizer) = &s.finalizer {
                    self.statements(&finalizer.body);
                }
            }
            Statement::Switch(s) => {
                self.expression(&s.discriminant);
                for case in &s.cases {
                    if let Some(test) = &case.test {
                        self.expression(test);
                    }
                    self.statements(&case.consequent);
                }
            }
            Statement::Labeled(s) => self.statement(&s.body),
            Statement::With(s) => {
                self.expression(&s.object);
                self.statement(&s.body);
            }
        }
    }

    fn variable_declaration(&mut self, decl: &VariableDeclaration) {
        for d in &decl.declarations {
            // An implicit `undefined` initial value does not widen the type.
            if let Some(init) = &d.init {
                let ty = self.expression(init);
                self.store(&d.name, ty);
            }
        }
    }

    fn function(&mut self, f: &FunctionNode) {
        self.enter(f.id);
        self.statements(&f.body);
        self.dynamic.pop();
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn expression(&mut self, expression: &Expression) -> OptType {
        let ty = match expression {
            Expression::Number(n) => number_type(n.value),
            Expression::String(_) | Expression::Template(_) => {
                if let Expression::Template(t) = expression {
                    for e in &t.expressions {
                        self.expression(e);
                    }
                }
                OptType::String
            }
            Expression::Boolean(_) => OptType::Boolean,
            Expression::Null(_) => OptType::Generic,
            Expression::RegExp(_) | Expression::This(_) => OptType::Object,
            Expression::Identifier(ident) => self.load(ident),
            Expression::Array(a) => {
                for element in a.elements.iter().flatten() {
                    self.expression(element);
                }
                OptType::Object
            }
            Expression::Object(o) => {
                for property in &o.properties {
                    match &property.value {
                        PropertyValue::Init(value) => {
                            self.expression(value);
                        }
                        PropertyValue::Getter(f) | PropertyValue::Setter(f) => self.function(f),
                    }
                }
                OptType::Object
            }
            Expression::Function(f) => {
                self.function(f);
                OptType::Object
            }
            Expression::Unary(u) => {
                let operand = self.expression(&u.operand);
                match u.operator {
                    UnaryOperator::Minus if constant(expression).is_some() => {
                        constant(expression).map_or(OptType::Number, number_type)
                    }
                    UnaryOperator::Minus | UnaryOperator::Plus => {
                        if operand == OptType::Int32 {
                            OptType::Int32
                        } else {
                            OptType::Number
                        }
                    }
                    UnaryOperator::BitwiseNot => OptType::Int32,
                    UnaryOperator::Not | UnaryOperator::Delete => OptType::Boolean,
                    UnaryOperator::Typeof => OptType::String,
                    UnaryOperator::Void => OptType::Generic,
                }
            }
            Expression::Update(u) => {
                let current = self.expression(&u.target);
                let ty = if current == OptType::Int32 {
                    OptType::Int32
                } else {
                    OptType::Number
                };
                if let Expression::Identifier(ident) = u.target.as_ref() {
                    self.store(ident, ty);
                }
                ty
            }
            Expression::Binary(b) => {
                let left = self.expression(&b.left);
                let right = self.expression(&b.right);
                binary_type(b, left, right)
            }
            Expression::Logical(l) => {
                let left = self.expression(&l.left);
                let right = self.expression(&l.right);
                left.join(right)
            }
            Expression::Assignment(a) => self.assignment(a),
            Expression::Conditional(c) => {
                self.expression(&c.test);
                let consequent = self.expression(&c.consequent);
                let alternate = self.expression(&c.alternate);
                consequent.join(alternate)
            }
            Expression::Call(c) => {
                self.expression(&c.callee);
                for argument in &c.arguments {
                    self.expression(argument);
                }
                OptType::Int32
            }
            Expression::New(n) => {
                self.expression(&n.callee);
                for argument in &n.arguments {
                    self.expression(argument);
                }
                OptType::Object
            }
            Expression::Member(m) => {
                self.expression(&m.object);
                if let MemberProperty::Computed(key) = &m.property {
                    self.expression(key);
                }
                OptType::Int32
            }
            Expression::Sequence(s) => {
                let mut last = OptType::Generic;
                for e in &s.expressions {
                    last = self.expression(e);
                }
                last
            }
        };
        self.record(expression.id(), ty)
    }

    fn assignment(&mut self, a: &AssignmentExpression) -> OptType {
        let target = match a.target.as_ref() {
            Expression::Identifier(ident) => {
                let current = self.load(ident);
                self.types.insert(ident.id, current);
                current
            }
            other => self.expression(other),
        };
        let value = self.expression(&a.value);
        let ty = match a.operator.binary_operator() {
            None => value,
            Some(operator) => binary_result(operator, target, value, false),
        };
        if let Expression::Identifier(ident) = a.target.as_ref() {
            self.store(ident, ty);
        }
        ty
    }
}

fn number_type(value: f64) -> OptType {
    if fits_int32(value) {
        OptType::Int32
    } else {
        OptType::Number
    }
}

fn fits_int32(value: f64) -> bool {
    value.fract() == 0.0
        && value >= i32::MIN as f64
        && value <= i32::MAX as f64
        && !(value == 0.0 && value.is_sign_negative())
}

/// Literal value of a numeric constant expression.
fn constant(expression: &Expression) -> Option<f64> {
    match expression {
        Expression::Number(n) => Some(n.value),
        Expression::Unary(u) if u.operator == UnaryOperator::Minus => constant(&u.operand).map(|v| -v),
        _ => None,
    }
}

fn binary_type(b: &BinaryExpression, left: OptType, right: OptType) -> OptType {
    let both_constant = match (constant(&b.left), constant(&b.right)) {
        (Some(l), Some(r)) => Some((l, r)),
        _ => None,
    };
    let overflows = both_constant.map_or(false, |(l, r)| {
        let folded = match b.operator {
            BinaryOperator::Add => l + r,
            BinaryOperator::Subtract => l - r,
            BinaryOperator::Multiply => l * r,
            _ => return false,
        };
        !fits_int32(folded)
    });
    binary_result(b.operator, left, right, overflows)
}

/// Result type of a binary operator on operands of the given types.
fn binary_result(operator: BinaryOperator, left: OptType, right: OptType, overflows: bool) -> OptType {
    use BinaryOperator::*;
    match operator {
        Add => {
            if left == OptType::String || right == OptType::String {
                OptType::String
            } else if left == OptType::Int32 && right == OptType::Int32 {
                if overflows {
                    OptType::Number
                } else {
                    OptType::Int32
                }
            } else if left.is_numeric() && right.is_numeric() {
                OptType::Number
            } else {
                OptType::Generic
            }
        }
        Subtract | Multiply | Modulo => {
            if left == OptType::Int32 && right == OptType::Int32 && !overflows {
                OptType::Int32
            } else {
                OptType::Number
            }
        }
        Divide => OptType::Number,
        BitwiseAnd | BitwiseOr | BitwiseXor | LeftShift | RightShift => OptType::Int32,
        UnsignedRightShift => OptType::Number,
        Equal | NotEqual | StrictEqual | StrictNotEqual | LessThan | LessEqual | GreaterThan | GreaterEqual | In
        | Instanceof => OptType::Boolean,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::resolver::resolve;
    use crate::parser::Parser;

    fn analyze_src(src: &str) -> (Program, TypeMap) {
        let (program, interner) = Parser::new(src).parse().expect("should parse");
        let resolution = resolve(&program, &interner).expect("should resolve");
        let types = analyze(&program, &resolution, true);
        (program, types)
    }

    fn expr_types(program: &Program, types: &TypeMap) -> Vec<OptType> {
        program
            .body
            .iter()
            .filter_map(|s| match s {
                Statement::Expression(e) => Some(types.get(e.expression.id())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_join() {
        assert_eq!(OptType::Int32.join(OptType::Int32), OptType::Int32);
        assert_eq!(OptType::Int32.join(OptType::Number), OptType::Number);
        assert_eq!(OptType::Number.join(OptType::String), OptType::Generic);
        assert_eq!(OptType::Boolean.join(OptType::Int32), OptType::Generic);
    }

    #[test]
    fn test_literal_types() {
        let (program, types) = analyze_src("1; 1.5; 'a'; true; -0; 2147483648;");
        assert_eq!(
            expr_types(&program, &types),
            vec![
                OptType::Int32,
                OptType::Number,
                OptType::String,
                OptType::Boolean,
                OptType::Number,
                OptType::Number,
            ]
        );
    }

    #[test]
    fn test_arithmetic_widening() {
        let (program, types) = analyze_src("1 + 2; 2147483647 + 1; 'a' + 1; 1 / 2; 1 - 2; 1 | 2; 1 >>> 0; 1 < 2;");
        assert_eq!(
            expr_types(&program, &types),
            vec![
                OptType::Int32,
                OptType::Number,
                OptType::String,
                OptType::Number,
                OptType::Int32,
                OptType::Int32,
                OptType::Number,
                OptType::Boolean,
            ]
        );
    }

    #[test]
    fn test_unknown_values_are_optimistic() {
        let (program, types) = analyze_src("function f(a) { return a + 1; }");
        let f = match &program.body[0] {
            Statement::Function(f) => f,
            other => panic!("unexpected {:?}", other),
        };
        match &f.body[0] {
            Statement::Return(ReturnStatement { argument: Some(e), .. }) => {
                assert_eq!(types.get(e.id()), OptType::Int32)
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_symbol_types_join_to_fixpoint() {
        // `x` is seen as Int32 first, then widened once the later store is seen.
        let (program, types) = analyze_src("var x = 1; x + 1; x = 'a'; x + 1;");
        let found = expr_types(&program, &types);
        assert_eq!(found[0], OptType::Generic);
        assert_eq!(found[2], OptType::Generic);
    }

    #[test]
    fn test_number_symbol_stays_numeric() {
        let (program, types) = analyze_src("var n = 1; n = 0.5; n * 2;");
        assert_eq!(expr_types(&program, &types)[1], OptType::Number);
    }

    #[test]
    fn test_dynamic_scope_is_pessimistic() {
        let (program, types) = analyze_src("function f(o) { with (o) { return 1 + 2; } }");
        let f = match &program.body[0] {
            Statement::Function(f) => f,
            other => panic!("unexpected {:?}", other),
        };
        let ret = match &f.body[0] {
            Statement::With(w) => match w.body.as_ref() {
                Statement::Block(b) => match &b.body[0] {
                    Statement::Return(ReturnStatement { argument: Some(e), .. }) => e.id(),
                    other => panic!("unexpected {:?}", other),
                },
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(types.get(ret), OptType::Generic);
    }

    #[test]
    fn test_disabled_analysis_is_generic() {
        let (program, interner) = Parser::new("1 + 2;").parse().unwrap();
        let resolution = resolve(&program, &interner).unwrap();
        let types = analyze(&program, &resolution, false);
        assert!(types.is_empty());
        assert_eq!(expr_types(&program, &types), vec![OptType::Generic]);
    }
}
