//! Expression lowering

use std::rc::Rc;

use super::Lowerer;
use crate::analysis::{Binding, OptType};
use crate::compiler::error::{CompileError, CompileResult};
use crate::compiler::ir::{BinaryOp, Coercion, IrConstant, IrInstr, Register, SiteId, SiteKind, Terminator, UnaryOp};
use crate::parser::ast::*;
use crate::vm::convert::number_to_string;

/// A member expression with its object (and computed key) evaluated.
#[derive(Debug, Clone)]
enum MemberRef {
    Named { object: Register, key: Rc<str>, site: SiteId },
    Computed { object: Register, key: Register, site: SiteId },
}

impl MemberRef {
    fn object(&self) -> Register {
        match self {
            MemberRef::Named { object, .. } | MemberRef::Computed { object, .. } => *object,
        }
    }
}

fn binary_op(op: BinaryOperator) -> BinaryOp {
    match op {
        BinaryOperator::Add => BinaryOp::Add,
        BinaryOperator::Subtract => BinaryOp::Sub,
        BinaryOperator::Multiply => BinaryOp::Mul,
        BinaryOperator::Divide => BinaryOp::Div,
        BinaryOperator::Modulo => BinaryOp::Mod,
        BinaryOperator::Equal => BinaryOp::Eq,
        BinaryOperator::NotEqual => BinaryOp::Ne,
        BinaryOperator::StrictEqual => BinaryOp::StrictEq,
        BinaryOperator::StrictNotEqual => BinaryOp::StrictNe,
        BinaryOperator::LessThan => BinaryOp::Lt,
        BinaryOperator::LessEqual => BinaryOp::Le,
        BinaryOperator::GreaterThan => BinaryOp::Gt,
        BinaryOperator::GreaterEqual => BinaryOp::Ge,
        BinaryOperator::BitwiseAnd => BinaryOp::BitAnd,
        BinaryOperator::BitwiseOr => BinaryOp::BitOr,
        BinaryOperator::BitwiseXor => BinaryOp::BitXor,
        BinaryOperator::LeftShift => BinaryOp::Shl,
        BinaryOperator::RightShift => BinaryOp::Shr,
        BinaryOperator::UnsignedRightShift => BinaryOp::UShr,
        BinaryOperator::In => BinaryOp::In,
        BinaryOperator::Instanceof => BinaryOp::InstanceOf,
    }
}

impl<'a> Lowerer<'a> {
    pub(super) fn lower_expression(&mut self, expr: &'a Expression) -> CompileResult<Register> {
        match expr {
            Expression::Number(n) => Ok(self.const_reg(IrConstant::number(n.value))),
            Expression::String(s) => {
                let value = self.string(s.value);
                Ok(self.const_reg(IrConstant::String(value)))
            }
            Expression::Boolean(b) => Ok(self.const_reg(IrConstant::Boolean(b.value))),
            Expression::Null(_) => Ok(self.const_reg(IrConstant::Null)),
            Expression::RegExp(r) => {
                let dest = self.new_register(OptType::Object);
                let pattern = self.string(r.pattern);
                let flags = self.string(r.flags);
                self.emit(IrInstr::NewRegExp { dest, pattern, flags });
                Ok(dest)
            }
            Expression::Template(t) => self.lower_template(t),
            Expression::Identifier(ident) => Ok(self.load_identifier(ident, false)),
            Expression::This(_) => {
                let dest = self.new_register(OptType::Generic);
                self.emit(IrInstr::LoadThis { dest });
                Ok(dest)
            }
            Expression::Array(a) => {
                let mut elements = Vec::with_capacity(a.elements.len());
                for element in &a.elements {
                    elements.push(match element {
                        Some(e) => Some(self.lower_expression(e)?),
                        None => None,
                    });
                }
                let dest = self.new_register(OptType::Object);
                self.emit(IrInstr::NewArray { dest, elements });
                Ok(dest)
            }
            Expression::Object(o) => self.lower_object(o),
            Expression::Function(f) => {
                let function = self.lower_function(f)?;
                let dest = self.new_register(OptType::Object);
                self.emit(IrInstr::MakeClosure { dest, function });
                Ok(dest)
            }
            Expression::Unary(u) => self.lower_unary(u),
            Expression::Update(u) => self.lower_update(u),
            Expression::Binary(b) => {
                let left = self.lower_expression(&b.left)?;
                let right = self.lower_expression(&b.right)?;
                let op = binary_op(b.operator);
                let speculation = if op.is_arithmetic() { self.speculation(b.id) } else { None };
                let dest = self.new_register(self.types.get(b.id));
                self.emit(IrInstr::Binary {
                    dest,
                    op,
                    left,
                    right,
                    speculation,
                });
                Ok(dest)
            }
            Expression::Logical(l) => self.lower_logical(l),
            Expression::Assignment(a) => self.lower_assignment(a),
            Expression::Conditional(c) => {
                let dest = self.new_register(self.types.get(c.id));
                let test = self.lower_expression(&c.test)?;
                let then_block = self.new_block("cond_then");
                let else_block = self.new_block("cond_else");
                let end = self.new_block("cond_end");
                self.terminate(Terminator::Branch {
                    cond: test,
                    then_block,
                    else_block,
                });
                self.switch_to(then_block);
                let value = self.lower_expression(&c.consequent)?;
                self.emit(IrInstr::Move { dest, src: value });
                self.terminate(Terminator::Jump(end));
                self.switch_to(else_block);
                let value = self.lower_expression(&c.alternate)?;
                self.emit(IrInstr::Move { dest, src: value });
                self.terminate(Terminator::Jump(end));
                self.switch_to(end);
                Ok(dest)
            }
            Expression::Call(c) => self.lower_call(c),
            Expression::New(n) => {
                self.set_line(&n.span);
                let callee = self.lower_expression(&n.callee)?;
                let args = self.lower_arguments(&n.arguments)?;
                self.set_line(&n.span);
                let site = self.site(SiteKind::Construct);
                let dest = self.new_register(OptType::Object);
                self.emit(IrInstr::New {
                    dest,
                    callee,
                    args,
                    site,
                });
                Ok(dest)
            }
            Expression::Member(m) => {
                let member = self.lower_member(m, false)?;
                Ok(self.get_member(&member, self.types.get(m.id)))
            }
            Expression::Sequence(s) => {
                let mut last = None;
                for e in &s.expressions {
                    last = Some(self.lower_expression(e)?);
                }
                match last {
                    Some(reg) => Ok(reg),
                    None => Ok(self.const_reg(IrConstant::Undefined)),
                }
            }
        }
    }

    fn lower_arguments(&mut self, arguments: &'a [Expression]) -> CompileResult<Vec<Register>> {
        arguments.iter().map(|a| self.lower_expression(a)).collect()
    }

    // ========================================================================
    // Identifiers
    // ========================================================================

    pub(super) fn load_identifier(&mut self, ident: &Identifier, typeof_guard: bool) -> Register {
        let binding = self.binding_of(ident);
        let name = self.string(ident.name);
        let ty = self.types.get(ident.id);
        self.load_binding(&binding, name, ty, typeof_guard)
    }

    fn store_identifier(&mut self, ident: &Identifier, value: Register) {
        let binding = self.binding_of(ident);
        let name = self.string(ident.name);
        self.store_binding(&binding, name, value);
    }

    // ========================================================================
    // Members
    // ========================================================================

    /// Evaluate the object and key of a member expression and allocate its
    /// dispatch site. A computed key is converted here, once, so a later
    /// right-hand side or a read-modify-write cannot observe it twice.
    fn lower_member(&mut self, m: &'a MemberExpression, write: bool) -> CompileResult<MemberRef> {
        let object = self.lower_expression(&m.object)?;
        self.set_line(&m.span);
        match &m.property {
            MemberProperty::Named(name, _) => {
                let key = self.string(*name);
                let site = self.site(SiteKind::Property(key.clone()));
                Ok(MemberRef::Named { object, key, site })
            }
            MemberProperty::Computed(key) => {
                let raw = self.lower_expression(key)?;
                self.set_line(&m.span);
                let key = self.new_register(OptType::String);
                self.emit(IrInstr::ElementKey {
                    dest: key,
                    object,
                    key: raw,
                    write,
                });
                let site = self.site(SiteKind::Element);
                Ok(MemberRef::Computed { object, key, site })
            }
        }
    }

    fn get_member(&mut self, member: &MemberRef, ty: OptType) -> Register {
        let dest = self.new_register(ty);
        let instr = match member {
            MemberRef::Named { object, key, site } => IrInstr::GetProperty {
                dest,
                object: *object,
                key: key.clone(),
                site: *site,
            },
            MemberRef::Computed { object, key, site } => IrInstr::GetElement {
                dest,
                object: *object,
                key: *key,
                site: *site,
            },
        };
        self.emit(instr);
        dest
    }

    fn set_member(&mut self, member: &MemberRef, value: Register) {
        let strict = self.fb.func.strict;
        let instr = match member {
            MemberRef::Named { object, key, site } => IrInstr::SetProperty {
                object: *object,
                key: key.clone(),
                value,
                site: *site,
                strict,
            },
            MemberRef::Computed { object, key, site } => IrInstr::SetElement {
                object: *object,
                key: *key,
                value,
                site: *site,
                strict,
            },
        };
        self.emit(instr);
    }

    /// Store `value` into an assignment target, evaluating the target's
    /// subexpressions first.
    pub(super) fn assign_to_target(&mut self, target: &'a Expression, value: Register) -> CompileResult<()> {
        match target {
            Expression::Identifier(ident) => {
                self.store_identifier(ident, value);
                Ok(())
            }
            Expression::Member(m) => {
                let member = self.lower_member(m, true)?;
                self.set_member(&member, value);
                Ok(())
            }
            other => Err(CompileError::syntax("Invalid assignment target", *other.span())),
        }
    }

    // ========================================================================
    // Operators
    // ========================================================================

    fn lower_unary(&mut self, u: &'a UnaryExpression) -> CompileResult<Register> {
        match u.operator {
            UnaryOperator::Typeof => {
                let operand = match u.operand.as_ref() {
                    Expression::Identifier(ident) => self.load_identifier(ident, true),
                    other => self.lower_expression(other)?,
                };
                let dest = self.new_register(OptType::String);
                self.emit(IrInstr::Unary {
                    dest,
                    op: UnaryOp::Typeof,
                    operand,
                    speculation: None,
                });
                Ok(dest)
            }
            UnaryOperator::Delete => self.lower_delete(&u.operand),
            UnaryOperator::Void => {
                self.lower_expression(&u.operand)?;
                Ok(self.const_reg(IrConstant::Undefined))
            }
            UnaryOperator::Plus => {
                let value = self.lower_expression(&u.operand)?;
                let dest = self.new_register(OptType::Number);
                self.emit(IrInstr::Coerce {
                    dest,
                    value,
                    kind: Coercion::ToNumber,
                });
                Ok(dest)
            }
            UnaryOperator::Minus | UnaryOperator::Not | UnaryOperator::BitwiseNot => {
                let operand = self.lower_expression(&u.operand)?;
                let (op, speculation) = match u.operator {
                    UnaryOperator::Minus => (UnaryOp::Neg, self.speculation(u.id)),
                    UnaryOperator::Not => (UnaryOp::Not, None),
                    _ => (UnaryOp::BitNot, None),
                };
                let dest = self.new_register(self.types.get(u.id));
                self.emit(IrInstr::Unary {
                    dest,
                    op,
                    operand,
                    speculation,
                });
                Ok(dest)
            }
        }
    }

    fn lower_delete(&mut self, operand: &'a Expression) -> CompileResult<Register> {
        match operand {
            Expression::Member(m) => {
                let object = self.lower_expression(&m.object)?;
                let key = match &m.property {
                    MemberProperty::Named(name, _) => {
                        let key = self.string(*name);
                        self.const_reg(IrConstant::String(key))
                    }
                    MemberProperty::Computed(key) => self.lower_expression(key)?,
                };
                let dest = self.new_register(OptType::Boolean);
                let strict = self.fb.func.strict;
                self.emit(IrInstr::Delete {
                    dest,
                    object,
                    key,
                    strict,
                });
                Ok(dest)
            }
            Expression::Identifier(ident) => {
                let binding = self.binding_of(ident);
                match binding {
                    Binding::Global | Binding::Dynamic(_) => {
                        let dest = self.new_register(OptType::Boolean);
                        let name = self.string(ident.name);
                        self.emit(IrInstr::DeleteName { dest, name, binding });
                        Ok(dest)
                    }
                    _ => Ok(self.const_reg(IrConstant::Boolean(false))),
                }
            }
            other => {
                self.lower_expression(other)?;
                Ok(self.const_reg(IrConstant::Boolean(true)))
            }
        }
    }

    fn lower_update(&mut self, u: &'a UpdateExpression) -> CompileResult<Register> {
        let op = match u.operator {
            UpdateOperator::Increment => BinaryOp::Add,
            UpdateOperator::Decrement => BinaryOp::Sub,
        };
        let ty = self.types.get(u.id);
        let (old, member) = match u.target.as_ref() {
            Expression::Identifier(ident) => (self.load_identifier(ident, false), None),
            Expression::Member(m) => {
                let member = self.lower_member(m, true)?;
                (self.get_member(&member, self.types.get(m.id)), Some(member))
            }
            other => return Err(CompileError::syntax("Invalid update target", *other.span())),
        };
        let number = self.new_register(ty);
        self.emit(IrInstr::Coerce {
            dest: number,
            value: old,
            kind: Coercion::ToNumber,
        });
        let one = self.const_reg(IrConstant::Int(1));
        let speculation = self.speculation(u.id);
        let updated = self.new_register(ty);
        self.emit(IrInstr::Binary {
            dest: updated,
            op,
            left: number,
            right: one,
            speculation,
        });
        match (u.target.as_ref(), member) {
            (_, Some(member)) => self.set_member(&member, updated),
            (Expression::Identifier(ident), None) => self.store_identifier(ident, updated),
            _ => {}
        }
        Ok(if u.prefix { updated } else { number })
    }

    fn lower_logical(&mut self, l: &'a LogicalExpression) -> CompileResult<Register> {
        let dest = self.new_register(self.types.get(l.id));
        let left = self.lower_expression(&l.left)?;
        self.emit(IrInstr::Move { dest, src: left });
        let rhs = self.new_block("logical_rhs");
        let end = self.new_block("logical_end");
        let (then_block, else_block) = match l.operator {
            LogicalOperator::And => (rhs, end),
            LogicalOperator::Or => (end, rhs),
        };
        self.terminate(Terminator::Branch {
            cond: left,
            then_block,
            else_block,
        });
        self.switch_to(rhs);
        let right = self.lower_expression(&l.right)?;
        self.emit(IrInstr::Move { dest, src: right });
        self.terminate(Terminator::Jump(end));
        self.switch_to(end);
        Ok(dest)
    }

    fn lower_assignment(&mut self, a: &'a AssignmentExpression) -> CompileResult<Register> {
        let Some(operator) = a.operator.binary_operator() else {
            return match a.target.as_ref() {
                Expression::Identifier(ident) => {
                    let value = self.lower_expression(&a.value)?;
                    self.store_identifier(ident, value);
                    Ok(value)
                }
                Expression::Member(m) => {
                    let member = self.lower_member(m, true)?;
                    let value = self.lower_expression(&a.value)?;
                    self.set_member(&member, value);
                    Ok(value)
                }
                other => Err(CompileError::syntax("Invalid assignment target", *other.span())),
            };
        };

        let op = binary_op(operator);
        let (old, member) = match a.target.as_ref() {
            Expression::Identifier(ident) => (self.load_identifier(ident, false), None),
            Expression::Member(m) => {
                let member = self.lower_member(m, true)?;
                (self.get_member(&member, self.types.get(m.id)), Some(member))
            }
            other => return Err(CompileError::syntax("Invalid assignment target", *other.span())),
        };
        let value = self.lower_expression(&a.value)?;
        let speculation = if op.is_arithmetic() { self.speculation(a.id) } else { None };
        let dest = self.new_register(self.types.get(a.id));
        self.emit(IrInstr::Binary {
            dest,
            op,
            left: old,
            right: value,
            speculation,
        });
        match (a.target.as_ref(), member) {
            (_, Some(member)) => self.set_member(&member, dest),
            (Expression::Identifier(ident), None) => self.store_identifier(ident, dest),
            _ => {}
        }
        Ok(dest)
    }

    // ========================================================================
    // Calls
    // ========================================================================

    fn lower_call(&mut self, c: &'a CallExpression) -> CompileResult<Register> {
        self.set_line(&c.span);
        let (callee, this) = match c.callee.as_ref() {
            Expression::Member(m) => {
                let member = self.lower_member(m, false)?;
                let function = self.get_member(&member, OptType::Generic);
                (function, Some(member.object()))
            }
            other => (self.lower_expression(other)?, None),
        };
        let args = self.lower_arguments(&c.arguments)?;
        self.set_line(&c.span);
        let site = self.site(SiteKind::Call);
        let dest = self.new_register(self.types.get(c.id));
        self.emit(IrInstr::Call {
            dest,
            callee,
            this,
            args,
            site,
        });
        Ok(dest)
    }

    // ========================================================================
    // Literals
    // ========================================================================

    fn lower_template(&mut self, t: &'a TemplateLiteral) -> CompileResult<Register> {
        let first = t.quasis.first().map(|q| self.string(*q)).unwrap_or_else(|| "".into());
        let mut acc = self.const_reg(IrConstant::String(first));
        for (i, e) in t.expressions.iter().enumerate() {
            let value = self.lower_expression(e)?;
            let text = self.new_register(OptType::String);
            self.emit(IrInstr::Coerce {
                dest: text,
                value,
                kind: Coercion::ToString,
            });
            acc = self.concat(acc, text);
            if let Some(quasi) = t.quasis.get(i + 1) {
                let quasi = self.string(*quasi);
                if !quasi.is_empty() {
                    let part = self.const_reg(IrConstant::String(quasi));
                    acc = self.concat(acc, part);
                }
            }
        }
        Ok(acc)
    }

    fn concat(&mut self, left: Register, right: Register) -> Register {
        let dest = self.new_register(OptType::String);
        self.emit(IrInstr::Binary {
            dest,
            op: BinaryOp::Add,
            left,
            right,
            speculation: None,
        });
        dest
    }

    fn property_key(&mut self, key: &PropertyName) -> Rc<str> {
        match key {
            PropertyName::Identifier(sym) | PropertyName::String(sym) => self.string(*sym),
            PropertyName::Number(n) => Rc::from(number_to_string(*n)),
        }
    }

    fn lower_object(&mut self, o: &'a ObjectExpression) -> CompileResult<Register> {
        let object = self.new_register(OptType::Object);
        self.emit(IrInstr::NewObject { dest: object });
        for property in &o.properties {
            let key = self.property_key(&property.key);
            match &property.value {
                PropertyValue::Init(e) => {
                    let value = self.lower_expression(e)?;
                    self.emit(IrInstr::DefineField { object, key, value });
                }
                PropertyValue::Getter(f) => {
                    let function = self.lower_function(f)?;
                    let getter = self.new_register(OptType::Object);
                    self.emit(IrInstr::MakeClosure { dest: getter, function });
                    self.emit(IrInstr::DefineAccessor {
                        object,
                        key,
                        getter: Some(getter),
                        setter: None,
                    });
                }
                PropertyValue::Setter(f) => {
                    let function = self.lower_function(f)?;
                    let setter = self.new_register(OptType::Object);
                    self.emit(IrInstr::MakeClosure { dest: setter, function });
                    self.emit(IrInstr::DefineAccessor {
                        object,
                        key,
                        getter: None,
                        setter: Some(setter),
                    });
                }
            }
        }
        Ok(object)
    }
}
