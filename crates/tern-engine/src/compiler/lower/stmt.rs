//! Statement lowering

use super::control_flow::{ControlEntry, JumpTarget};
use super::Lowerer;
use crate::analysis::OptType;
use crate::compiler::error::{CompileError, CompileResult};
use crate::compiler::ir::{BasicBlockId, BinaryOp, Coercion, IrConstant, IrInstr, Terminator};
use crate::parser::ast::*;
use crate::parser::interner::Symbol;

impl<'a> Lowerer<'a> {
    pub(super) fn lower_statements(&mut self, statements: &'a [Statement]) -> CompileResult<()> {
        for statement in statements {
            self.lower_statement(statement)?;
        }
        Ok(())
    }

    pub(super) fn lower_statement(&mut self, statement: &'a Statement) -> CompileResult<()> {
        self.set_line(statement.span());
        match statement {
            Statement::Variable(decl) => self.lower_variable_declaration(decl),
            Statement::Function(f) => {
                if self.fb.hoisted.contains(&f.id) {
                    Ok(())
                } else {
                    self.declare_function(f)
                }
            }
            Statement::Expression(s) => {
                let value = self.lower_expression(&s.expression)?;
                if let Some(completion) = self.fb.completion {
                    self.emit(IrInstr::Move {
                        dest: completion,
                        src: value,
                    });
                }
                Ok(())
            }
            Statement::Block(b) => self.lower_block(b),
            Statement::Empty(_) | Statement::Debugger(_) => Ok(()),
            Statement::If(s) => self.lower_if(s),
            Statement::For(s) => self.lower_for(s, Vec::new()),
            Statement::ForIn(s) => self.lower_for_in(s, Vec::new()),
            Statement::While(s) => self.lower_while(s, Vec::new()),
            Statement::DoWhile(s) => self.lower_do_while(s, Vec::new()),
            Statement::Return(s) => {
                let value = match &s.argument {
                    Some(argument) => self.lower_expression(argument)?,
                    None => self.const_reg(IrConstant::Undefined),
                };
                if self.unwind_to(0)? {
                    self.terminate(Terminator::Return(value));
                }
                self.start_dead_block();
                Ok(())
            }
            Statement::Break(s) => {
                let target = self
                    .fb
                    .control
                    .break_target(s.label)
                    .ok_or_else(|| CompileError::syntax("Illegal break statement", s.span))?;
                self.jump_out(target, false)
            }
            Statement::Continue(s) => {
                let target = self
                    .fb
                    .control
                    .continue_target(s.label)
                    .ok_or_else(|| CompileError::syntax("Illegal continue statement", s.span))?;
                self.jump_out(target, true)
            }
            Statement::Throw(s) => {
                let value = self.lower_expression(&s.argument)?;
                self.terminate(Terminator::Throw(value));
                self.start_dead_block();
                Ok(())
            }
            Statement::Try(s) => self.lower_try(s),
            Statement::Switch(s) => self.lower_switch(s, Vec::new()),
            Statement::Labeled(s) => self.lower_labeled(s, Vec::new()),
            Statement::With(s) => {
                let object = self.lower_expression(&s.object)?;
                let coerced = self.new_register(OptType::Object);
                self.emit(IrInstr::Coerce {
                    dest: coerced,
                    value: object,
                    kind: Coercion::ToObject,
                });
                self.emit(IrInstr::EnterWith { object: coerced });
                self.fb.control.push(ControlEntry::With);
                self.lower_statement(&s.body)?;
                self.fb.control.pop();
                self.emit(IrInstr::ExitWith);
                Ok(())
            }
        }
    }

    pub(super) fn lower_block(&mut self, block: &'a BlockStatement) -> CompileResult<()> {
        self.reset_cells(block.id);
        self.hoist_functions(&block.body)?;
        self.lower_statements(&block.body)
    }

    fn lower_variable_declaration(&mut self, decl: &'a VariableDeclaration) -> CompileResult<()> {
        for d in &decl.declarations {
            let value = match &d.init {
                Some(init) => self.lower_expression(init)?,
                // `var x;` leaves the hoisted binding alone
                None if decl.kind == VariableKind::Var => continue,
                None => self.const_reg(IrConstant::Undefined),
            };
            let binding = self.binding_of(&d.name);
            let name = self.string(d.name.name);
            self.store_binding(&binding, name, value);
        }
        Ok(())
    }

    // ========================================================================
    // Unwinding
    // ========================================================================

    /// Emit the exits of every control entry above `depth`: pop handlers,
    /// inline `finally` bodies and leave `with` scopes. Returns false when a
    /// `finally` body ended control flow on its own.
    fn unwind_to(&mut self, depth: usize) -> CompileResult<bool> {
        let mut index = self.fb.control.len();
        while index > depth {
            index -= 1;
            match self.fb.control.get(index).cloned() {
                Some(ControlEntry::Handler) => self.emit(IrInstr::PopHandler),
                Some(ControlEntry::With) => self.emit(IrInstr::ExitWith),
                Some(ControlEntry::Finally { body }) => {
                    self.emit(IrInstr::PopHandler);
                    let above = self.fb.control.split_off(index);
                    let result = self.lower_block(body);
                    self.fb.control.restore(above);
                    result?;
                    if self.is_terminated() {
                        return Ok(false);
                    }
                }
                Some(ControlEntry::Loop { .. }) | Some(ControlEntry::Breakable { .. }) | None => {}
            }
        }
        Ok(true)
    }

    fn jump_out(&mut self, target: JumpTarget, back_edge: bool) -> CompileResult<()> {
        if self.unwind_to(target.depth + 1)? {
            self.terminate(if back_edge {
                Terminator::LoopBack(target.block)
            } else {
                Terminator::Jump(target.block)
            });
        }
        self.start_dead_block();
        Ok(())
    }

    // ========================================================================
    // Conditionals
    // ========================================================================

    fn lower_if(&mut self, s: &'a IfStatement) -> CompileResult<()> {
        let cond = self.lower_expression(&s.test)?;
        let then_block = self.new_block("if_then");
        let end = self.new_block("if_end");
        let else_block = if s.alternate.is_some() {
            self.new_block("if_else")
        } else {
            end
        };
        self.terminate(Terminator::Branch {
            cond,
            then_block,
            else_block,
        });
        self.switch_to(then_block);
        self.lower_statement(&s.consequent)?;
        self.terminate(Terminator::Jump(end));
        if let Some(alternate) = &s.alternate {
            self.switch_to(else_block);
            self.lower_statement(alternate)?;
            self.terminate(Terminator::Jump(end));
        }
        self.switch_to(end);
        Ok(())
    }

    fn lower_switch(&mut self, s: &'a SwitchStatement, labels: Vec<Symbol>) -> CompileResult<()> {
        let discriminant = self.lower_expression(&s.discriminant)?;
        let end = self.new_block("switch_end");
        self.reset_cells(s.id);
        for case in &s.cases {
            self.hoist_functions(&case.consequent)?;
        }
        let bodies: Vec<_> = s.cases.iter().map(|_| self.new_block("case")).collect();

        for (case, body) in s.cases.iter().zip(&bodies) {
            if let Some(test) = &case.test {
                let value = self.lower_expression(test)?;
                let matched = self.new_register(OptType::Boolean);
                self.emit(IrInstr::Binary {
                    dest: matched,
                    op: BinaryOp::StrictEq,
                    left: discriminant,
                    right: value,
                    speculation: None,
                });
                let next = self.new_block("case_test");
                self.terminate(Terminator::Branch {
                    cond: matched,
                    then_block: *body,
                    else_block: next,
                });
                self.switch_to(next);
            }
        }
        let fallback = s
            .cases
            .iter()
            .position(|c| c.test.is_none())
            .map_or(end, |i| bodies[i]);
        self.terminate(Terminator::Jump(fallback));

        self.fb.control.push(ControlEntry::Breakable {
            labels,
            break_block: end,
            unlabeled: true,
        });
        let mut result = Ok(());
        for (case, body) in s.cases.iter().zip(&bodies) {
            self.terminate(Terminator::Jump(*body));
            self.switch_to(*body);
            result = self.lower_statements(&case.consequent);
            if result.is_err() {
                break;
            }
        }
        self.fb.control.pop();
        result?;
        self.terminate(Terminator::Jump(end));
        self.switch_to(end);
        Ok(())
    }

    fn lower_labeled(&mut self, s: &'a LabeledStatement, mut labels: Vec<Symbol>) -> CompileResult<()> {
        labels.push(s.label);
        match s.body.as_ref() {
            Statement::Labeled(inner) => self.lower_labeled(inner, labels),
            Statement::For(inner) => self.lower_for(inner, labels),
            Statement::ForIn(inner) => self.lower_for_in(inner, labels),
            Statement::While(inner) => self.lower_while(inner, labels),
            Statement::DoWhile(inner) => self.lower_do_while(inner, labels),
            Statement::Switch(inner) => self.lower_switch(inner, labels),
            body => {
                let end = self.new_block("label_end");
                self.fb.control.push(ControlEntry::Breakable {
                    labels,
                    break_block: end,
                    unlabeled: false,
                });
                let result = self.lower_statement(body);
                self.fb.control.pop();
                result?;
                self.terminate(Terminator::Jump(end));
                self.switch_to(end);
                Ok(())
            }
        }
    }

    // ========================================================================
    // Loops
    // ========================================================================

    /// Lower a loop body with its control entry pushed.
    fn loop_body(
        &mut self,
        body: &'a Statement,
        labels: Vec<Symbol>,
        break_block: BasicBlockId,
        continue_block: BasicBlockId,
    ) -> CompileResult<()> {
        self.fb.control.push(ControlEntry::Loop {
            labels,
            break_block,
            continue_block,
        });
        let result = self.lower_statement(body);
        self.fb.control.pop();
        result
    }

    fn lower_for(&mut self, s: &'a ForStatement, labels: Vec<Symbol>) -> CompileResult<()> {
        self.reset_cells(s.id);
        match &s.init {
            Some(ForInit::Variable(decl)) => self.lower_variable_declaration(decl)?,
            Some(ForInit::Expression(e)) => {
                self.lower_expression(e)?;
            }
            None => {}
        }
        let test = self.new_block("for_test");
        let body = self.new_block("for_body");
        let update = self.new_block("for_update");
        let exit = self.new_block("for_exit");
        self.terminate(Terminator::Jump(test));

        self.switch_to(test);
        match &s.test {
            Some(cond) => {
                let cond = self.lower_expression(cond)?;
                self.terminate(Terminator::Branch {
                    cond,
                    then_block: body,
                    else_block: exit,
                });
            }
            None => self.terminate(Terminator::Jump(body)),
        }

        self.switch_to(body);
        self.loop_body(&s.body, labels, exit, update)?;
        self.terminate(Terminator::Jump(update));

        self.switch_to(update);
        if let Some(e) = &s.update {
            self.set_line(e.span());
            self.lower_expression(e)?;
        }
        self.terminate(Terminator::LoopBack(test));
        self.switch_to(exit);
        Ok(())
    }

    fn lower_for_in(&mut self, s: &'a ForInStatement, labels: Vec<Symbol>) -> CompileResult<()> {
        let object = self.lower_expression(&s.right)?;
        let iterator = self.new_register(OptType::Object);
        self.emit(IrInstr::ForInIterator { dest: iterator, object });
        self.reset_cells(s.id);

        let head = self.new_block("for_in_next");
        let body = self.new_block("for_in_body");
        let exit = self.new_block("for_in_exit");
        self.terminate(Terminator::Jump(head));

        self.switch_to(head);
        let key = self.new_register(OptType::String);
        let done = self.new_register(OptType::Boolean);
        self.emit(IrInstr::ForInNext { dest: key, done, iterator });
        self.terminate(Terminator::Branch {
            cond: done,
            then_block: exit,
            else_block: body,
        });

        self.switch_to(body);
        match &s.left {
            ForInTarget::Variable(decl) => {
                let Some(d) = decl.declarations.first() else {
                    return Err(CompileError::syntax("Missing for-in binding", decl.span));
                };
                let binding = self.binding_of(&d.name);
                let name = self.string(d.name.name);
                self.store_binding(&binding, name, key);
            }
            ForInTarget::Expression(target) => self.assign_to_target(target, key)?,
        }
        self.loop_body(&s.body, labels, exit, head)?;
        self.terminate(Terminator::LoopBack(head));
        self.switch_to(exit);
        Ok(())
    }

    fn lower_while(&mut self, s: &'a WhileStatement, labels: Vec<Symbol>) -> CompileResult<()> {
        let test = self.new_block("while_test");
        let body = self.new_block("while_body");
        let exit = self.new_block("while_exit");
        self.terminate(Terminator::Jump(test));

        self.switch_to(test);
        let cond = self.lower_expression(&s.test)?;
        self.terminate(Terminator::Branch {
            cond,
            then_block: body,
            else_block: exit,
        });

        self.switch_to(body);
        self.loop_body(&s.body, labels, exit, test)?;
        self.terminate(Terminator::LoopBack(test));
        self.switch_to(exit);
        Ok(())
    }

    fn lower_do_while(&mut self, s: &'a DoWhileStatement, labels: Vec<Symbol>) -> CompileResult<()> {
        let body = self.new_block("do_body");
        let test = self.new_block("do_test");
        let latch = self.new_block("do_latch");
        let exit = self.new_block("do_exit");
        self.terminate(Terminator::Jump(body));

        self.switch_to(body);
        self.loop_body(&s.body, labels, exit, test)?;
        self.terminate(Terminator::Jump(test));

        self.switch_to(test);
        self.set_line(s.test.span());
        let cond = self.lower_expression(&s.test)?;
        self.terminate(Terminator::Branch {
            cond,
            then_block: latch,
            else_block: exit,
        });
        self.switch_to(latch);
        self.terminate(Terminator::LoopBack(body));
        self.switch_to(exit);
        Ok(())
    }

    // ========================================================================
    // Exceptions
    // ========================================================================

    fn lower_try(&mut self, s: &'a TryStatement) -> CompileResult<()> {
        let end = self.new_block("try_end");
        let finally = match &s.finalizer {
            Some(body) => {
                let handler = self.new_block("finally_handler");
                let exception = self.new_register(OptType::Generic);
                self.emit(IrInstr::PushHandler {
                    catch_block: handler,
                    exception,
                });
                self.fb.control.push(ControlEntry::Finally { body });
                Some((body, handler, exception))
            }
            None => None,
        };

        match &s.handler {
            Some(clause) => self.lower_protected(&s.block, clause)?,
            None => self.lower_block(&s.block)?,
        }

        match finally {
            Some((body, handler, exception)) => {
                self.fb.control.pop();
                if !self.is_terminated() {
                    self.emit(IrInstr::PopHandler);
                    self.lower_block(body)?;
                    self.terminate(Terminator::Jump(end));
                }
                self.switch_to(handler);
                self.lower_block(body)?;
                self.terminate(Terminator::Throw(exception));
            }
            None => self.terminate(Terminator::Jump(end)),
        }
        self.switch_to(end);
        Ok(())
    }

    /// `try { block } catch (param) { body }`; leaves the current block at
    /// the join point after both.
    fn lower_protected(&mut self, block: &'a BlockStatement, clause: &'a CatchClause) -> CompileResult<()> {
        let catch_block = self.new_block("catch");
        let join = self.new_block("catch_end");
        let exception = self.new_register(OptType::Generic);
        self.emit(IrInstr::PushHandler { catch_block, exception });

        self.fb.control.push(ControlEntry::Handler);
        let result = self.lower_block(block);
        self.fb.control.pop();
        result?;
        self.emit(IrInstr::PopHandler);
        self.terminate(Terminator::Jump(join));

        self.switch_to(catch_block);
        self.set_line(&clause.span);
        self.reset_cells(clause.id);
        let binding = self.binding_of(&clause.param);
        let name = self.string(clause.param.name);
        self.store_binding(&binding, name, exception);
        self.lower_block(&clause.body)?;
        self.terminate(Terminator::Jump(join));
        self.switch_to(join);
        Ok(())
    }
}
