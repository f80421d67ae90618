//! Statement and function parsing.

use std::mem;

use rustc_hash::FxHashSet;

use super::{FunctionContext, Label, ParseError, Parser, STRICT_RESERVED};
use crate::parser::ast::*;
use crate::parser::interner::Symbol;
use crate::parser::token::{Span, Token};

impl<'a> Parser<'a> {
    /// Parse a statement list that may open with a directive prologue.
    ///
    /// A `"use strict"` directive switches the current function context to
    /// strict mode for the remainder of the list.
    pub(super) fn parse_directives_and_body(
        &mut self,
        end: impl Fn(&Parser<'a>) -> bool,
    ) -> Result<Vec<Statement>, ParseError> {
        let mut body = Vec::new();
        let mut in_prologue = true;
        while !end(self) && !self.at_eof() {
            let statement = self.parse_statement()?;
            if in_prologue {
                match &statement {
                    Statement::Expression(ExpressionStatement {
                        expression: Expression::String(literal),
                        ..
                    }) => {
                        let raw = self.raw_text(literal.span);
                        if raw == "'use strict'" || raw == "\"use strict\"" {
                            self.ctx.strict = true;
                        }
                    }
                    _ => in_prologue = false,
                }
            }
            body.push(statement);
        }
        Ok(body)
    }

    pub(super) fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        self.nested(|p| p.parse_statement_inner())
    }

    fn parse_statement_inner(&mut self) -> Result<Statement, ParseError> {
        let start = self.current_span();
        match self.current() {
            Token::LeftBrace => Ok(Statement::Block(self.parse_block()?)),
            Token::Var | Token::Let | Token::Const => {
                let declaration = self.parse_variable_declaration(true)?;
                self.consume_semicolon()?;
                Ok(Statement::Variable(VariableDeclaration {
                    span: self.span_from(start),
                    ..declaration
                }))
            }
            Token::Function => {
                let function = self.parse_function(FunctionKind::Declaration)?;
                Ok(Statement::Function(Box::new(function)))
            }
            Token::Semicolon => {
                self.advance()?;
                Ok(Statement::Empty(start))
            }
            Token::If => self.parse_if(),
            Token::For => self.parse_for(),
            Token::While => self.parse_while(),
            Token::Do => self.parse_do_while(),
            Token::Continue => self.parse_continue(),
            Token::Break => self.parse_break(),
            Token::Return => self.parse_return(),
            Token::With => self.parse_with(),
            Token::Switch => self.parse_switch(),
            Token::Throw => self.parse_throw(),
            Token::Try => self.parse_try(),
            Token::Debugger => {
                self.advance()?;
                self.consume_semicolon()?;
                Ok(Statement::Debugger(self.span_from(start)))
            }
            Token::Identifier(name) => {
                let name = *name;
                if matches!(self.peek()?, Token::Colon) {
                    self.parse_labeled(name)
                } else {
                    self.parse_expression_statement()
                }
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_expression_statement(&mut self) -> Result<Statement, ParseError> {
        let start = self.current_span();
        let expression = self.parse_expression(true)?;
        self.consume_semicolon()?;
        Ok(Statement::Expression(ExpressionStatement {
            expression,
            span: self.span_from(start),
        }))
    }

    pub(super) fn parse_block(&mut self) -> Result<BlockStatement, ParseError> {
        let start = self.expect(Token::LeftBrace)?;
        let mut body = Vec::new();
        while !self.check(&Token::RightBrace) && !self.at_eof() {
            body.push(self.parse_statement()?);
        }
        self.expect(Token::RightBrace)?;
        Ok(BlockStatement {
            body,
            id: self.next_id(),
            span: self.span_from(start),
        })
    }

    /// `var`/`let`/`const` declarator list without the terminator.
    fn parse_variable_declaration(&mut self, allow_in: bool) -> Result<VariableDeclaration, ParseError> {
        let start = self.current_span();
        let kind = match self.advance()?.token {
            Token::Let => VariableKind::Let,
            Token::Const => VariableKind::Const,
            _ => VariableKind::Var,
        };
        let mut declarations = Vec::new();
        loop {
            let decl_start = self.current_span();
            let name = self.parse_binding_identifier()?;
            let init = if self.eat(&Token::Equal)? {
                Some(self.parse_assignment(allow_in)?)
            } else {
                None
            };
            // `for (const k in o)` is the one place a const has no initializer.
            let in_for_in_head = !allow_in && self.check(&Token::In);
            if kind == VariableKind::Const && init.is_none() && !in_for_in_head {
                return Err(ParseError::invalid_syntax(
                    "Missing initializer in const declaration",
                    name.span,
                ));
            }
            declarations.push(VariableDeclarator {
                name,
                init,
                span: self.span_from(decl_start),
            });
            if !self.eat(&Token::Comma)? {
                break;
            }
        }
        Ok(VariableDeclaration {
            kind,
            declarations,
            span: self.span_from(start),
        })
    }

    // ========================================================================
    // Functions
    // ========================================================================

    /// `function name? (params) { body }`
    pub(super) fn parse_function(&mut self, kind: FunctionKind) -> Result<FunctionNode, ParseError> {
        let start = self.expect(Token::Function)?;
        let name = if matches!(self.current(), Token::Identifier(_)) {
            Some(self.parse_identifier()?)
        } else if kind == FunctionKind::Declaration {
            return Err(self.unexpected_token(vec![]).with_suggestion("Function declarations need a name"));
        } else {
            None
        };
        self.parse_function_rest(kind, name, start)
    }

    /// Parameter list and body; strictness checks on the name and
    /// parameters run once the body's own directives are known.
    pub(super) fn parse_function_rest(
        &mut self,
        kind: FunctionKind,
        name: Option<Identifier>,
        start: Span,
    ) -> Result<FunctionNode, ParseError> {
        self.expect(Token::LeftParen)?;
        let mut params = Vec::new();
        if !self.check(&Token::RightParen) {
            loop {
                params.push(self.parse_identifier()?);
                if !self.eat(&Token::Comma)? {
                    break;
                }
            }
        }
        self.expect(Token::RightParen)?;
        self.expect(Token::LeftBrace)?;

        let inner = FunctionContext {
            strict: self.ctx.strict,
            in_function: true,
            ..FunctionContext::default()
        };
        let saved = mem::replace(&mut self.ctx, inner);
        let parsed = self
            .nested(|p| p.parse_directives_and_body(|p| p.check(&Token::RightBrace)))
            .and_then(|body| {
                if self.strict() {
                    self.check_strict_signature(name.as_ref(), &params)?;
                }
                Ok(body)
            });
        let strict = self.ctx.strict;
        self.ctx = saved;
        let body = parsed?;
        self.expect(Token::RightBrace)?;

        Ok(FunctionNode {
            kind,
            name,
            params,
            body,
            strict,
            id: self.next_id(),
            span: self.span_from(start),
        })
    }

    fn check_strict_signature(&self, name: Option<&Identifier>, params: &[Identifier]) -> Result<(), ParseError> {
        if let Some(name) = name {
            self.check_binding_name(name)?;
            self.check_reserved(name.name, name.span)?;
        }
        let mut seen = FxHashSet::default();
        for param in params {
            self.check_binding_name(param)?;
            let text = self.interner.resolve(param.name);
            if STRICT_RESERVED.contains(text) {
                return Err(ParseError::strict_mode(format!("Reserved word '{}'", text), param.span));
            }
            if !seen.insert(param.name) {
                return Err(ParseError::strict_mode(
                    format!("Duplicate parameter '{}'", text),
                    param.span,
                ));
            }
        }
        Ok(())
    }

    // ========================================================================
    // Control flow
    // ========================================================================

    fn parse_if(&mut self) -> Result<Statement, ParseError> {
        let start = self.expect(Token::If)?;
        self.expect(Token::LeftParen)?;
        let test = self.parse_expression(true)?;
        self.expect(Token::RightParen)?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.eat(&Token::Else)? {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Statement::If(IfStatement {
            test,
            consequent,
            alternate,
            span: self.span_from(start),
        }))
    }

    fn parse_loop_body(&mut self) -> Result<Box<Statement>, ParseError> {
        self.ctx.loop_depth += 1;
        self.ctx.breakable_depth += 1;
        let body = self.parse_statement();
        self.ctx.loop_depth -= 1;
        self.ctx.breakable_depth -= 1;
        Ok(Box::new(body?))
    }

    fn parse_for(&mut self) -> Result<Statement, ParseError> {
        let start = self.expect(Token::For)?;
        self.expect(Token::LeftParen)?;

        let init = match self.current() {
            Token::Semicolon => None,
            Token::Var | Token::Let | Token::Const => {
                let declaration = self.parse_variable_declaration(false)?;
                if self.check(&Token::In) {
                    if declaration.declarations.len() != 1 {
                        return Err(ParseError::invalid_syntax(
                            "Only one variable may be declared in a for-in head",
                            declaration.span,
                        ));
                    }
                    if declaration.declarations[0].init.is_some() {
                        return Err(ParseError::invalid_syntax(
                            "for-in variable may not have an initializer",
                            declaration.span,
                        ));
                    }
                    return self.parse_for_in_rest(ForInTarget::Variable(declaration), start);
                }
                Some(ForInit::Variable(declaration))
            }
            _ => {
                let expression = self.parse_expression(false)?;
                if self.check(&Token::In) {
                    if !matches!(expression, Expression::Identifier(_) | Expression::Member(_)) {
                        return Err(ParseError::invalid_syntax(
                            "Invalid left-hand side in for-in",
                            *expression.span(),
                        ));
                    }
                    return self.parse_for_in_rest(ForInTarget::Expression(expression), start);
                }
                Some(ForInit::Expression(expression))
            }
        };

        self.expect(Token::Semicolon)?;
        let test = if self.check(&Token::Semicolon) {
            None
        } else {
            Some(self.parse_expression(true)?)
        };
        self.expect(Token::Semicolon)?;
        let update = if self.check(&Token::RightParen) {
            None
        } else {
            Some(self.parse_expression(true)?)
        };
        self.expect(Token::RightParen)?;
        let body = self.parse_loop_body()?;
        Ok(Statement::For(ForStatement {
            init,
            test,
            update,
            body,
            id: self.next_id(),
            span: self.span_from(start),
        }))
    }

    fn parse_for_in_rest(&mut self, left: ForInTarget, start: Span) -> Result<Statement, ParseError> {
        self.expect(Token::In)?;
        let right = self.parse_expression(true)?;
        self.expect(Token::RightParen)?;
        let body = self.parse_loop_body()?;
        Ok(Statement::ForIn(ForInStatement {
            left,
            right,
            body,
            id: self.next_id(),
            span: self.span_from(start),
        }))
    }

    fn parse_while(&mut self) -> Result<Statement, ParseError> {
        let start = self.expect(Token::While)?;
        self.expect(Token::LeftParen)?;
        let test = self.parse_expression(true)?;
        self.expect(Token::RightParen)?;
        let body = self.parse_loop_body()?;
        Ok(Statement::While(WhileStatement {
            test,
            body,
            span: self.span_from(start),
        }))
    }

    fn parse_do_while(&mut self) -> Result<Statement, ParseError> {
        let start = self.expect(Token::Do)?;
        let body = self.parse_loop_body()?;
        self.expect(Token::While)?;
        self.expect(Token::LeftParen)?;
        let test = self.parse_expression(true)?;
        self.expect(Token::RightParen)?;
        // The terminating semicolon of do-while is always optional.
        self.eat(&Token::Semicolon)?;
        Ok(Statement::DoWhile(DoWhileStatement {
            body,
            test,
            span: self.span_from(start),
        }))
    }

    /// Optional label after `break`/`continue` on the same line.
    fn parse_jump_label(&mut self) -> Result<Option<(Symbol, Span)>, ParseError> {
        match self.current() {
            Token::Identifier(name) if !self.newline_before() => {
                let name = *name;
                let span = self.advance()?.span;
                Ok(Some((name, span)))
            }
            _ => Ok(None),
        }
    }

    fn parse_continue(&mut self) -> Result<Statement, ParseError> {
        let start = self.expect(Token::Continue)?;
        let label = self.parse_jump_label()?;
        match label {
            Some((name, span)) => {
                let target = self.ctx.labels.iter().rev().find(|l| l.name == name);
                match target {
                    Some(l) if l.is_loop => {}
                    Some(_) => {
                        return Err(ParseError::invalid_syntax(
                            format!("Label '{}' does not name a loop", self.interner.resolve(name)),
                            span,
                        ))
                    }
                    None => {
                        return Err(ParseError::invalid_syntax(
                            format!("Undefined label '{}'", self.interner.resolve(name)),
                            span,
                        ))
                    }
                }
            }
            None if self.ctx.loop_depth == 0 => {
                return Err(ParseError::invalid_syntax("Illegal continue statement", start));
            }
            None => {}
        }
        self.consume_semicolon()?;
        Ok(Statement::Continue(ContinueStatement {
            label: label.map(|(name, _)| name),
            span: self.span_from(start),
        }))
    }

    fn parse_break(&mut self) -> Result<Statement, ParseError> {
        let start = self.expect(Token::Break)?;
        let label = self.parse_jump_label()?;
        match label {
            Some((name, span)) => {
                if !self.ctx.labels.iter().any(|l| l.name == name) {
                    return Err(ParseError::invalid_syntax(
                        format!("Undefined label '{}'", self.interner.resolve(name)),
                        span,
                    ));
                }
            }
            None if self.ctx.breakable_depth == 0 => {
                return Err(ParseError::invalid_syntax("Illegal break statement", start));
            }
            None => {}
        }
        self.consume_semicolon()?;
        Ok(Statement::Break(BreakStatement {
            label: label.map(|(name, _)| name),
            span: self.span_from(start),
        }))
    }

    fn parse_return(&mut self) -> Result<Statement, ParseError> {
        let start = self.expect(Token::Return)?;
        if !self.ctx.in_function {
            return Err(ParseError::invalid_syntax("Illegal return statement", start));
        }
        let argument = if self.check(&Token::Semicolon)
            || self.check(&Token::RightBrace)
            || self.at_eof()
            || self.newline_before()
        {
            None
        } else {
            Some(self.parse_expression(true)?)
        };
        self.consume_semicolon()?;
        Ok(Statement::Return(ReturnStatement {
            argument,
            span: self.span_from(start),
        }))
    }

    fn parse_with(&mut self) -> Result<Statement, ParseError> {
        let start = self.expect(Token::With)?;
        if self.strict() {
            return Err(ParseError::strict_mode("'with' statement", start));
        }
        self.expect(Token::LeftParen)?;
        let object = self.parse_expression(true)?;
        self.expect(Token::RightParen)?;
        let body = Box::new(self.parse_statement()?);
        Ok(Statement::With(WithStatement {
            object,
            body,
            id: self.next_id(),
            span: self.span_from(start),
        }))
    }

    fn parse_switch(&mut self) -> Result<Statement, ParseError> {
        let start = self.expect(Token::Switch)?;
        self.expect(Token::LeftParen)?;
        let discriminant = self.parse_expression(true)?;
        self.expect(Token::RightParen)?;
        self.expect(Token::LeftBrace)?;

        self.ctx.breakable_depth += 1;
        let cases = self.parse_switch_cases();
        self.ctx.breakable_depth -= 1;
        let cases = cases?;

        self.expect(Token::RightBrace)?;
        Ok(Statement::Switch(SwitchStatement {
            discriminant,
            cases,
            id: self.next_id(),
            span: self.span_from(start),
        }))
    }

    fn parse_switch_cases(&mut self) -> Result<Vec<SwitchCase>, ParseError> {
        let mut cases = Vec::new();
        let mut seen_default = false;
        while !self.check(&Token::RightBrace) {
            let case_start = self.current_span();
            let test = if self.eat(&Token::Case)? {
                Some(self.parse_expression(true)?)
            } else if self.eat(&Token::Default)? {
                if seen_default {
                    return Err(ParseError::invalid_syntax(
                        "More than one default clause in switch statement",
                        case_start,
                    ));
                }
                seen_default = true;
                None
            } else {
                return Err(self.unexpected_token(vec![Token::Case, Token::Default, Token::RightBrace]));
            };
            self.expect(Token::Colon)?;
            let mut consequent = Vec::new();
            while !matches!(self.current(), Token::Case | Token::Default | Token::RightBrace | Token::Eof) {
                consequent.push(self.parse_statement()?);
            }
            cases.push(SwitchCase {
                test,
                consequent,
                span: self.span_from(case_start),
            });
        }
        Ok(cases)
    }

    fn parse_throw(&mut self) -> Result<Statement, ParseError> {
        let start = self.expect(Token::Throw)?;
        if self.newline_before() {
            return Err(ParseError::invalid_syntax("Illegal newline after throw", self.current_span()));
        }
        let argument = self.parse_expression(true)?;
        self.consume_semicolon()?;
        Ok(Statement::Throw(ThrowStatement {
            argument,
            span: self.span_from(start),
        }))
    }

    fn parse_try(&mut self) -> Result<Statement, ParseError> {
        let start = self.expect(Token::Try)?;
        let block = self.parse_block()?;

        let handler = if self.check(&Token::Catch) {
            let catch_start = self.advance()?.span;
            self.expect(Token::LeftParen)?;
            let param = self.parse_binding_identifier()?;
            self.expect(Token::RightParen)?;
            let body = self.parse_block()?;
            Some(CatchClause {
                param,
                body,
                id: self.next_id(),
                span: self.span_from(catch_start),
            })
        } else {
            None
        };
        let finalizer = if self.eat(&Token::Finally)? {
            Some(self.parse_block()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(self.unexpected_token(vec![Token::Catch, Token::Finally]));
        }
        Ok(Statement::Try(TryStatement {
            block,
            handler,
            finalizer,
            span: self.span_from(start),
        }))
    }

    fn parse_labeled(&mut self, name: Symbol) -> Result<Statement, ParseError> {
        let start = self.advance()?.span;
        self.expect(Token::Colon)?;
        if self.ctx.labels.iter().any(|l| l.name == name) {
            return Err(ParseError::invalid_syntax(
                format!("Label '{}' has already been declared", self.interner.resolve(name)),
                start,
            ));
        }
        let is_loop = matches!(self.current(), Token::For | Token::While | Token::Do);
        self.ctx.labels.push(Label { name, is_loop });
        let body = self.parse_statement();
        self.ctx.labels.pop();
        Ok(Statement::Labeled(LabeledStatement {
            label: name,
            body: Box::new(body?),
            span: self.span_from(start),
        }))
    }
}
