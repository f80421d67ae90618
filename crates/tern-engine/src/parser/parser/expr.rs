//! Expression parsing: precedence climbing over binary operators plus
//! dedicated productions for assignment, conditional, unary and
//! call/member chains.

use std::mem;

use super::precedence::{binary_operator, get_precedence, Precedence};
use super::{ParseError, Parser};
use crate::parser::ast::*;
use crate::parser::lexer::Lexer;
use crate::parser::token::{Span, TemplatePart, Token};

impl<'a> Parser<'a> {
    /// Expression, including the comma operator.
    pub(super) fn parse_expression(&mut self, allow_in: bool) -> Result<Expression, ParseError> {
        let start = self.current_span();
        let first = self.parse_assignment(allow_in)?;
        if !self.check(&Token::Comma) {
            return Ok(first);
        }
        let mut expressions = vec![first];
        while self.eat(&Token::Comma)? {
            expressions.push(self.parse_assignment(allow_in)?);
        }
        Ok(Expression::Sequence(SequenceExpression {
            expressions,
            id: self.next_id(),
            span: self.span_from(start),
        }))
    }

    pub(super) fn parse_assignment(&mut self, allow_in: bool) -> Result<Expression, ParseError> {
        self.nested(|p| p.parse_assignment_inner(allow_in))
    }

    fn parse_assignment_inner(&mut self, allow_in: bool) -> Result<Expression, ParseError> {
        let start = self.current_span();
        let target = self.parse_conditional(allow_in)?;

        let operator = match self.current() {
            Token::Equal => AssignmentOperator::Assign,
            Token::PlusEqual => AssignmentOperator::AddAssign,
            Token::MinusEqual => AssignmentOperator::SubAssign,
            Token::StarEqual => AssignmentOperator::MulAssign,
            Token::SlashEqual => AssignmentOperator::DivAssign,
            Token::PercentEqual => AssignmentOperator::ModAssign,
            Token::AmpEqual => AssignmentOperator::AndAssign,
            Token::PipeEqual => AssignmentOperator::OrAssign,
            Token::CaretEqual => AssignmentOperator::XorAssign,
            Token::LessLessEqual => AssignmentOperator::LeftShiftAssign,
            Token::GreaterGreaterEqual => AssignmentOperator::RightShiftAssign,
            Token::GreaterGreaterGreaterEqual => AssignmentOperator::UnsignedRightShiftAssign,
            _ => return Ok(target),
        };
        self.check_assignment_target(&target)?;
        self.advance()?;
        let value = self.parse_assignment(allow_in)?;
        Ok(Expression::Assignment(AssignmentExpression {
            operator,
            target: Box::new(target),
            value: Box::new(value),
            id: self.next_id(),
            span: self.span_from(start),
        }))
    }

    fn check_assignment_target(&self, target: &Expression) -> Result<(), ParseError> {
        match target {
            Expression::Identifier(ident) => {
                if self.strict() && self.is_eval_or_arguments(ident.name) {
                    return Err(ParseError::strict_mode(
                        format!("Assignment to '{}'", self.interner.resolve(ident.name)),
                        ident.span,
                    ));
                }
                Ok(())
            }
            Expression::Member(_) => Ok(()),
            other => Err(ParseError::invalid_syntax("Invalid assignment target", *other.span())),
        }
    }

    fn parse_conditional(&mut self, allow_in: bool) -> Result<Expression, ParseError> {
        let start = self.current_span();
        let test = self.parse_binary(Precedence::LogicalOr as u8, allow_in)?;
        if !self.eat(&Token::Question)? {
            return Ok(test);
        }
        let consequent = self.parse_assignment(true)?;
        self.expect(Token::Colon)?;
        let alternate = self.parse_assignment(allow_in)?;
        Ok(Expression::Conditional(ConditionalExpression {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
            id: self.next_id(),
            span: self.span_from(start),
        }))
    }

    /// Precedence climbing over binary and logical operators.
    fn parse_binary(&mut self, min: u8, allow_in: bool) -> Result<Expression, ParseError> {
        let start = self.current_span();
        let mut left = self.parse_unary()?;
        loop {
            let precedence = get_precedence(self.current(), allow_in);
            if precedence == Precedence::None || (precedence as u8) < min {
                break;
            }
            let token = self.advance()?.token;
            let right = self.nested(|p| p.parse_binary(precedence.tighter(), allow_in))?;
            let span = self.span_from(start);
            let id = self.next_id();
            left = match token {
                Token::AmpAmp | Token::PipePipe => Expression::Logical(LogicalExpression {
                    operator: if token == Token::AmpAmp {
                        LogicalOperator::And
                    } else {
                        LogicalOperator::Or
                    },
                    left: Box::new(left),
                    right: Box::new(right),
                    id,
                    span,
                }),
                other => {
                    let operator = binary_operator(&other)
                        .ok_or_else(|| ParseError::invalid_syntax("Expected binary operator", span))?;
                    Expression::Binary(BinaryExpression {
                        operator,
                        left: Box::new(left),
                        right: Box::new(right),
                        id,
                        span,
                    })
                }
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        let start = self.current_span();
        let operator = match self.current() {
            Token::Plus => UnaryOperator::Plus,
            Token::Minus => UnaryOperator::Minus,
            Token::Bang => UnaryOperator::Not,
            Token::Tilde => UnaryOperator::BitwiseNot,
            Token::Typeof => UnaryOperator::Typeof,
            Token::Void => UnaryOperator::Void,
            Token::Delete => UnaryOperator::Delete,
            Token::PlusPlus | Token::MinusMinus => {
                let operator = if self.check(&Token::PlusPlus) {
                    UpdateOperator::Increment
                } else {
                    UpdateOperator::Decrement
                };
                self.advance()?;
                let target = self.nested(|p| p.parse_unary())?;
                self.check_update_target(&target)?;
                return Ok(Expression::Update(UpdateExpression {
                    operator,
                    prefix: true,
                    target: Box::new(target),
                    id: self.next_id(),
                    span: self.span_from(start),
                }));
            }
            _ => return self.parse_postfix(),
        };
        self.advance()?;
        let operand = self.nested(|p| p.parse_unary())?;
        if operator == UnaryOperator::Delete && self.strict() {
            if let Expression::Identifier(ident) = &operand {
                return Err(ParseError::strict_mode("Deleting an unqualified identifier", ident.span));
            }
        }
        Ok(Expression::Unary(UnaryExpression {
            operator,
            operand: Box::new(operand),
            id: self.next_id(),
            span: self.span_from(start),
        }))
    }

    fn check_update_target(&self, target: &Expression) -> Result<(), ParseError> {
        match target {
            Expression::Identifier(_) | Expression::Member(_) => self.check_assignment_target(target),
            other => Err(ParseError::invalid_syntax(
                "Invalid left-hand side in update expression",
                *other.span(),
            )),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expression, ParseError> {
        let start = self.current_span();
        let expr = self.parse_call_member()?;
        // `a\n++b` is two statements: no postfix operator across a line break.
        if (self.check(&Token::PlusPlus) || self.check(&Token::MinusMinus)) && !self.newline_before() {
            self.check_update_target(&expr)?;
            let operator = if self.check(&Token::PlusPlus) {
                UpdateOperator::Increment
            } else {
                UpdateOperator::Decrement
            };
            self.advance()?;
            return Ok(Expression::Update(UpdateExpression {
                operator,
                prefix: false,
                target: Box::new(expr),
                id: self.next_id(),
                span: self.span_from(start),
            }));
        }
        Ok(expr)
    }

    // ========================================================================
    // Call / member / new
    // ========================================================================

    fn parse_call_member(&mut self) -> Result<Expression, ParseError> {
        let start = self.current_span();
        let mut expr = if self.check(&Token::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        loop {
            expr = match self.current() {
                Token::Dot | Token::LeftBracket => self.parse_member_suffix(expr, start)?,
                Token::LeftParen => {
                    let arguments = self.parse_arguments()?;
                    Expression::Call(CallExpression {
                        callee: Box::new(expr),
                        arguments,
                        id: self.next_id(),
                        span: self.span_from(start),
                    })
                }
                _ => return Ok(expr),
            };
        }
    }

    fn parse_member_suffix(&mut self, object: Expression, start: Span) -> Result<Expression, ParseError> {
        let property = if self.eat(&Token::Dot)? {
            let (name, span) = self.parse_property_identifier()?;
            MemberProperty::Named(name, span)
        } else {
            self.expect(Token::LeftBracket)?;
            let key = self.parse_expression(true)?;
            self.expect(Token::RightBracket)?;
            MemberProperty::Computed(Box::new(key))
        };
        Ok(Expression::Member(MemberExpression {
            object: Box::new(object),
            property,
            id: self.next_id(),
            span: self.span_from(start),
        }))
    }

    fn parse_new(&mut self) -> Result<Expression, ParseError> {
        self.nested(|p| {
            let start = p.expect(Token::New)?;
            let mut callee = if p.check(&Token::New) {
                p.parse_new()?
            } else {
                p.parse_primary()?
            };
            while p.check(&Token::Dot) || p.check(&Token::LeftBracket) {
                callee = p.parse_member_suffix(callee, start)?;
            }
            let arguments = if p.check(&Token::LeftParen) {
                p.parse_arguments()?
            } else {
                Vec::new()
            };
            Ok(Expression::New(NewExpression {
                callee: Box::new(callee),
                arguments,
                id: p.next_id(),
                span: p.span_from(start),
            }))
        })
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expression>, ParseError> {
        self.expect(Token::LeftParen)?;
        let mut arguments = Vec::new();
        if !self.check(&Token::RightParen) {
            loop {
                arguments.push(self.parse_assignment(true)?);
                if !self.eat(&Token::Comma)? {
                    break;
                }
            }
        }
        self.expect(Token::RightParen)?;
        Ok(arguments)
    }

    // ========================================================================
    // Primary expressions
    // ========================================================================

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        let start = self.current_span();
        match self.current().clone() {
            Token::Number { value, legacy_octal } => {
                if legacy_octal && self.strict() {
                    return Err(ParseError::strict_mode("Octal literal", start));
                }
                self.advance()?;
                Ok(Expression::Number(NumberLiteral {
                    value,
                    id: self.next_id(),
                    span: start,
                }))
            }
            Token::String { value, octal_escape } => {
                if octal_escape && self.strict() {
                    return Err(ParseError::strict_mode("Octal escape sequence", start));
                }
                self.advance()?;
                Ok(Expression::String(StringLiteral {
                    value,
                    id: self.next_id(),
                    span: start,
                }))
            }
            Token::Slash | Token::SlashEqual => {
                self.rescan_as_regex()?;
                self.parse_primary()
            }
            Token::RegExp { pattern, flags } => {
                self.advance()?;
                Ok(Expression::RegExp(RegExpLiteral {
                    pattern,
                    flags,
                    id: self.next_id(),
                    span: start,
                }))
            }
            Token::Template(parts) => {
                self.advance()?;
                self.parse_template(parts, start)
            }
            Token::True | Token::False => {
                let value = self.check(&Token::True);
                self.advance()?;
                Ok(Expression::Boolean(BooleanLiteral {
                    value,
                    id: self.next_id(),
                    span: start,
                }))
            }
            Token::Null => {
                self.advance()?;
                Ok(Expression::Null(NullLiteral {
                    id: self.next_id(),
                    span: start,
                }))
            }
            Token::This => {
                self.advance()?;
                Ok(Expression::This(ThisExpression {
                    id: self.next_id(),
                    span: start,
                }))
            }
            Token::Identifier(_) => Ok(Expression::Identifier(self.parse_identifier()?)),
            Token::LeftParen => {
                self.advance()?;
                let expr = self.nested(|p| p.parse_expression(true))?;
                self.expect(Token::RightParen)?;
                Ok(expr)
            }
            Token::LeftBracket => self.nested(|p| p.parse_array()),
            Token::LeftBrace => self.nested(|p| p.parse_object()),
            Token::Function => {
                let function = self.parse_function(FunctionKind::Expression)?;
                Ok(Expression::Function(Box::new(function)))
            }
            _ => Err(self.unexpected_token(vec![])),
        }
    }

    fn parse_array(&mut self) -> Result<Expression, ParseError> {
        let start = self.expect(Token::LeftBracket)?;
        let mut elements = Vec::new();
        loop {
            if self.check(&Token::RightBracket) {
                break;
            }
            if self.eat(&Token::Comma)? {
                elements.push(None);
                continue;
            }
            elements.push(Some(self.parse_assignment(true)?));
            if !self.eat(&Token::Comma)? {
                break;
            }
        }
        self.expect(Token::RightBracket)?;
        Ok(Expression::Array(ArrayExpression {
            elements,
            id: self.next_id(),
            span: self.span_from(start),
        }))
    }

    fn parse_object(&mut self) -> Result<Expression, ParseError> {
        let start = self.expect(Token::LeftBrace)?;
        let mut properties = Vec::new();
        while !self.check(&Token::RightBrace) {
            properties.push(self.parse_object_property()?);
            if !self.eat(&Token::Comma)? {
                break;
            }
        }
        self.expect(Token::RightBrace)?;
        Ok(Expression::Object(ObjectExpression {
            properties,
            id: self.next_id(),
            span: self.span_from(start),
        }))
    }

    fn parse_object_property(&mut self) -> Result<Property, ParseError> {
        let start = self.current_span();

        // `get name() {}` / `set name(v) {}`; a plain `get: 1` is a data property.
        if let Token::Identifier(sym) = self.current().clone() {
            let word = self.interner.resolve(sym);
            if word == "get" || word == "set" {
                let is_getter = word == "get";
                let next = self.peek()?.clone();
                let introduces_accessor = !matches!(
                    next,
                    Token::Colon | Token::LeftParen | Token::Comma | Token::RightBrace
                );
                if introduces_accessor {
                    self.advance()?;
                    let key = self.parse_property_name()?;
                    let kind = if is_getter {
                        FunctionKind::Getter
                    } else {
                        FunctionKind::Setter
                    };
                    let function = self.parse_function_rest(kind, None, start)?;
                    let expected_params = if is_getter { 0 } else { 1 };
                    if function.params.len() != expected_params {
                        return Err(ParseError::invalid_syntax(
                            if is_getter {
                                "Getter must not have parameters"
                            } else {
                                "Setter must have exactly one parameter"
                            },
                            function.span,
                        ));
                    }
                    let value = if is_getter {
                        PropertyValue::Getter(Box::new(function))
                    } else {
                        PropertyValue::Setter(Box::new(function))
                    };
                    return Ok(Property {
                        key,
                        value,
                        span: self.span_from(start),
                    });
                }
            }
        }

        let key = self.parse_property_name()?;
        self.expect(Token::Colon)?;
        let value = self.parse_assignment(true)?;
        Ok(Property {
            key,
            value: PropertyValue::Init(value),
            span: self.span_from(start),
        })
    }

    fn parse_property_name(&mut self) -> Result<PropertyName, ParseError> {
        match self.current().clone() {
            Token::String { value, octal_escape } => {
                if octal_escape && self.strict() {
                    return Err(ParseError::strict_mode("Octal escape sequence", self.current_span()));
                }
                self.advance()?;
                Ok(PropertyName::String(value))
            }
            Token::Number { value, legacy_octal } => {
                if legacy_octal && self.strict() {
                    return Err(ParseError::strict_mode("Octal literal", self.current_span()));
                }
                self.advance()?;
                Ok(PropertyName::Number(value))
            }
            _ => {
                let (name, _) = self.parse_property_identifier()?;
                Ok(PropertyName::Identifier(name))
            }
        }
    }

    /// Parse each `${...}` substitution by re-entering the lexer on its
    /// source range.
    fn parse_template(&mut self, parts: Vec<TemplatePart>, start: Span) -> Result<Expression, ParseError> {
        let mut quasis = Vec::new();
        let mut expressions = Vec::new();
        for part in parts {
            match part {
                TemplatePart::String(text) => quasis.push(text),
                TemplatePart::Substitution { start: from, end, line, column } => {
                    let nested_lexer = Lexer::at(self.source, from, end, line, column);
                    let saved_lexer = mem::replace(&mut self.lexer, nested_lexer);
                    let saved_lookahead = mem::take(&mut self.lookahead);
                    let saved_end = self.last_end;

                    let parsed = self.fill(1).and_then(|_| {
                        let expr = self.parse_expression(true)?;
                        if !self.at_eof() {
                            return Err(self.unexpected_token(vec![Token::RightBrace]));
                        }
                        Ok(expr)
                    });

                    self.lexer = saved_lexer;
                    self.lookahead = saved_lookahead;
                    self.last_end = saved_end;
                    expressions.push(parsed?);
                }
            }
        }
        Ok(Expression::Template(TemplateLiteral {
            quasis,
            expressions,
            id: self.next_id(),
            span: self.span_from(start),
        }))
    }
}
