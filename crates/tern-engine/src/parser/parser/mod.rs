//! Recursive-descent parser.
//!
//! Tokens are pulled lazily from the [`Lexer`] through a small lookahead
//! buffer. The first syntax error aborts parsing; no partial tree is
//! returned.
//!
//! Strict mode is tracked per function: it is inherited from the enclosing
//! code or switched on by a `"use strict"` directive prologue.

mod error;
mod expr;
mod guards;
pub mod precedence;
mod stmt;

use std::collections::VecDeque;
use std::mem;

use once_cell::sync::Lazy;
use rustc_hash::FxHashSet;

pub use error::{ParseError, ParseErrorKind};

use crate::config::defaults;
use crate::parser::ast::{Identifier, NodeId, Program};
use crate::parser::interner::{Interner, Symbol};
use crate::parser::lexer::Lexer;
use crate::parser::token::{Span, Token, TokenData};

/// Words reserved only in strict mode code.
static STRICT_RESERVED: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        "implements",
        "interface",
        "package",
        "private",
        "protected",
        "public",
        "static",
        "yield",
    ]
    .into_iter()
    .collect()
});

/// A label in scope for `break`/`continue`.
#[derive(Debug, Clone)]
struct Label {
    name: Symbol,
    is_loop: bool,
}

/// Per-function parsing context, saved and restored around function bodies.
#[derive(Debug, Clone, Default)]
struct FunctionContext {
    strict: bool,
    in_function: bool,
    labels: Vec<Label>,
    loop_depth: usize,
    breakable_depth: usize,
}

/// Parser state.
pub struct Parser<'a> {
    source: &'a str,
    lexer: Lexer<'a>,
    lookahead: VecDeque<TokenData>,
    last_end: usize,
    interner: Interner,
    next_node: u32,
    depth: usize,
    max_depth: usize,
    ctx: FunctionContext,
}

impl<'a> Parser<'a> {
    /// Create a sloppy-mode parser with the default nesting limit.
    pub fn new(source: &'a str) -> Self {
        Self::with_options(source, false, defaults::DEFAULT_MAX_PARSE_DEPTH)
    }

    /// Create a parser, optionally treating the whole script as strict.
    pub fn with_options(source: &'a str, strict: bool, max_depth: usize) -> Self {
        Self {
            source,
            lexer: Lexer::new(source),
            lookahead: VecDeque::with_capacity(4),
            last_end: 0,
            interner: Interner::with_capacity(256),
            next_node: 0,
            depth: 0,
            max_depth,
            ctx: FunctionContext {
                strict,
                ..FunctionContext::default()
            },
        }
    }

    /// Parse a complete script.
    pub fn parse(mut self) -> Result<(Program, Interner), ParseError> {
        self.fill(1)?;
        let id = self.next_id();
        let start = self.current_span();
        let body = self.parse_directives_and_body(|p| p.at_eof())?;
        if !self.at_eof() {
            return Err(self.unexpected_token(vec![Token::Eof]));
        }
        let program = Program {
            body,
            strict: self.ctx.strict,
            id,
            span: self.span_from(start),
        };
        log::debug!(
            "parsed {} top-level statements ({} nodes, strict={})",
            program.len(),
            self.next_node,
            program.strict
        );
        Ok((program, self.interner))
    }

    // ========================================================================
    // Token access
    // ========================================================================

    /// Ensure at least `n` tokens are buffered.
    fn fill(&mut self, n: usize) -> Result<(), ParseError> {
        while self.lookahead.len() < n {
            if let Some(last) = self.lookahead.back() {
                if last.token == Token::Eof {
                    let eof = last.clone();
                    self.lookahead.push_back(eof);
                    continue;
                }
            }
            let token = self.lexer.next_token(&mut self.interner)?;
            self.lookahead.push_back(token);
        }
        Ok(())
    }

    fn current_data(&self) -> &TokenData {
        // The buffer always holds the current token after `fill(1)`.
        &self.lookahead[0]
    }

    fn current(&self) -> &Token {
        &self.current_data().token
    }

    fn current_span(&self) -> Span {
        self.current_data().span
    }

    fn newline_before(&self) -> bool {
        self.current_data().newline_before
    }

    /// Token after the current one.
    fn peek(&mut self) -> Result<&Token, ParseError> {
        self.fill(2)?;
        Ok(&self.lookahead[1].token)
    }

    fn advance(&mut self) -> Result<TokenData, ParseError> {
        let data = self
            .lookahead
            .pop_front()
            .ok_or_else(|| ParseError::unexpected_eof(vec![], Span::new(self.last_end, self.last_end, 0, 0)))?;
        self.last_end = data.span.end;
        self.fill(1)?;
        Ok(data)
    }

    /// Turn the current `/` or `/=` into a regex literal token. Anything
    /// buffered after it was lexed under the wrong assumption and is dropped.
    fn rescan_as_regex(&mut self) -> Result<(), ParseError> {
        let slash = self.current_data().clone();
        self.lookahead.clear();
        let regex = self.lexer.rescan_regex(&slash, &mut self.interner)?;
        self.lookahead.push_back(regex);
        Ok(())
    }

    fn check(&self, token: &Token) -> bool {
        mem::discriminant(self.current()) == mem::discriminant(token)
    }

    fn at_eof(&self) -> bool {
        matches!(self.current(), Token::Eof)
    }

    fn eat(&mut self, token: &Token) -> Result<bool, ParseError> {
        if self.check(token) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, token: Token) -> Result<Span, ParseError> {
        if self.check(&token) {
            Ok(self.advance()?.span)
        } else {
            Err(self.unexpected_token(vec![token]))
        }
    }

    fn unexpected_token(&self, expected: Vec<Token>) -> ParseError {
        if self.at_eof() {
            ParseError::unexpected_eof(expected, self.current_span())
        } else {
            ParseError::unexpected_token(expected, self.current().clone(), self.current_span())
        }
    }

    /// Consume a statement terminator, applying automatic semicolon insertion.
    fn consume_semicolon(&mut self) -> Result<(), ParseError> {
        if self.eat(&Token::Semicolon)? {
            return Ok(());
        }
        if self.check(&Token::RightBrace) || self.at_eof() || self.newline_before() {
            return Ok(());
        }
        Err(self.unexpected_token(vec![Token::Semicolon]))
    }

    /// Span from `start` through the end of the last consumed token.
    fn span_from(&self, start: Span) -> Span {
        Span::new(start.start, self.last_end.max(start.start), start.line, start.column)
    }

    fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        id
    }

    fn strict(&self) -> bool {
        self.ctx.strict
    }

    // ========================================================================
    // Identifiers
    // ========================================================================

    /// Parse an identifier in reference or binding position.
    fn parse_identifier(&mut self) -> Result<Identifier, ParseError> {
        match self.current().clone() {
            Token::Identifier(name) => {
                let span = self.advance()?.span;
                self.check_reserved(name, span)?;
                Ok(Identifier {
                    name,
                    id: self.next_id(),
                    span,
                })
            }
            Token::Eof => Err(ParseError::unexpected_eof(vec![], self.current_span())),
            other => Err(ParseError::invalid_syntax(
                format!("Expected identifier, found '{}'", other),
                self.current_span(),
            )),
        }
    }

    /// Parse a name that declares a binding; `eval` and `arguments` are
    /// rejected in strict code.
    fn parse_binding_identifier(&mut self) -> Result<Identifier, ParseError> {
        let ident = self.parse_identifier()?;
        self.check_binding_name(&ident)?;
        Ok(ident)
    }

    fn check_binding_name(&self, ident: &Identifier) -> Result<(), ParseError> {
        if self.strict() && self.is_eval_or_arguments(ident.name) {
            return Err(ParseError::strict_mode(
                format!("Binding '{}'", self.interner.resolve(ident.name)),
                ident.span,
            ));
        }
        Ok(())
    }

    fn check_reserved(&self, name: Symbol, span: Span) -> Result<(), ParseError> {
        let text = self.interner.resolve(name);
        if self.strict() && STRICT_RESERVED.contains(text) {
            return Err(ParseError::strict_mode(format!("Reserved word '{}'", text), span));
        }
        Ok(())
    }

    fn is_eval_or_arguments(&self, name: Symbol) -> bool {
        matches!(self.interner.resolve(name), "eval" | "arguments")
    }

    /// Property names accept identifiers and every reserved word.
    fn parse_property_identifier(&mut self) -> Result<(Symbol, Span), ParseError> {
        let token = self.current().clone();
        let name = match &token {
            Token::Identifier(name) => *name,
            other => match other.keyword_text() {
                Some(text) => self.interner.intern(text),
                None => return Err(self.unexpected_token(vec![])),
            },
        };
        let span = self.advance()?.span;
        Ok((name, span))
    }

    /// Raw source text of a span, used for directive detection.
    fn raw_text(&self, span: Span) -> &'a str {
        span.slice(self.source)
    }
}
