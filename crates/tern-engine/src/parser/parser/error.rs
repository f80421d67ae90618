use std::fmt;

use crate::parser::lexer::LexError;
use crate::parser::token::{Span, Token};

/// Why a source text was rejected before any code was generated.
///
/// Every variant becomes a `SyntaxError` once it reaches the embedder; the
/// kind is kept for tests and for choosing a help line in diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    Lexical(LexError),
    UnexpectedToken { expected: Vec<Token>, found: Token },
    UnexpectedEnd { expected: Vec<Token> },
    Invalid,
    /// Sloppy-only construct (`with`, legacy octal, duplicate parameter...)
    /// met inside strict code.
    StrictMode { construct: String },
    /// Expression or statement nesting went past `max_parse_depth`.
    TooDeep,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
    pub message: String,
    pub suggestion: Option<String>,
}

fn quoted(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| format!("'{}'", t))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ParseError {
    fn at(kind: ParseErrorKind, span: Span, message: String) -> Self {
        ParseError {
            kind,
            span,
            message,
            suggestion: None,
        }
    }

    pub fn unexpected_token(expected: Vec<Token>, found: Token, span: Span) -> Self {
        let message = match expected.len() {
            0 => format!("Unexpected token '{}'", found),
            1 => format!("Expected {}, found '{}'", quoted(&expected), found),
            _ => format!("Expected one of {}, found '{}'", quoted(&expected), found),
        };
        Self::at(ParseErrorKind::UnexpectedToken { expected, found }, span, message)
    }

    pub fn unexpected_eof(expected: Vec<Token>, span: Span) -> Self {
        let message = if expected.len() == 1 {
            format!("Unexpected end of input, expected {}", quoted(&expected))
        } else {
            "Unexpected end of input".to_string()
        };
        Self::at(ParseErrorKind::UnexpectedEnd { expected }, span, message)
    }

    pub fn invalid_syntax(reason: impl Into<String>, span: Span) -> Self {
        Self::at(ParseErrorKind::Invalid, span, reason.into())
    }

    pub fn strict_mode(construct: impl Into<String>, span: Span) -> Self {
        let construct = construct.into();
        let message = format!("{} is not allowed in strict mode", construct);
        Self::at(ParseErrorKind::StrictMode { construct }, span, message)
    }

    pub fn parser_limit_exceeded(what: impl fmt::Display, span: Span) -> Self {
        Self::at(ParseErrorKind::TooDeep, span, format!("Parser limit exceeded: {}", what))
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        let span = *err.span();
        let mut error = Self::at(ParseErrorKind::Invalid, span, err.description());
        error.suggestion = err.hint();
        error.kind = ParseErrorKind::Lexical(err);
        error
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.message, self.span.line, self.span.column)
    }
}

impl std::error::Error for ParseError {}
