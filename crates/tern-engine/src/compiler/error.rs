//! Compilation errors

use thiserror::Error;

use crate::analysis::ResolveError;
use crate::parser::{ParseError, Span};

pub type CompileResult<T> = Result<T, CompileError>;

/// Error class a failed compilation reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompileErrorKind {
    Syntax,
    Reference,
}

impl CompileErrorKind {
    /// Name of the matching script error constructor.
    pub fn name(self) -> &'static str {
        match self {
            CompileErrorKind::Syntax => "SyntaxError",
            CompileErrorKind::Reference => "ReferenceError",
        }
    }
}

/// A fatal compile-time error. No partial result accompanies it.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}: {message} (line {line}, column {column})", kind.name())]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub message: String,
    pub line: u32,
    pub column: u32,
    /// Byte range in the source, for rendering
    pub span: Span,
    pub suggestion: Option<String>,
}

impl CompileError {
    pub fn new(kind: CompileErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            line: span.line,
            column: span.column,
            span,
            suggestion: None,
        }
    }

    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        Self::new(CompileErrorKind::Syntax, message, span)
    }

    pub fn reference(message: impl Into<String>, span: Span) -> Self {
        Self::new(CompileErrorKind::Reference, message, span)
    }
}

impl From<ParseError> for CompileError {
    fn from(err: ParseError) -> Self {
        let mut error = CompileError::syntax(err.message, err.span);
        error.suggestion = err.suggestion;
        error
    }
}

impl From<ResolveError> for CompileError {
    fn from(err: ResolveError) -> Self {
        let span = err.span();
        match err {
            ResolveError::Redeclaration { .. } => CompileError::syntax(err.to_string(), span),
            ResolveError::TemporalDeadZone { .. } | ResolveError::ConstAssignment { .. } => {
                CompileError::reference(err.to_string(), span)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_error_kinds() {
        let span = Span::new(4, 5, 2, 3);
        let tdz: CompileError = ResolveError::TemporalDeadZone {
            name: "x".to_string(),
            span,
        }
        .into();
        assert_eq!(tdz.kind, CompileErrorKind::Reference);
        assert_eq!((tdz.line, tdz.column), (2, 3));

        let redecl: CompileError = ResolveError::Redeclaration {
            name: "x".to_string(),
            span,
        }
        .into();
        assert_eq!(redecl.kind, CompileErrorKind::Syntax);
    }

    #[test]
    fn test_display_includes_position() {
        let err = CompileError::syntax("Unexpected token", Span::new(0, 1, 3, 7));
        assert_eq!(err.to_string(), "SyntaxError: Unexpected token (line 3, column 7)");
    }
}
