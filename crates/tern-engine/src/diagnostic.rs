//! Source-annotated rendering of compile errors.
//!
//! [`Diagnostic::from_compile_error`] turns a [`CompileError`] into a
//! codespan diagnostic that can be printed to a terminal or rendered into
//! a plain string.

use codespan_reporting::diagnostic::{Diagnostic as CsDiagnostic, Label, Severity};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use termcolor::NoColor;

use crate::compiler::{CompileError, CompileErrorKind};
use crate::parser::Span;

/// Error code for a diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCode(pub &'static str);

impl ErrorCode {
    pub fn as_str(&self) -> &str {
        self.0
    }
}

/// A diagnostic message with source code context
pub struct Diagnostic {
    inner: CsDiagnostic<usize>,
    code: Option<ErrorCode>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            inner: CsDiagnostic::new(Severity::Error).with_message(message),
            code: None,
        }
    }

    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.inner = self.inner.with_code(code.0);
        self.code = Some(code);
        self
    }

    /// Add a primary label (main error location)
    pub fn with_primary_label(mut self, file_id: usize, span: Span, message: impl Into<String>) -> Self {
        let label = Label::primary(file_id, span.start..span.end.max(span.start)).with_message(message);
        self.inner.labels.push(label);
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.inner.notes.push(format!("help: {}", help.into()));
        self
    }

    pub fn from_compile_error(error: &CompileError, file_id: usize) -> Self {
        let label = match error.kind {
            CompileErrorKind::Syntax => "unexpected here",
            CompileErrorKind::Reference => "invalid reference",
        };
        let mut diag = Diagnostic::error(format!("{}: {}", error.kind.name(), error.message))
            .with_code(error_code(error.kind))
            .with_primary_label(file_id, error.span, label);
        if let Some(suggestion) = &error.suggestion {
            diag = diag.with_help(suggestion.clone());
        }
        diag
    }

    pub fn code(&self) -> Option<&ErrorCode> {
        self.code.as_ref()
    }

    /// Emit the diagnostic to stderr with colors
    pub fn emit(&self, files: &SimpleFiles<String, String>) -> Result<(), codespan_reporting::files::Error> {
        let mut writer = StandardStream::stderr(ColorChoice::Auto);
        let config = term::Config::default();
        term::emit(&mut writer, &config, files, &self.inner)
    }

    /// Render without colors, e.g. for logs and tests.
    pub fn render(&self, files: &SimpleFiles<String, String>) -> Result<String, codespan_reporting::files::Error> {
        let mut writer = NoColor::new(Vec::new());
        let config = term::Config::default();
        term::emit(&mut writer, &config, files, &self.inner)?;
        Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
    }

    pub fn inner(&self) -> &CsDiagnostic<usize> {
        &self.inner
    }
}

fn error_code(kind: CompileErrorKind) -> ErrorCode {
    match kind {
        CompileErrorKind::Syntax => ErrorCode("E1001"),
        CompileErrorKind::Reference => ErrorCode("E1002"),
    }
}

/// Helper to create a SimpleFiles instance from source code
pub fn create_files(name: impl Into<String>, source: impl Into<String>) -> SimpleFiles<String, String> {
    let mut files = SimpleFiles::new();
    files.add(name.into(), source.into());
    files
}
