//! Runtime errors.
//!
//! Inside the executor a script exception travels as [`Thrown`] through
//! `?`; at the engine boundary an uncaught one becomes a [`RuntimeError`].

use std::fmt;

use thiserror::Error;

use super::value::Value;

/// Class of a runtime error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Error,
    TypeError,
    ReferenceError,
    RangeError,
    SyntaxError,
    /// Execution was cancelled or ran past its deadline
    Interrupted,
}

impl ErrorKind {
    /// Constructor name of the matching script error.
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::Interrupted => "Interrupted",
        }
    }

    pub fn from_name(name: &str) -> Option<ErrorKind> {
        Some(match name {
            "Error" => ErrorKind::Error,
            "TypeError" => ErrorKind::TypeError,
            "ReferenceError" => ErrorKind::ReferenceError,
            "RangeError" => ErrorKind::RangeError,
            "SyntaxError" => ErrorKind::SyntaxError,
            _ => return None,
        })
    }

    /// Kinds that scripts can construct and catch.
    pub const SCRIPT_KINDS: [ErrorKind; 5] = [
        ErrorKind::Error,
        ErrorKind::TypeError,
        ErrorKind::ReferenceError,
        ErrorKind::RangeError,
        ErrorKind::SyntaxError,
    ];
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One frame of a stack trace, innermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    pub function: String,
    pub line: u32,
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at {} (line {})", self.function, self.line)
    }
}

/// An exception that escaped `Engine::execute`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
    pub stack_trace: Vec<StackFrame>,
}

impl RuntimeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            stack_trace: Vec::new(),
        }
    }

    /// Error message followed by the stack trace, one frame per line.
    pub fn format_with_trace(&self) -> String {
        let mut out = self.to_string();
        for frame in &self.stack_trace {
            out.push_str("\n    ");
            out.push_str(&frame.to_string());
        }
        out
    }
}

/// Why execution stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptReason {
    Cancelled,
    TimedOut,
}

impl fmt::Display for InterruptReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterruptReason::Cancelled => write!(f, "execution was interrupted"),
            InterruptReason::TimedOut => write!(f, "execution timed out"),
        }
    }
}

/// Abrupt completion inside the executor.
#[derive(Debug, Clone)]
pub enum Thrown {
    /// A script exception; catchable
    Exception(Value),
    /// Cancellation; unwinds every frame without running handlers
    Interrupt(InterruptReason),
}

impl From<InterruptReason> for Thrown {
    fn from(reason: InterruptReason) -> Self {
        Thrown::Interrupt(reason)
    }
}

/// Executor result
pub type VmResult<T> = Result<T, Thrown>;
