//! Lexer and parser for Tern source text.
//!
//! # Example
//!
//! ```ignore
//! use tern_engine::parser::Parser;
//!
//! let (program, interner) = Parser::new("var x = 1 + 2;").parse()?;
//! assert_eq!(program.body.len(), 1);
//! ```

pub mod ast;
pub mod interner;
pub mod lexer;
pub mod parser;
pub mod token;

pub use interner::{Interner, Symbol};
pub use lexer::{LexError, Lexer};
pub use parser::{ParseError, ParseErrorKind, Parser};
pub use token::{Span, TemplatePart, Token};
