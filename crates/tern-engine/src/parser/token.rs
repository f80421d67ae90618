//! Token definitions for Tern source text.
//!
//! Tokens are produced lazily by the [`Lexer`](super::lexer::Lexer). Each one
//! carries its span and whether a line terminator preceded it, which the
//! parser needs for automatic semicolon insertion.

use std::fmt;

use crate::parser::interner::Symbol;

/// A token of the scripting language.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    Break,
    Case,
    Catch,
    Continue,
    Debugger,
    Default,
    Delete,
    Do,
    Else,
    Finally,
    For,
    Function,
    If,
    In,
    Instanceof,
    New,
    Return,
    Switch,
    This,
    Throw,
    Try,
    Typeof,
    Var,
    Void,
    While,
    With,
    Let,
    Const,

    // Future reserved words (always illegal as identifiers)
    Class,
    Enum,
    Export,
    Extends,
    Import,
    Super,

    // Literals
    Number { value: f64, legacy_octal: bool },
    String { value: Symbol, octal_escape: bool },
    RegExp { pattern: Symbol, flags: Symbol },
    Template(Vec<TemplatePart>),
    True,
    False,
    Null,

    Identifier(Symbol),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    Bang,
    Tilde,
    EqualEqual,
    BangEqual,
    EqualEqualEqual,
    BangEqualEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    AmpAmp,
    PipePipe,
    Amp,
    Pipe,
    Caret,
    LessLess,
    GreaterGreater,
    GreaterGreaterGreater,
    Equal,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    PercentEqual,
    AmpEqual,
    PipeEqual,
    CaretEqual,
    LessLessEqual,
    GreaterGreaterEqual,
    GreaterGreaterGreaterEqual,
    Question,
    Colon,
    Dot,

    // Punctuation
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Semicolon,
    Comma,

    Eof,
}

/// A part of a template literal.
///
/// Substitutions are kept as byte ranges into the source so the parser can
/// re-enter the lexer on them.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    String(Symbol),
    Substitution { start: usize, end: usize, line: u32, column: u32 },
}

/// Source location information for a token or node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    /// Span covering `self` through `other`, positioned at `self`.
    pub fn to(&self, other: &Span) -> Span {
        Span {
            start: self.start,
            end: other.end.max(self.end),
            line: self.line,
            column: self.column,
        }
    }
}

/// A token together with its location and line-break context.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenData {
    pub token: Token,
    pub span: Span,
    /// A line terminator appeared between the previous token and this one.
    pub newline_before: bool,
}

impl Token {
    /// Returns true if this token is a keyword or reserved word.
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            Token::Break
                | Token::Case
                | Token::Catch
                | Token::Continue
                | Token::Debugger
                | Token::Default
                | Token::Delete
                | Token::Do
                | Token::Else
                | Token::Finally
                | Token::For
                | Token::Function
                | Token::If
                | Token::In
                | Token::Instanceof
                | Token::New
                | Token::Return
                | Token::Switch
                | Token::This
                | Token::Throw
                | Token::Try
                | Token::Typeof
                | Token::Var
                | Token::Void
                | Token::While
                | Token::With
                | Token::Let
                | Token::Const
                | Token::Class
                | Token::Enum
                | Token::Export
                | Token::Extends
                | Token::Import
                | Token::Super
                | Token::True
                | Token::False
                | Token::Null
        )
    }

    /// Whether a `/` following this token starts a regular expression.
    ///
    /// A slash after anything that can end an expression is division.
    pub fn allows_regex_after(&self) -> bool {
        !matches!(
            self,
            Token::Number { .. }
                | Token::String { .. }
                | Token::RegExp { .. }
                | Token::Template(_)
                | Token::True
                | Token::False
                | Token::Null
                | Token::This
                | Token::Identifier(_)
                | Token::RightParen
                | Token::RightBracket
                | Token::RightBrace
                | Token::PlusPlus
                | Token::MinusMinus
        )
    }

    /// Source spelling of keyword tokens, used for property names such as
    /// `obj.default` and `{ if: 1 }`.
    pub fn keyword_text(&self) -> Option<&'static str> {
        let text = match self {
            Token::Break => "break",
            Token::Case => "case",
            Token::Catch => "catch",
            Token::Continue => "continue",
            Token::Debugger => "debugger",
            Token::Default => "default",
            Token::Delete => "delete",
            Token::Do => "do",
            Token::Else => "else",
            Token::Finally => "finally",
            Token::For => "for",
            Token::Function => "function",
            Token::If => "if",
            Token::In => "in",
            Token::Instanceof => "instanceof",
            Token::New => "new",
            Token::Return => "return",
            Token::Switch => "switch",
            Token::This => "this",
            Token::Throw => "throw",
            Token::Try => "try",
            Token::Typeof => "typeof",
            Token::Var => "var",
            Token::Void => "void",
            Token::While => "while",
            Token::With => "with",
            Token::Let => "let",
            Token::Const => "const",
            Token::Class => "class",
            Token::Enum => "enum",
            Token::Export => "export",
            Token::Extends => "extends",
            Token::Import => "import",
            Token::Super => "super",
            Token::True => "true",
            Token::False => "false",
            Token::Null => "null",
            _ => return None,
        };
        Some(text)
    }

    /// Returns true for `=` and every compound assignment operator.
    pub fn is_assignment(&self) -> bool {
        matches!(
            self,
            Token::Equal
                | Token::PlusEqual
                | Token::MinusEqual
                | Token::StarEqual
                | Token::SlashEqual
                | Token::PercentEqual
                | Token::AmpEqual
                | Token::PipeEqual
                | Token::CaretEqual
                | Token::LessLessEqual
                | Token::GreaterGreaterEqual
                | Token::GreaterGreaterGreaterEqual
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = self.keyword_text() {
            return write!(f, "{}", text);
        }
        let text = match self {
            Token::Number { value, .. } => return write!(f, "{}", value),
            Token::String { .. } => "<string>",
            Token::RegExp { .. } => "<regexp>",
            Token::Template(_) => "`...`",
            Token::Identifier(_) => "<identifier>",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::PlusPlus => "++",
            Token::MinusMinus => "--",
            Token::Bang => "!",
            Token::Tilde => "~",
            Token::EqualEqual => "==",
            Token::BangEqual => "!=",
            Token::EqualEqualEqual => "===",
            Token::BangEqualEqual => "!==",
            Token::Less => "<",
            Token::LessEqual => "<=",
            Token::Greater => ">",
            Token::GreaterEqual => ">=",
            Token::AmpAmp => "&&",
            Token::PipePipe => "||",
            Token::Amp => "&",
            Token::Pipe => "|",
            Token::Caret => "^",
            Token::LessLess => "<<",
            Token::GreaterGreater => ">>",
            Token::GreaterGreaterGreater => ">>>",
            Token::Equal => "=",
            Token::PlusEqual => "+=",
            Token::MinusEqual => "-=",
            Token::StarEqual => "*=",
            Token::SlashEqual => "/=",
            Token::PercentEqual => "%=",
            Token::AmpEqual => "&=",
            Token::PipeEqual => "|=",
            Token::CaretEqual => "^=",
            Token::LessLessEqual => "<<=",
            Token::GreaterGreaterEqual => ">>=",
            Token::GreaterGreaterGreaterEqual => ">>>=",
            Token::Question => "?",
            Token::Colon => ":",
            Token::Dot => ".",
            Token::LeftParen => "(",
            Token::RightParen => ")",
            Token::LeftBrace => "{",
            Token::RightBrace => "}",
            Token::LeftBracket => "[",
            Token::RightBracket => "]",
            Token::Semicolon => ";",
            Token::Comma => ",",
            Token::Eof => "end of input",
            _ => "<keyword>",
        };
        write!(f, "{}", text)
    }
}
