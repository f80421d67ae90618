//! Lexer for Tern source text.
//!
//! Keywords, identifiers and punctuators are recognized with `logos`.
//! Whitespace, comments, numbers, strings, templates and regular expression
//! literals are scanned by hand because they depend on context (line
//! terminators for ASI, the previous token for `/`).
//!
//! The lexer is lazy: [`Lexer::next_token`] produces one token per call.

use logos::Logos;
use unicode_xid::UnicodeXID;

use crate::parser::interner::Interner;
use crate::parser::token::{Span, TemplatePart, Token, TokenData};

/// Logos-based token enum for the context-free part of the grammar.
#[derive(Logos, Debug, Clone, PartialEq)]
enum LogosToken {
    #[token("break")]
    Break,
    #[token("case")]
    Case,
    #[token("catch")]
    Catch,
    #[token("continue")]
    Continue,
    #[token("debugger")]
    Debugger,
    #[token("default")]
    Default,
    #[token("delete")]
    Delete,
    #[token("do")]
    Do,
    #[token("else")]
    Else,
    #[token("finally")]
    Finally,
    #[token("for")]
    For,
    #[token("function")]
    Function,
    #[token("if")]
    If,
    #[token("in")]
    In,
    #[token("instanceof")]
    Instanceof,
    #[token("new")]
    New,
    #[token("return")]
    Return,
    #[token("switch")]
    Switch,
    #[token("this")]
    This,
    #[token("throw")]
    Throw,
    #[token("try")]
    Try,
    #[token("typeof")]
    Typeof,
    #[token("var")]
    Var,
    #[token("void")]
    Void,
    #[token("while")]
    While,
    #[token("with")]
    With,
    #[token("let")]
    Let,
    #[token("const")]
    Const,
    #[token("class")]
    Class,
    #[token("enum")]
    Enum,
    #[token("export")]
    Export,
    #[token("extends")]
    Extends,
    #[token("import")]
    Import,
    #[token("super")]
    Super,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    #[regex(r"[a-zA-Z_$][a-zA-Z0-9_$]*")]
    Identifier,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
    #[token("!")]
    Bang,
    #[token("~")]
    Tilde,
    #[token("==")]
    EqualEqual,
    #[token("!=")]
    BangEqual,
    #[token("===")]
    EqualEqualEqual,
    #[token("!==")]
    BangEqualEqual,
    #[token("<")]
    Less,
    #[token("<=")]
    LessEqual,
    #[token(">")]
    Greater,
    #[token(">=")]
    GreaterEqual,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("<<")]
    LessLess,
    #[token(">>")]
    GreaterGreater,
    #[token(">>>")]
    GreaterGreaterGreater,
    #[token("=")]
    Equal,
    #[token("+=")]
    PlusEqual,
    #[token("-=")]
    MinusEqual,
    #[token("*=")]
    StarEqual,
    #[token("/=")]
    SlashEqual,
    #[token("%=")]
    PercentEqual,
    #[token("&=")]
    AmpEqual,
    #[token("|=")]
    PipeEqual,
    #[token("^=")]
    CaretEqual,
    #[token("<<=")]
    LessLessEqual,
    #[token(">>=")]
    GreaterGreaterEqual,
    #[token(">>>=")]
    GreaterGreaterGreaterEqual,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token("[")]
    LeftBracket,
    #[token("]")]
    RightBracket,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
}

/// Lexer error types.
#[derive(Debug, Clone, PartialEq)]
pub enum LexError {
    UnexpectedCharacter { char: char, span: Span },
    UnterminatedString { span: Span },
    UnterminatedTemplate { span: Span },
    UnterminatedRegex { span: Span },
    UnterminatedComment { span: Span },
    InvalidNumber { text: String, span: Span },
    InvalidEscape { escape: String, span: Span },
}

/// Lazy tokenizer over a source string.
pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    end: usize,
    line: u32,
    column: u32,
    regex_allowed: bool,
}

fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn is_whitespace(c: char) -> bool {
    matches!(
        c,
        ' ' | '\t' | '\u{000B}' | '\u{000C}' | '\u{00A0}' | '\u{FEFF}'
    ) || (!c.is_ascii() && c.is_whitespace() && !is_line_terminator(c))
}

fn is_identifier_part(c: char) -> bool {
    c == '$' || c == '_' || c == '\u{200C}' || c == '\u{200D}' || UnicodeXID::is_xid_continue(c)
}

fn is_identifier_start(c: char) -> bool {
    c == '$' || c == '_' || UnicodeXID::is_xid_start(c)
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self::at(source, 0, source.len(), 1, 1)
    }

    /// Lexer over `source[start..end]` whose positions are reported relative
    /// to the whole source. Used for template substitutions.
    pub fn at(source: &'a str, start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            source,
            pos: start,
            end,
            line,
            column,
            regex_allowed: true,
        }
    }

    /// Tokenize the whole source eagerly.
    pub fn tokenize(source: &'a str) -> Result<(Vec<TokenData>, Interner), LexError> {
        let mut interner = Interner::with_capacity(256);
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let data = lexer.next_token(&mut interner)?;
            let done = data.token == Token::Eof;
            tokens.push(data);
            if done {
                return Ok((tokens, interner));
            }
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.source[self.pos..self.end].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.source[self.pos..self.end].chars().nth(offset)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        if c == '\r' && self.peek_char() == Some('\n') {
            self.pos += 1;
        }
        if is_line_terminator(c) {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn here(&self) -> Span {
        Span::new(self.pos, self.pos, self.line, self.column)
    }

    fn span_from(&self, start: Span) -> Span {
        Span::new(start.start, self.pos, start.line, start.column)
    }

    /// Skip whitespace and comments, reporting whether a line terminator was
    /// crossed.
    fn skip_trivia(&mut self) -> Result<bool, LexError> {
        let mut newline = false;
        while let Some(c) = self.peek_char() {
            if is_line_terminator(c) {
                newline = true;
                self.bump();
            } else if is_whitespace(c) {
                self.bump();
            } else if c == '/' && self.peek_char_at(1) == Some('/') {
                while let Some(c) = self.peek_char() {
                    if is_line_terminator(c) {
                        break;
                    }
                    self.bump();
                }
            } else if c == '/' && self.peek_char_at(1) == Some('*') {
                let start = self.here();
                self.bump();
                self.bump();
                loop {
                    match self.bump() {
                        Some('*') if self.peek_char() == Some('/') => {
                            self.bump();
                            break;
                        }
                        Some(c) if is_line_terminator(c) => newline = true,
                        Some(_) => {}
                        None => {
                            return Err(LexError::UnterminatedComment {
                                span: self.span_from(start),
                            })
                        }
                    }
                }
            } else {
                break;
            }
        }
        Ok(newline)
    }

    /// Produce the next token.
    pub fn next_token(&mut self, interner: &mut Interner) -> Result<TokenData, LexError> {
        let newline_before = self.skip_trivia()?;
        let start = self.here();

        let Some(c) = self.peek_char() else {
            return Ok(TokenData {
                token: Token::Eof,
                span: start,
                newline_before,
            });
        };

        let token = if c.is_ascii_digit()
            || (c == '.' && self.peek_char_at(1).is_some_and(|d| d.is_ascii_digit()))
        {
            self.scan_number(start)?
        } else if c == '"' || c == '\'' {
            let (value, octal_escape) = self.scan_string(start, c)?;
            Token::String {
                value: interner.intern(&value),
                octal_escape,
            }
        } else if c == '`' {
            Token::Template(self.scan_template(start, interner)?)
        } else if c == '/' && self.regex_allowed {
            self.scan_regex(start, interner)?
        } else if !c.is_ascii() {
            if is_identifier_start(c) {
                self.scan_identifier_tail(start, interner)
            } else {
                return Err(LexError::UnexpectedCharacter { char: c, span: start });
            }
        } else {
            self.scan_logos(start, c, interner)?
        };

        self.regex_allowed = token.allows_regex_after();
        Ok(TokenData {
            token,
            span: self.span_from(start),
            newline_before,
        })
    }

    /// Re-read the `/` or `/=` token at `slash` as a regular expression
    /// literal. The parser calls this when it needs an expression and the
    /// previous token alone suggested division, as after `if (x)` or a block.
    pub fn rescan_regex(&mut self, slash: &TokenData, interner: &mut Interner) -> Result<TokenData, LexError> {
        let start = Span::new(slash.span.start, slash.span.start, slash.span.line, slash.span.column);
        self.pos = start.start;
        self.line = start.line;
        self.column = start.column;
        let token = self.scan_regex(start, interner)?;
        self.regex_allowed = token.allows_regex_after();
        Ok(TokenData {
            token,
            span: self.span_from(start),
            newline_before: slash.newline_before,
        })
    }

    fn scan_logos(&mut self, start: Span, c: char, interner: &mut Interner) -> Result<Token, LexError> {
        let mut logos_lexer = LogosToken::lexer(&self.source[self.pos..self.end]);
        let result = logos_lexer.next();
        let len = logos_lexer.span().end;
        match result {
            Some(Ok(logos_token)) => {
                let is_word = matches!(logos_token, LogosToken::Identifier)
                    || self.source[self.pos..self.pos + len]
                        .chars()
                        .all(|c| c.is_ascii_alphabetic());
                for _ in 0..len {
                    self.bump();
                }
                // A non-ASCII continuation turns a keyword prefix into an identifier.
                if is_word && self.peek_char().is_some_and(|c| !c.is_ascii() && is_identifier_part(c)) {
                    return Ok(self.scan_identifier_tail(start, interner));
                }
                Ok(self.convert_token(logos_token, start, interner))
            }
            _ => Err(LexError::UnexpectedCharacter { char: c, span: start }),
        }
    }

    fn scan_identifier_tail(&mut self, start: Span, interner: &mut Interner) -> Token {
        while let Some(c) = self.peek_char() {
            if is_identifier_part(c) {
                self.bump();
            } else {
                break;
            }
        }
        Token::Identifier(interner.intern(&self.source[start.start..self.pos]))
    }

    fn convert_token(&mut self, logos_token: LogosToken, start: Span, interner: &mut Interner) -> Token {
        match logos_token {
            LogosToken::Break => Token::Break,
            LogosToken::Case => Token::Case,
            LogosToken::Catch => Token::Catch,
            LogosToken::Continue => Token::Continue,
            LogosToken::Debugger => Token::Debugger,
            LogosToken::Default => Token::Default,
            LogosToken::Delete => Token::Delete,
            LogosToken::Do => Token::Do,
            LogosToken::Else => Token::Else,
            LogosToken::Finally => Token::Finally,
            LogosToken::For => Token::For,
            LogosToken::Function => Token::Function,
            LogosToken::If => Token::If,
            LogosToken::In => Token::In,
            LogosToken::Instanceof => Token::Instanceof,
            LogosToken::New => Token::New,
            LogosToken::Return => Token::Return,
            LogosToken::Switch => Token::Switch,
            LogosToken::This => Token::This,
            LogosToken::Throw => Token::Throw,
            LogosToken::Try => Token::Try,
            LogosToken::Typeof => Token::Typeof,
            LogosToken::Var => Token::Var,
            LogosToken::Void => Token::Void,
            LogosToken::While => Token::While,
            LogosToken::With => Token::With,
            LogosToken::Let => Token::Let,
            LogosToken::Const => Token::Const,
            LogosToken::Class => Token::Class,
            LogosToken::Enum => Token::Enum,
            LogosToken::Export => Token::Export,
            LogosToken::Extends => Token::Extends,
            LogosToken::Import => Token::Import,
            LogosToken::Super => Token::Super,
            LogosToken::True => Token::True,
            LogosToken::False => Token::False,
            LogosToken::Null => Token::Null,
            LogosToken::Identifier => {
                Token::Identifier(interner.intern(&self.source[start.start..self.pos]))
            }
            LogosToken::Plus => Token::Plus,
            LogosToken::Minus => Token::Minus,
            LogosToken::Star => Token::Star,
            LogosToken::Slash => Token::Slash,
            LogosToken::Percent => Token::Percent,
            LogosToken::PlusPlus => Token::PlusPlus,
            LogosToken::MinusMinus => Token::MinusMinus,
            LogosToken::Bang => Token::Bang,
            LogosToken::Tilde => Token::Tilde,
            LogosToken::EqualEqual => Token::EqualEqual,
            LogosToken::BangEqual => Token::BangEqual,
            LogosToken::EqualEqualEqual => Token::EqualEqualEqual,
            LogosToken::BangEqualEqual => Token::BangEqualEqual,
            LogosToken::Less => Token::Less,
            LogosToken::LessEqual => Token::LessEqual,
            LogosToken::Greater => Token::Greater,
            LogosToken::GreaterEqual => Token::GreaterEqual,
            LogosToken::AmpAmp => Token::AmpAmp,
            LogosToken::PipePipe => Token::PipePipe,
            LogosToken::Amp => Token::Amp,
            LogosToken::Pipe => Token::Pipe,
            LogosToken::Caret => Token::Caret,
            LogosToken::LessLess => Token::LessLess,
            LogosToken::GreaterGreater => Token::GreaterGreater,
            LogosToken::GreaterGreaterGreater => Token::GreaterGreaterGreater,
            LogosToken::Equal => Token::Equal,
            LogosToken::PlusEqual => Token::PlusEqual,
            LogosToken::MinusEqual => Token::MinusEqual,
            LogosToken::StarEqual => Token::StarEqual,
            LogosToken::SlashEqual => Token::SlashEqual,
            LogosToken::PercentEqual => Token::PercentEqual,
            LogosToken::AmpEqual => Token::AmpEqual,
            LogosToken::PipeEqual => Token::PipeEqual,
            LogosToken::CaretEqual => Token::CaretEqual,
            LogosToken::LessLessEqual => Token::LessLessEqual,
            LogosToken::GreaterGreaterEqual => Token::GreaterGreaterEqual,
            LogosToken::GreaterGreaterGreaterEqual => Token::GreaterGreaterGreaterEqual,
            LogosToken::Question => Token::Question,
            LogosToken::Colon => Token::Colon,
            LogosToken::Dot => Token::Dot,
            LogosToken::LeftParen => Token::LeftParen,
            LogosToken::RightParen => Token::RightParen,
            LogosToken::LeftBrace => Token::LeftBrace,
            LogosToken::RightBrace => Token::RightBrace,
            LogosToken::LeftBracket => Token::LeftBracket,
            LogosToken::RightBracket => Token::RightBracket,
            LogosToken::Semicolon => Token::Semicolon,
            LogosToken::Comma => Token::Comma,
        }
    }

    // ========================================================================
    // Numbers
    // ========================================================================

    fn take_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.peek_char().is_some_and(&pred) {
            self.bump();
        }
    }

    fn scan_number(&mut self, start: Span) -> Result<Token, LexError> {
        let first = self.peek_char();
        let second = self.peek_char_at(1);

        if first == Some('0') && matches!(second, Some('x') | Some('X')) {
            self.bump();
            self.bump();
            let digits_start = self.pos;
            self.take_while(|c| c.is_ascii_hexdigit());
            let digits = &self.source[digits_start..self.pos];
            if digits.is_empty() {
                return Err(self.invalid_number(start));
            }
            let value = digits
                .chars()
                .fold(0f64, |acc, d| acc * 16.0 + d.to_digit(16).unwrap_or(0) as f64);
            self.reject_identifier_after_number(start)?;
            return Ok(Token::Number { value, legacy_octal: false });
        }

        if first == Some('0') && second.is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            let digits_start = self.pos;
            self.take_while(|c| c.is_ascii_digit());
            let digits = &self.source[digits_start..self.pos];
            // `08` and `019` are decimal; only all-octal digits form a legacy octal literal.
            if digits.chars().all(|c| ('0'..='7').contains(&c)) {
                let value = digits
                    .chars()
                    .fold(0f64, |acc, d| acc * 8.0 + d.to_digit(8).unwrap_or(0) as f64);
                self.reject_identifier_after_number(start)?;
                return Ok(Token::Number { value, legacy_octal: true });
            }
        }

        self.take_while(|c| c.is_ascii_digit());
        if self.peek_char() == Some('.') {
            self.bump();
            self.take_while(|c| c.is_ascii_digit());
        }
        if matches!(self.peek_char(), Some('e') | Some('E')) {
            let sign = self.peek_char_at(1);
            let exp_digit = if matches!(sign, Some('+') | Some('-')) {
                self.peek_char_at(2)
            } else {
                sign
            };
            if !exp_digit.is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
                return Err(self.invalid_number(start));
            }
            self.bump();
            if matches!(self.peek_char(), Some('+') | Some('-')) {
                self.bump();
            }
            self.take_while(|c| c.is_ascii_digit());
        }
        self.reject_identifier_after_number(start)?;

        let text = &self.source[start.start..self.pos];
        let value = text
            .parse::<f64>()
            .map_err(|_| self.invalid_number(start))?;
        Ok(Token::Number { value, legacy_octal: false })
    }

    fn reject_identifier_after_number(&mut self, start: Span) -> Result<(), LexError> {
        if self.peek_char().is_some_and(|c| is_identifier_start(c) || c.is_ascii_digit()) {
            self.take_while(is_identifier_part);
            return Err(self.invalid_number(start));
        }
        Ok(())
    }

    fn invalid_number(&self, start: Span) -> LexError {
        LexError::InvalidNumber {
            text: self.source[start.start..self.pos].to_string(),
            span: self.span_from(start),
        }
    }

    // ========================================================================
    // Strings
    // ========================================================================

    fn read_hex_digits(&mut self, count: usize, start: Span) -> Result<u32, LexError> {
        let mut value = 0u32;
        for _ in 0..count {
            match self.peek_char().and_then(|c| c.to_digit(16)) {
                Some(d) => {
                    value = value * 16 + d;
                    self.bump();
                }
                None => {
                    return Err(LexError::InvalidEscape {
                        escape: self.source[start.start..self.pos].to_string(),
                        span: self.span_from(start),
                    })
                }
            }
        }
        Ok(value)
    }

    /// Read a `\u` escape body (`XXXX` or `{X..}`) after the `u`.
    fn read_unicode_escape(&mut self, start: Span) -> Result<u32, LexError> {
        if self.peek_char() == Some('{') {
            self.bump();
            let mut value = 0u32;
            let mut digits = 0;
            while let Some(d) = self.peek_char().and_then(|c| c.to_digit(16)) {
                value = value.saturating_mul(16).saturating_add(d);
                digits += 1;
                self.bump();
            }
            if self.peek_char() != Some('}') || digits == 0 || value > 0x10FFFF {
                return Err(LexError::InvalidEscape {
                    escape: self.source[start.start..self.pos].to_string(),
                    span: self.span_from(start),
                });
            }
            self.bump();
            return Ok(value);
        }
        self.read_hex_digits(4, start)
    }

    /// Decode one escape sequence after the backslash into `out`.
    ///
    /// Returns true when the escape was a legacy octal escape.
    fn scan_escape(&mut self, out: &mut String, pending_high: &mut Option<u32>) -> Result<bool, LexError> {
        let escape_start = Span::new(self.pos - 1, self.pos, self.line, self.column.saturating_sub(1));
        let Some(c) = self.bump() else {
            return Err(LexError::UnterminatedString { span: escape_start });
        };
        let mut octal = false;
        let code: Option<u32> = match c {
            'n' => Some('\n' as u32),
            't' => Some('\t' as u32),
            'r' => Some('\r' as u32),
            'b' => Some(0x08),
            'f' => Some(0x0C),
            'v' => Some(0x0B),
            'x' => Some(self.read_hex_digits(2, escape_start)?),
            'u' => Some(self.read_unicode_escape(escape_start)?),
            '0' if !self.peek_char().is_some_and(|d| d.is_ascii_digit()) => Some(0),
            '0'..='7' => {
                octal = true;
                let mut value = c.to_digit(8).unwrap_or(0);
                let max_digits = if c <= '3' { 2 } else { 1 };
                for _ in 0..max_digits {
                    match self.peek_char().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            self.bump();
                        }
                        None => break,
                    }
                }
                Some(value)
            }
            c if is_line_terminator(c) => None,
            other => Some(other as u32),
        };

        if let Some(code) = code {
            push_code_unit(out, code, pending_high);
        }
        Ok(octal)
    }

    fn scan_string(&mut self, start: Span, quote: char) -> Result<(String, bool), LexError> {
        self.bump();
        let mut value = String::new();
        let mut octal_escape = false;
        let mut pending_high = None;
        loop {
            match self.peek_char() {
                None => return Err(LexError::UnterminatedString { span: self.span_from(start) }),
                Some(c) if c == quote => {
                    self.bump();
                    break;
                }
                Some(c) if is_line_terminator(c) && c != '\u{2028}' && c != '\u{2029}' => {
                    return Err(LexError::UnterminatedString { span: self.span_from(start) })
                }
                Some('\\') => {
                    self.bump();
                    octal_escape |= self.scan_escape(&mut value, &mut pending_high)?;
                }
                Some(c) => {
                    flush_surrogate(&mut value, &mut pending_high);
                    value.push(c);
                    self.bump();
                }
            }
        }
        flush_surrogate(&mut value, &mut pending_high);
        Ok((value, octal_escape))
    }

    // ========================================================================
    // Templates
    // ========================================================================

    fn scan_template(&mut self, start: Span, interner: &mut Interner) -> Result<Vec<TemplatePart>, LexError> {
        self.bump();
        let mut parts = Vec::new();
        let mut text = String::new();
        let mut pending_high = None;
        loop {
            match self.peek_char() {
                None => return Err(LexError::UnterminatedTemplate { span: self.span_from(start) }),
                Some('`') => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    self.scan_escape(&mut text, &mut pending_high)?;
                }
                Some('$') if self.peek_char_at(1) == Some('{') => {
                    flush_surrogate(&mut text, &mut pending_high);
                    parts.push(TemplatePart::String(interner.intern(&text)));
                    text.clear();
                    self.bump();
                    self.bump();
                    let (line, column) = (self.line, self.column);
                    let expr_start = self.pos;
                    self.skip_balanced_braces(start)?;
                    parts.push(TemplatePart::Substitution {
                        start: expr_start,
                        end: self.pos,
                        line,
                        column,
                    });
                    self.bump();
                }
                Some(c) => {
                    flush_surrogate(&mut text, &mut pending_high);
                    text.push(c);
                    self.bump();
                }
            }
        }
        flush_surrogate(&mut text, &mut pending_high);
        parts.push(TemplatePart::String(interner.intern(&text)));
        Ok(parts)
    }

    /// Advance to the `}` closing a template substitution.
    fn skip_balanced_braces(&mut self, start: Span) -> Result<(), LexError> {
        let mut depth = 0usize;
        loop {
            match self.peek_char() {
                None => return Err(LexError::UnterminatedTemplate { span: self.span_from(start) }),
                Some('}') if depth == 0 => return Ok(()),
                Some('}') => {
                    depth -= 1;
                    self.bump();
                }
                Some('{') => {
                    depth += 1;
                    self.bump();
                }
                Some(q @ ('"' | '\'')) => {
                    let string_start = self.here();
                    self.scan_string(string_start, q)?;
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    // ========================================================================
    // Regular expressions
    // ========================================================================

    fn scan_regex(&mut self, start: Span, interner: &mut Interner) -> Result<Token, LexError> {
        self.bump();
        let body_start = self.pos;
        let mut in_class = false;
        loop {
            match self.peek_char() {
                None => return Err(LexError::UnterminatedRegex { span: self.span_from(start) }),
                Some(c) if is_line_terminator(c) => {
                    return Err(LexError::UnterminatedRegex { span: self.span_from(start) })
                }
                Some('\\') => {
                    self.bump();
                    match self.peek_char() {
                        Some(c) if !is_line_terminator(c) => {
                            self.bump();
                        }
                        _ => return Err(LexError::UnterminatedRegex { span: self.span_from(start) }),
                    }
                }
                Some('[') => {
                    in_class = true;
                    self.bump();
                }
                Some(']') => {
                    in_class = false;
                    self.bump();
                }
                Some('/') if !in_class => break,
                Some(_) => {
                    self.bump();
                }
            }
        }
        let pattern = interner.intern(&self.source[body_start..self.pos]);
        self.bump();
        let flags_start = self.pos;
        self.take_while(is_identifier_part);
        let flags = interner.intern(&self.source[flags_start..self.pos]);
        Ok(Token::RegExp { pattern, flags })
    }
}

/// Append a UTF-16 code unit, pairing surrogates where possible.
///
/// Lone surrogates cannot be represented in a Rust string and become U+FFFD.
fn push_code_unit(out: &mut String, code: u32, pending_high: &mut Option<u32>) {
    if (0xD800..0xDC00).contains(&code) {
        flush_surrogate(out, pending_high);
        *pending_high = Some(code);
        return;
    }
    if (0xDC00..0xE000).contains(&code) {
        if let Some(high) = pending_high.take() {
            let combined = 0x10000 + ((high - 0xD800) << 10) + (code - 0xDC00);
            out.push(char::from_u32(combined).unwrap_or('\u{FFFD}'));
        } else {
            out.push('\u{FFFD}');
        }
        return;
    }
    flush_surrogate(out, pending_high);
    out.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
}

fn flush_surrogate(out: &mut String, pending_high: &mut Option<u32>) {
    if pending_high.take().is_some() {
        out.push('\u{FFFD}');
    }
}

impl LexError {
    /// Get the span of this error
    pub fn span(&self) -> &Span {
        match self {
            LexError::UnexpectedCharacter { span, .. }
            | LexError::UnterminatedString { span }
            | LexError::UnterminatedTemplate { span }
            | LexError::UnterminatedRegex { span }
            | LexError::UnterminatedComment { span }
            | LexError::InvalidNumber { span, .. }
            | LexError::InvalidEscape { span, .. } => span,
        }
    }

    /// Get a description of this error
    pub fn description(&self) -> String {
        match self {
            LexError::UnexpectedCharacter { char, .. } => format!("Unexpected character '{}'", char),
            LexError::UnterminatedString { .. } => "Unterminated string literal".to_string(),
            LexError::UnterminatedTemplate { .. } => "Unterminated template literal".to_string(),
            LexError::UnterminatedRegex { .. } => "Unterminated regular expression literal".to_string(),
            LexError::UnterminatedComment { .. } => "Unterminated block comment".to_string(),
            LexError::InvalidNumber { text, .. } => format!("Invalid number '{}'", text),
            LexError::InvalidEscape { escape, .. } => format!("Invalid escape sequence '{}'", escape),
        }
    }

    /// Get a hint for fixing this error
    pub fn hint(&self) -> Option<String> {
        match self {
            LexError::UnterminatedString { .. } => {
                Some("Add a closing quote to terminate the string".to_string())
            }
            LexError::UnterminatedTemplate { .. } => {
                Some("Add a closing backtick (`) to terminate the template literal".to_string())
            }
            LexError::UnterminatedComment { .. } => Some("Close the comment with */".to_string()),
            LexError::InvalidEscape { .. } => {
                Some("\\x needs two hex digits and \\u needs four".to_string())
            }
            _ => None,
        }
    }

    /// Format the error with source context
    pub fn format_with_source(&self, source: &str) -> String {
        let span = self.span();
        let mut result = format!("Error at {}:{}: {}\n", span.line, span.column, self.description());
        if let Some(error_line) = source.lines().nth(span.line.saturating_sub(1) as usize) {
            result.push_str("  |\n");
            result.push_str(&format!("{:3} | {}\n", span.line, error_line));
            result.push_str(&format!(
                "  | {}^\n",
                " ".repeat(span.column.saturating_sub(1) as usize)
            ));
        }
        if let Some(hint) = self.hint() {
            result.push_str(&format!("\nHint: {}\n", hint));
        }
        result
    }
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}:{}",
            self.description(),
            self.span().line,
            self.span().column
        )
    }
}

impl std::error::Error for LexError {}
