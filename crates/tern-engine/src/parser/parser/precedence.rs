//! Operator precedence table for binary expression parsing.

use crate::parser::ast::BinaryOperator;
use crate::parser::token::Token;

/// Operator precedence level (higher = tighter binding).
///
/// Assignment and `?:` are parsed by dedicated productions; this table only
/// drives precedence climbing over the binary and logical operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    None = 0,
    LogicalOr = 1,      // ||
    LogicalAnd = 2,     // &&
    BitwiseOr = 3,      // |
    BitwiseXor = 4,     // ^
    BitwiseAnd = 5,     // &
    Equality = 6,       // ==, !=, ===, !==
    Relational = 7,     // <, >, <=, >=, instanceof, in
    Shift = 8,          // <<, >>, >>>
    Additive = 9,       // +, -
    Multiplicative = 10, // *, /, %
}

impl Precedence {
    /// Minimum level for the right operand of a left-associative operator.
    pub fn tighter(self) -> u8 {
        self as u8 + 1
    }
}

/// Get the precedence of a binary operator token.
///
/// `in` is excluded when parsing the head of a `for` statement.
pub fn get_precedence(token: &Token, allow_in: bool) -> Precedence {
    match token {
        Token::PipePipe => Precedence::LogicalOr,
        Token::AmpAmp => Precedence::LogicalAnd,
        Token::Pipe => Precedence::BitwiseOr,
        Token::Caret => Precedence::BitwiseXor,
        Token::Amp => Precedence::BitwiseAnd,
        Token::EqualEqual | Token::BangEqual | Token::EqualEqualEqual | Token::BangEqualEqual => {
            Precedence::Equality
        }
        Token::In if !allow_in => Precedence::None,
        Token::Less | Token::LessEqual | Token::Greater | Token::GreaterEqual | Token::Instanceof | Token::In => {
            Precedence::Relational
        }
        Token::LessLess | Token::GreaterGreater | Token::GreaterGreaterGreater => Precedence::Shift,
        Token::Plus | Token::Minus => Precedence::Additive,
        Token::Star | Token::Slash | Token::Percent => Precedence::Multiplicative,
        _ => Precedence::None,
    }
}

/// Map a binary operator token to its AST operator.
pub fn binary_operator(token: &Token) -> Option<BinaryOperator> {
    Some(match token {
        Token::Plus => BinaryOperator::Add,
        Token::Minus => BinaryOperator::Subtract,
        Token::Star => BinaryOperator::Multiply,
        Token::Slash => BinaryOperator::Divide,
        Token::Percent => BinaryOperator::Modulo,
        Token::EqualEqual => BinaryOperator::Equal,
        Token::BangEqual => BinaryOperator::NotEqual,
        Token::EqualEqualEqual => BinaryOperator::StrictEqual,
        Token::BangEqualEqual => BinaryOperator::StrictNotEqual,
        Token::Less => BinaryOperator::LessThan,
        Token::LessEqual => BinaryOperator::LessEqual,
        Token::Greater => BinaryOperator::GreaterThan,
        Token::GreaterEqual => BinaryOperator::GreaterEqual,
        Token::Amp => BinaryOperator::BitwiseAnd,
        Token::Pipe => BinaryOperator::BitwiseOr,
        Token::Caret => BinaryOperator::BitwiseXor,
        Token::LessLess => BinaryOperator::LeftShift,
        Token::GreaterGreater => BinaryOperator::RightShift,
        Token::GreaterGreaterGreater => BinaryOperator::UnsignedRightShift,
        Token::In => BinaryOperator::In,
        Token::Instanceof => BinaryOperator::Instanceof,
        _ => return None,
    })
}
