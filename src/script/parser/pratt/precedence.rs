//! Precedence handling for Pratt parser
//!
//! Binding power levels, lowest first.

use crate::script::lexer::tokens::TokenKind;
use crate::script::parser::ast::{BinaryOp, CompareOp};

pub const BP_LOWEST: u8 = 0;
pub const BP_CONDITIONAL: u8 = 1;
pub const BP_OR: u8 = 2;
pub const BP_AND: u8 = 3;
pub const BP_NOT: u8 = 4;
pub const BP_COMPARISON: u8 = 5;
pub const BP_TERM: u8 = 6;
pub const BP_FACTOR: u8 = 7;
pub const BP_UNARY: u8 = 8;
pub const BP_CALL: u8 = 9;

/// Infix operator recognised at the current token
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Infix {
    Or,
    And,
    Compare(CompareOp),
    Binary(BinaryOp),
}

/// Binding power and operator for an infix token.
///
/// `next` is the token after `current`; it disambiguates `not in` and `is not`.
/// Returns the number of tokens the operator spans.
pub fn infix_binding_power(
    current: &TokenKind,
    next: Option<&TokenKind>,
) -> Option<(u8, Infix, usize)> {
    let entry = match current {
        TokenKind::KwOr => (BP_OR, Infix::Or, 1),
        TokenKind::KwAnd => (BP_AND, Infix::And, 1),
        TokenKind::EqEq => (BP_COMPARISON, Infix::Compare(CompareOp::Eq), 1),
        TokenKind::Neq => (BP_COMPARISON, Infix::Compare(CompareOp::Ne), 1),
        TokenKind::Lt => (BP_COMPARISON, Infix::Compare(CompareOp::Lt), 1),
        TokenKind::Le => (BP_COMPARISON, Infix::Compare(CompareOp::Le), 1),
        TokenKind::Gt => (BP_COMPARISON, Infix::Compare(CompareOp::Gt), 1),
        TokenKind::Ge => (BP_COMPARISON, Infix::Compare(CompareOp::Ge), 1),
        TokenKind::KwIn => (BP_COMPARISON, Infix::Compare(CompareOp::In), 1),
        TokenKind::KwNot if next == Some(&TokenKind::KwIn) => {
            (BP_COMPARISON, Infix::Compare(CompareOp::NotIn), 2)
        }
        TokenKind::KwIs if next == Some(&TokenKind::KwNot) => {
            (BP_COMPARISON, Infix::Compare(CompareOp::IsNot), 2)
        }
        TokenKind::KwIs => (BP_COMPARISON, Infix::Compare(CompareOp::Is), 1),
        TokenKind::Plus => (BP_TERM, Infix::Binary(BinaryOp::Add), 1),
        TokenKind::Minus => (BP_TERM, Infix::Binary(BinaryOp::Sub), 1),
        TokenKind::Star => (BP_FACTOR, Infix::Binary(BinaryOp::Mul), 1),
        TokenKind::Slash => (BP_FACTOR, Infix::Binary(BinaryOp::Div), 1),
        TokenKind::SlashSlash => (BP_FACTOR, Infix::Binary(BinaryOp::FloorDiv), 1),
        TokenKind::Percent => (BP_FACTOR, Infix::Binary(BinaryOp::Mod), 1),
        _ => return None,
    };
    Some(entry)
}

/// Operator of an augmented assignment token (`+=`, `-=`, `*=`)
pub fn augmented_op(kind: &TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::PlusEq => Some(BinaryOp::Add),
        TokenKind::MinusEq => Some(BinaryOp::Sub),
        TokenKind::StarEq => Some(BinaryOp::Mul),
        _ => None,
    }
}
