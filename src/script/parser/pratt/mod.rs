//! Pratt parser implementation
//! Handles expression parsing with binding power

pub mod led;
pub mod nud;
pub mod precedence;

pub use precedence::*;

use crate::script::lexer::tokens::*;
use crate::script::parser::ast::*;
use crate::script::parser::{ParseError, ParserState};

impl ParserState<'_> {
    /// Parse a full expression, including the conditional form `a if c else b`
    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let then = self.parse_expression_bp(BP_OR)?;
        if !self.at(&TokenKind::KwIf) {
            return Ok(then);
        }
        self.bump();
        let condition = self.parse_expression_bp(BP_OR)?;
        self.expect(&TokenKind::KwElse)?;
        let otherwise = self.parse_expression()?;
        Ok(Expr::Conditional {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    /// Parse `expr[, expr]*`; more than one element (or a trailing comma) makes a tuple
    pub fn parse_expression_list(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_expression()?;
        if !self.at(&TokenKind::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.skip(&TokenKind::Comma) {
            if self.at_expression_end() {
                break;
            }
            items.push(self.parse_expression()?);
        }
        Ok(Expr::Tuple(items))
    }

    /// Internal expression parsing method
    pub fn parse_expression_bp(
        &mut self,
        min_bp: u8,
    ) -> Result<Expr, ParseError> {
        self.nested_expression(|state| state.parse_infix_chain(min_bp))
    }

    fn parse_infix_chain(
        &mut self,
        min_bp: u8,
    ) -> Result<Expr, ParseError> {
        let mut left = self.parse_prefix()?;

        loop {
            let next = self.peek().map(|t| &t.kind);
            let (bp, infix, width) = match infix_binding_power(self.current_kind(), next) {
                Some(entry) => entry,
                None => break,
            };
            if bp < min_bp {
                break;
            }
            for _ in 0..width {
                self.bump();
            }
            // All infix operators are left associative
            let right = self.parse_expression_bp(bp + 1)?;
            left = match infix {
                Infix::Or => Expr::Or(Box::new(left), Box::new(right)),
                Infix::And => Expr::And(Box::new(left), Box::new(right)),
                Infix::Compare(op) => Expr::Compare {
                    op,
                    lhs: Box::new(left),
                    rhs: Box::new(right),
                },
                Infix::Binary(op) => Expr::Binary {
                    op,
                    lhs: Box::new(left),
                    rhs: Box::new(right),
                },
            };
        }

        Ok(left)
    }

    /// Tokens that can never start an expression
    pub fn at_expression_end(&self) -> bool {
        matches!(
            self.current_kind(),
            TokenKind::Newline
                | TokenKind::Eof
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
                | TokenKind::Colon
                | TokenKind::Eq
                | TokenKind::KwIn
        )
    }
}
