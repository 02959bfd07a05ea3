//! Prefix ("null denotation") parsing: atoms and unary operators

use super::precedence::*;
use crate::script::lexer::tokens::*;
use crate::script::parser::ast::*;
use crate::script::parser::{ParseError, ParserState};

impl ParserState<'_> {
    /// Parse a prefix expression followed by its postfix chain
    pub fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        match self.current_kind() {
            TokenKind::KwNot => {
                self.bump();
                let operand = self.parse_expression_bp(BP_NOT)?;
                Ok(Expr::Not(Box::new(operand)))
            }
            TokenKind::Minus | TokenKind::Plus => {
                let op = if self.at(&TokenKind::Minus) {
                    UnaryOp::Neg
                } else {
                    UnaryOp::Pos
                };
                self.bump();
                let operand = self.parse_expression_bp(BP_UNARY)?;
                Ok(Expr::Unary {
                    op,
                    operand: Box::new(operand),
                })
            }
            _ => {
                let atom = self.parse_atom()?;
                self.parse_postfix(atom)
            }
        }
    }

    fn parse_atom(&mut self) -> Result<Expr, ParseError> {
        let kind = self.current_kind().clone();
        let expr = match kind {
            TokenKind::IntLiteral(n) => {
                self.bump();
                Expr::Literal(Literal::Int(n))
            }
            TokenKind::FloatLiteral(f) => {
                self.bump();
                Expr::Literal(Literal::Float(f))
            }
            TokenKind::BoolLiteral(b) => {
                self.bump();
                Expr::Literal(Literal::Bool(b))
            }
            TokenKind::NoneLiteral => {
                self.bump();
                Expr::Literal(Literal::None)
            }
            TokenKind::StringLiteral(s) => {
                self.bump();
                // Adjacent string literals concatenate
                let mut value = s;
                while let TokenKind::StringLiteral(next) = self.current_kind() {
                    value.push_str(next);
                    self.bump();
                }
                Expr::Literal(Literal::Str(value))
            }
            TokenKind::Identifier(name) => {
                self.bump();
                Expr::Name(name)
            }
            TokenKind::LParen => self.parse_paren()?,
            TokenKind::LBracket => {
                self.bump();
                let items = self.parse_comma_separated(&TokenKind::RBracket)?;
                Expr::List(items)
            }
            TokenKind::LBrace => self.parse_dict()?,
            _ => {
                return Err(ParseError::ExpectedToken {
                    expected: "expression".to_string(),
                    found: kind.describe(),
                    span: self.span(),
                })
            }
        };
        Ok(expr)
    }

    /// `( )`, `(expr)` or `(a, b, ...)`
    fn parse_paren(&mut self) -> Result<Expr, ParseError> {
        self.expect(&TokenKind::LParen)?;
        if self.skip(&TokenKind::RParen) {
            return Ok(Expr::Tuple(Vec::new()));
        }
        let first = self.parse_expression()?;
        if self.skip(&TokenKind::RParen) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.skip(&TokenKind::Comma) {
            if self.at(&TokenKind::RParen) {
                break;
            }
            items.push(self.parse_expression()?);
        }
        self.expect(&TokenKind::RParen)?;
        Ok(Expr::Tuple(items))
    }

    fn parse_dict(&mut self) -> Result<Expr, ParseError> {
        self.expect(&TokenKind::LBrace)?;
        let mut entries = Vec::new();
        while !self.at(&TokenKind::RBrace) {
            let key = self.parse_expression()?;
            self.expect(&TokenKind::Colon)?;
            let value = self.parse_expression()?;
            entries.push((key, value));
            if !self.skip(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(Expr::Dict(entries))
    }

    /// Expressions separated by commas up to (and consuming) `close`
    pub fn parse_comma_separated(
        &mut self,
        close: &TokenKind,
    ) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        while !self.at(close) {
            items.push(self.parse_expression()?);
            if !self.skip(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(close)?;
        Ok(items)
    }
}
