//! Postfix parsing: calls, subscripts, slices and attribute access

use crate::script::lexer::tokens::*;
use crate::script::parser::ast::*;
use crate::script::parser::{ParseError, ParserState};

impl ParserState<'_> {
    /// Apply any number of postfix operators to `expr`
    pub fn parse_postfix(
        &mut self,
        mut expr: Expr,
    ) -> Result<Expr, ParseError> {
        loop {
            expr = match self.current_kind() {
                TokenKind::LParen => {
                    self.bump();
                    let (args, kwargs) = self.parse_call_args()?;
                    Expr::Call {
                        func: Box::new(expr),
                        args,
                        kwargs,
                    }
                }
                TokenKind::LBracket => {
                    self.bump();
                    self.parse_subscript(expr)?
                }
                TokenKind::Dot => {
                    self.bump();
                    let name = self.expect_identifier()?;
                    Expr::Attribute {
                        object: Box::new(expr),
                        name,
                    }
                }
                _ => return Ok(expr),
            };
        }
    }

    /// Arguments after `(`, consuming the closing `)`
    fn parse_call_args(&mut self) -> Result<(Vec<Expr>, Vec<(String, Expr)>), ParseError> {
        let mut args = Vec::new();
        let mut kwargs: Vec<(String, Expr)> = Vec::new();

        while !self.at(&TokenKind::RParen) {
            let is_keyword = matches!(self.current_kind(), TokenKind::Identifier(_))
                && matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Eq));
            if is_keyword {
                let name = self.expect_identifier()?;
                self.expect(&TokenKind::Eq)?;
                let value = self.parse_expression()?;
                if kwargs.iter().any(|(existing, _)| *existing == name) {
                    return Err(self.error(format!("keyword argument repeated: {}", name)));
                }
                kwargs.push((name, value));
            } else {
                if !kwargs.is_empty() {
                    return Err(self.error("positional argument follows keyword argument"));
                }
                args.push(self.parse_expression()?);
            }
            if !self.skip(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok((args, kwargs))
    }

    /// `[index]` or `[start:end]` after the opening bracket
    fn parse_subscript(
        &mut self,
        object: Expr,
    ) -> Result<Expr, ParseError> {
        let start = if self.at(&TokenKind::Colon) {
            None
        } else {
            Some(self.parse_expression()?)
        };

        if self.skip(&TokenKind::Colon) {
            let end = if self.at(&TokenKind::RBracket) {
                None
            } else {
                Some(Box::new(self.parse_expression()?))
            };
            self.expect(&TokenKind::RBracket)?;
            return Ok(Expr::Slice {
                object: Box::new(object),
                start: start.map(Box::new),
                end,
            });
        }

        self.expect(&TokenKind::RBracket)?;
        match start {
            Some(index) => Ok(Expr::Index {
                object: Box::new(object),
                index: Box::new(index),
            }),
            None => Err(self.error("empty subscript")),
        }
    }
}
