//! Statement parsing
//!
//! Blocks are delimited by the layout tokens produced by the lexer:
//! `:` NEWLINE INDENT ... DEDENT. A header followed directly by NEWLINE with
//! no INDENT is an empty block, which templates produce for tags such as
//! `<% if x: %><% end %>`.

use super::pratt::augmented_op;
use crate::script::lexer::tokens::*;
use crate::script::parser::ast::*;
use crate::script::parser::{ParseError, ParserState};

impl ParserState<'_> {
    /// Parse statements until end of input
    pub fn parse_program(&mut self) -> Result<Block, ParseError> {
        let mut stmts = Vec::new();
        while !self.at_end() {
            if self.skip(&TokenKind::Newline) {
                continue;
            }
            stmts.push(self.parse_statement()?);
        }
        Ok(stmts)
    }

    pub fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        let kind = match self.current_kind() {
            TokenKind::KwIf => self.parse_if()?,
            TokenKind::KwFor => self.parse_for()?,
            TokenKind::KwWhile => self.parse_while()?,
            TokenKind::KwTry => self.parse_try()?,
            TokenKind::KwWith => self.parse_with()?,
            TokenKind::KwElif | TokenKind::KwElse | TokenKind::KwExcept | TokenKind::KwFinally => {
                return Err(self.error(format!(
                    "{} without a matching block",
                    keyword_name(self.current_kind())
                )));
            }
            TokenKind::Indent => return Err(self.error("unexpected indent")),
            TokenKind::Dedent => return Err(self.unexpected()),
            _ => {
                let kind = self.parse_simple_statement()?;
                self.expect_statement_end()?;
                kind
            }
        };
        Ok(Stmt { kind, line })
    }

    fn expect_statement_end(&mut self) -> Result<(), ParseError> {
        if self.skip(&TokenKind::Newline) || self.at_end() {
            Ok(())
        } else {
            Err(ParseError::ExpectedToken {
                expected: "end of line".to_string(),
                found: self.current_kind().describe(),
                span: self.span(),
            })
        }
    }

    /// Statements that fit on one line
    fn parse_simple_statement(&mut self) -> Result<StmtKind, ParseError> {
        match self.current_kind() {
            TokenKind::KwPass => {
                self.bump();
                return Ok(StmtKind::Pass);
            }
            TokenKind::KwBreak | TokenKind::KwContinue => {
                let is_break = self.at(&TokenKind::KwBreak);
                let keyword = if is_break { "'break'" } else { "'continue'" };
                if self.loop_depth == 0 {
                    return Err(self.error(format!("{} outside loop", keyword)));
                }
                self.bump();
                return Ok(if is_break {
                    StmtKind::Break
                } else {
                    StmtKind::Continue
                });
            }
            TokenKind::KwRaise => {
                self.bump();
                if self.at(&TokenKind::Newline) || self.at_end() {
                    return Ok(StmtKind::Raise(None));
                }
                return Ok(StmtKind::Raise(Some(self.parse_expression()?)));
            }
            _ => {}
        }

        let expr = self.parse_expression_list()?;

        if self.skip(&TokenKind::Eq) {
            let target = self.expr_to_target(expr)?;
            let value = self.parse_expression_list()?;
            return Ok(StmtKind::Assign { target, value });
        }

        if let Some(op) = augmented_op(self.current_kind()) {
            self.bump();
            let target = self.expr_to_target(expr)?;
            if matches!(target, Target::Unpack(_)) {
                return Err(self.error("illegal expression for augmented assignment"));
            }
            let value = self.parse_expression()?;
            return Ok(StmtKind::AugAssign { target, op, value });
        }

        Ok(StmtKind::Expr(expr))
    }

    /// Convert the left-hand side of an assignment into a target
    fn expr_to_target(
        &self,
        expr: Expr,
    ) -> Result<Target, ParseError> {
        match expr {
            Expr::Name(name) => Ok(Target::Name(name)),
            Expr::Index { object, index } => Ok(Target::Index {
                object: *object,
                index: *index,
            }),
            Expr::Tuple(items) => {
                let mut names = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Expr::Name(name) => names.push(name),
                        _ => return Err(self.error("cannot assign to expression")),
                    }
                }
                Ok(Target::Unpack(names))
            }
            _ => Err(self.error("cannot assign to expression")),
        }
    }

    /// `:` followed by an indented block, an empty block, or one simple statement
    fn parse_block(&mut self) -> Result<Block, ParseError> {
        self.expect(&TokenKind::Colon)?;

        if !self.at(&TokenKind::Newline) {
            let line = self.line();
            let kind = self.parse_simple_statement()?;
            self.expect_statement_end()?;
            return Ok(vec![Stmt { kind, line }]);
        }
        self.bump();

        if !self.skip(&TokenKind::Indent) {
            return Ok(Vec::new());
        }

        self.nested_block(|state| {
            let mut stmts = Vec::new();
            while !state.skip(&TokenKind::Dedent) {
                if state.at_end() {
                    break;
                }
                if state.skip(&TokenKind::Newline) {
                    continue;
                }
                stmts.push(state.parse_statement()?);
            }
            Ok(stmts)
        })
    }

    fn parse_if(&mut self) -> Result<StmtKind, ParseError> {
        self.expect(&TokenKind::KwIf)?;
        let mut branches = Vec::new();
        let condition = self.parse_expression()?;
        let body = self.parse_block()?;
        branches.push((condition, body));

        let mut orelse = None;
        loop {
            if self.skip(&TokenKind::KwElif) {
                let condition = self.parse_expression()?;
                let body = self.parse_block()?;
                branches.push((condition, body));
            } else if self.skip(&TokenKind::KwElse) {
                orelse = Some(self.parse_block()?);
                break;
            } else {
                break;
            }
        }

        Ok(StmtKind::If { branches, orelse })
    }

    fn parse_for(&mut self) -> Result<StmtKind, ParseError> {
        self.expect(&TokenKind::KwFor)?;
        let mut names = vec![self.expect_identifier()?];
        while self.skip(&TokenKind::Comma) {
            names.push(self.expect_identifier()?);
        }
        let target = if names.len() == 1 {
            Target::Name(names.remove(0))
        } else {
            Target::Unpack(names)
        };
        self.expect(&TokenKind::KwIn)?;
        let iter = self.parse_expression_list()?;
        let body = self.parse_loop_body()?;
        Ok(StmtKind::For { target, iter, body })
    }

    fn parse_while(&mut self) -> Result<StmtKind, ParseError> {
        self.expect(&TokenKind::KwWhile)?;
        let condition = self.parse_expression()?;
        let body = self.parse_loop_body()?;
        Ok(StmtKind::While { condition, body })
    }

    fn parse_loop_body(&mut self) -> Result<Block, ParseError> {
        self.loop_depth += 1;
        let body = self.parse_block();
        self.loop_depth -= 1;
        body
    }

    fn parse_try(&mut self) -> Result<StmtKind, ParseError> {
        self.expect(&TokenKind::KwTry)?;
        let body = self.parse_block()?;

        let mut handlers = Vec::new();
        while self.at(&TokenKind::KwExcept) {
            let line = self.line();
            self.bump();
            let matcher = if self.at(&TokenKind::Colon) {
                None
            } else {
                Some(self.parse_expression()?)
            };
            let name = if self.skip(&TokenKind::KwAs) {
                Some(self.expect_identifier()?)
            } else {
                None
            };
            let body = self.parse_block()?;
            handlers.push(ExceptHandler {
                matcher,
                name,
                body,
                line,
            });
        }

        let finally = if self.skip(&TokenKind::KwFinally) {
            Some(self.parse_block()?)
        } else {
            None
        };

        if handlers.is_empty() && finally.is_none() {
            return Err(self.error("expected 'except' or 'finally' block"));
        }

        Ok(StmtKind::Try {
            body,
            handlers,
            finally,
        })
    }

    fn parse_with(&mut self) -> Result<StmtKind, ParseError> {
        self.expect(&TokenKind::KwWith)?;
        let context = self.parse_expression()?;
        let name = if self.skip(&TokenKind::KwAs) {
            Some(self.expect_identifier()?)
        } else {
            None
        };
        let body = self.parse_block()?;
        Ok(StmtKind::With {
            context,
            name,
            body,
        })
    }
}

fn keyword_name(kind: &TokenKind) -> &'static str {
    match kind {
        TokenKind::KwElif => "'elif'",
        TokenKind::KwElse => "'else'",
        TokenKind::KwExcept => "'except'",
        TokenKind::KwFinally => "'finally'",
        _ => "keyword",
    }
}
