//! Parser state and error handling

use crate::script::lexer::tokens::*;
use crate::util::span::Span;

/// Parse error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    /// Expected a specific token
    #[error("expected {expected}, found {found}")]
    ExpectedToken {
        expected: String,
        found: String,
        span: Span,
    },
    /// Unexpected token encountered
    #[error("unexpected {found}")]
    UnexpectedToken { found: String, span: Span },
    /// Generic parse error with message
    #[error("{message}")]
    Message { message: String, span: Span },
    /// The source could not be tokenized
    #[error(transparent)]
    Lex(#[from] LexError),
}

impl ParseError {
    /// Line of the generated program the error points at
    pub fn line(&self) -> usize {
        match self {
            ParseError::ExpectedToken { span, .. }
            | ParseError::UnexpectedToken { span, .. }
            | ParseError::Message { span, .. } => span.line(),
            ParseError::Lex(err) => err.position().line,
        }
    }
}

/// Parser state for Pratt parsing
pub struct ParserState<'a> {
    tokens: &'a [Token],
    pos: usize,
    /// Number of enclosing `for`/`while` bodies
    pub(crate) loop_depth: usize,
    /// Active expression recursion
    expr_depth: usize,
    /// Enclosing blocks
    block_depth: usize,
}

/// Deepest expression nesting accepted; deeper input would exhaust the stack
pub const MAX_EXPR_DEPTH: usize = 100;

/// Deepest block nesting accepted
pub const MAX_BLOCK_DEPTH: usize = 100;

impl<'a> ParserState<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            loop_depth: 0,
            expr_depth: 0,
            block_depth: 0,
        }
    }

    /// Run `parse` one expression level deeper
    pub(crate) fn nested_expression<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.expr_depth >= MAX_EXPR_DEPTH {
            return Err(self.error("expression is nested too deeply"));
        }
        self.expr_depth += 1;
        let result = parse(self);
        self.expr_depth -= 1;
        result
    }

    /// Run `parse` one block level deeper
    pub(crate) fn nested_block<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.block_depth >= MAX_BLOCK_DEPTH {
            return Err(self.error("too many levels of indentation"));
        }
        self.block_depth += 1;
        let result = parse(self);
        self.block_depth -= 1;
        result
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
            || matches!(self.current().map(|t| &t.kind), Some(TokenKind::Eof))
    }

    pub fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    pub fn current_kind(&self) -> &TokenKind {
        self.current().map(|t| &t.kind).unwrap_or(&TokenKind::Eof)
    }

    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1)
    }

    pub fn span(&self) -> Span {
        self.current()
            .map(|t| t.span)
            .or_else(|| self.tokens.last().map(|t| t.span))
            .unwrap_or(Span::dummy())
    }

    /// Line of the current token
    pub fn line(&self) -> usize {
        self.span().line()
    }

    pub fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned()?;
        self.pos += 1;
        Some(token)
    }

    pub fn at(
        &self,
        kind: &TokenKind,
    ) -> bool {
        self.current_kind() == kind
    }

    pub fn skip(
        &mut self,
        kind: &TokenKind,
    ) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub fn expect(
        &mut self,
        kind: &TokenKind,
    ) -> Result<(), ParseError> {
        if self.skip(kind) {
            Ok(())
        } else {
            Err(ParseError::ExpectedToken {
                expected: kind.describe(),
                found: self.current_kind().describe(),
                span: self.span(),
            })
        }
    }

    /// Consume an identifier and return its name
    pub fn expect_identifier(&mut self) -> Result<String, ParseError> {
        if let TokenKind::Identifier(name) = self.current_kind() {
            let name = name.clone();
            self.bump();
            Ok(name)
        } else {
            Err(ParseError::ExpectedToken {
                expected: "name".to_string(),
                found: self.current_kind().describe(),
                span: self.span(),
            })
        }
    }

    pub fn unexpected(&self) -> ParseError {
        ParseError::UnexpectedToken {
            found: self.current_kind().describe(),
            span: self.span(),
        }
    }

    pub fn error(
        &self,
        message: impl Into<String>,
    ) -> ParseError {
        ParseError::Message {
            message: message.into(),
            span: self.span(),
        }
    }
}
