//! Script parser
//!
//! Recursive descent for statements, Pratt parsing for expressions.

pub mod ast;
pub mod parser_state;
pub mod pratt;
pub mod statements;

#[cfg(test)]
mod tests;

pub use ast::*;
pub use parser_state::{ParseError, ParserState};

use crate::script::lexer::tokenize;

/// Parse program text into a block of statements
pub fn parse(source: &str) -> Result<Block, ParseError> {
    let tokens = tokenize(source)?;
    let mut state = ParserState::new(&tokens);
    let program = state.parse_program()?;
    tracing::trace!(statements = program.len(), "parsed program");
    Ok(program)
}

/// Parse a single expression (used by tests and the CLI's `--var` evaluation)
pub fn parse_expression(source: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(source)?;
    let mut state = ParserState::new(&tokens);
    let expr = state.parse_expression()?;
    state.skip(&crate::script::lexer::TokenKind::Newline);
    if !state.at_end() {
        return Err(state.unexpected());
    }
    Ok(expr)
}
