//! Script lexer
//!
//! Turns generated program text into tokens, including the layout tokens
//! (`Newline`, `Indent`, `Dedent`) that carry block structure.

pub mod literals;
pub mod state;
pub mod tokenizer;
pub mod tokens;


// Re-export types
pub use tokenizer::Lexer;
pub use tokens::{LexError, Token, TokenKind};

/// Tokenize source code
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    tracing::trace!(bytes = source.len(), "lexing program");

    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();

    while let Some(token) = lexer.next_token()? {
        let is_eof = matches!(token.kind, TokenKind::Eof);
        tokens.push(token);
        if is_eof {
            break;
        }
    }

    tracing::trace!(count = tokens.len(), "lexing complete");
    Ok(tokens)
}
