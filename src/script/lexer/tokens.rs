//! Token types

use crate::util::span::{Position, Span};

/// Lexer error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexError {
    #[error("unterminated string starting at {position}")]
    UnterminatedString { position: Position },
    #[error("invalid escape sequence: {sequence}")]
    InvalidEscape { sequence: String, position: Position },
    #[error("invalid number literal: {literal}")]
    InvalidNumber { literal: String, position: Position },
    #[error("unexpected character: '{ch}'")]
    UnexpectedChar { ch: char, position: Position },
    #[error("unmatched '{ch}'")]
    UnmatchedBracket { ch: char, position: Position },
    #[error("unindent does not match any outer indentation level")]
    InconsistentDedent { position: Position },
}

impl LexError {
    /// Where the error was detected
    pub fn position(&self) -> Position {
        match self {
            LexError::UnterminatedString { position }
            | LexError::InvalidEscape { position, .. }
            | LexError::InvalidNumber { position, .. }
            | LexError::UnexpectedChar { position, .. }
            | LexError::UnmatchedBracket { position, .. }
            | LexError::InconsistentDedent { position } => *position,
        }
    }
}

/// Token kind
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Keywords
    KwIf,
    KwElif,
    KwElse,
    KwFor,
    KwIn,
    KwWhile,
    KwTry,
    KwExcept,
    KwFinally,
    KwRaise,
    KwPass,
    KwBreak,
    KwContinue,
    KwWith,
    KwAs,
    KwAnd,
    KwOr,
    KwNot,
    KwIs,

    // Identifiers
    Identifier(String),

    // Literals
    IntLiteral(i64),
    FloatLiteral(f64),
    StringLiteral(String),
    BoolLiteral(bool),
    NoneLiteral,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    SlashSlash,
    Percent,
    Eq,
    EqEq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    PlusEq,
    MinusEq,
    StarEq,

    // Delimiters
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,

    // Layout
    Newline,
    Indent,
    Dedent,
    Eof,
}

impl TokenKind {
    /// Short human readable description used in syntax errors
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Identifier(name) => format!("name '{}'", name),
            TokenKind::IntLiteral(n) => format!("number {}", n),
            TokenKind::FloatLiteral(f) => format!("number {}", f),
            TokenKind::StringLiteral(_) => "string literal".to_string(),
            TokenKind::Newline => "end of line".to_string(),
            TokenKind::Indent => "indent".to_string(),
            TokenKind::Dedent => "dedent".to_string(),
            TokenKind::Eof => "end of input".to_string(),
            other => format!("{:?}", other),
        }
    }
}

/// Token
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    /// Line the token starts on
    pub fn line(&self) -> usize {
        self.span.start.line
    }
}

impl From<TokenKind> for Token {
    fn from(kind: TokenKind) -> Self {
        Token {
            kind,
            span: Span::dummy(),
        }
    }
}
