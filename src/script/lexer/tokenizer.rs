//! Tokenizer implementation
//! Main lexer structure, layout tokens (NEWLINE / INDENT / DEDENT) and operators

use std::collections::VecDeque;
use std::iter::Peekable;
use std::str::Chars;

use super::literals::{is_digit, is_identifier_char, is_identifier_start, scan_number, scan_string};
use super::state::LexerState;
use crate::script::lexer::tokens::*;
use crate::util::span::{Position, Span};

/// Tab stops used when measuring indentation
const TAB_WIDTH: usize = 8;

/// Main lexer structure
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    offset: usize,
    line: usize,
    column: usize,
    start_offset: usize,
    start_line: usize,
    start_column: usize,
    state: LexerState,
    /// Layout tokens waiting to be handed out
    pending: VecDeque<Token>,
    at_line_start: bool,
    /// Whether the last emitted token ended a logical line
    last_was_newline: bool,
    finished: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            offset: 0,
            line: 1,
            column: 1,
            start_offset: 0,
            start_line: 1,
            start_column: 1,
            state: LexerState::new(),
            pending: VecDeque::new(),
            at_line_start: true,
            last_was_newline: true,
            finished: false,
        }
    }

    /// Get current position
    pub fn position(&self) -> Position {
        Position::with_offset(self.line, self.column, self.offset)
    }

    /// Get start position of current token
    pub fn start_position(&self) -> Position {
        Position::with_offset(self.start_line, self.start_column, self.start_offset)
    }

    /// Get span of current token
    pub fn span(&self) -> Span {
        Span::new(self.start_position(), self.position())
    }

    /// Advance to next character
    pub fn advance(&mut self) -> Option<char> {
        match self.chars.next() {
            Some('\n') => {
                self.offset += 1;
                self.line += 1;
                self.column = 1;
                Some('\n')
            }
            Some(c) => {
                self.offset += c.len_utf8();
                self.column += 1;
                Some(c)
            }
            None => None,
        }
    }

    /// Peek at next character
    pub fn peek(&mut self) -> Option<&char> {
        self.chars.peek()
    }

    /// Peek at character after next
    pub fn peek_next(&mut self) -> Option<char> {
        self.chars.clone().nth(1)
    }

    /// Get a clone of chars for lookahead operations
    pub fn chars_clone(&self) -> Peekable<Chars<'a>> {
        self.chars.clone()
    }

    /// Create token with current span
    pub fn make_token(
        &self,
        kind: TokenKind,
    ) -> Token {
        Token {
            kind,
            span: self.span(),
        }
    }

    fn mark_start(&mut self) {
        self.start_offset = self.offset;
        self.start_line = self.line;
        self.start_column = self.column;
    }

    /// Skip spaces and comments on the current line; never consumes the line break
    fn skip_inline_whitespace(&mut self) {
        while let Some(&c) = self.peek() {
            match c {
                ' ' | '\t' | '\r' | '\x0c' => {
                    self.advance();
                }
                '\\' if self.peek_next() == Some('\n') => {
                    // Explicit line continuation
                    self.advance();
                    self.advance();
                }
                '#' => {
                    while let Some(&c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    /// Measure the indentation of the next non-blank line and queue INDENT/DEDENT tokens
    fn scan_indentation(&mut self) -> Result<(), LexError> {
        loop {
            let mut width = 0;
            while let Some(&c) = self.peek() {
                match c {
                    ' ' => width += 1,
                    '\t' => width = (width / TAB_WIDTH + 1) * TAB_WIDTH,
                    '\r' | '\x0c' => {}
                    _ => break,
                }
                self.advance();
            }

            match self.peek() {
                // Blank or comment-only lines do not affect layout
                Some(&'\n') => {
                    self.advance();
                }
                Some(&'#') => {
                    self.skip_inline_whitespace();
                }
                None => return Ok(()),
                Some(_) => {
                    self.mark_start();
                    return self.apply_indentation(width);
                }
            }
        }
    }

    fn apply_indentation(
        &mut self,
        width: usize,
    ) -> Result<(), LexError> {
        let current = self.state.current_indent();
        if width > current {
            self.state.push_indent(width);
            self.pending.push_back(self.make_token(TokenKind::Indent));
        } else if width < current {
            while self.state.current_indent() > width {
                self.state.pop_indent();
                self.pending.push_back(self.make_token(TokenKind::Dedent));
            }
            if self.state.current_indent() != width {
                return Err(LexError::InconsistentDedent {
                    position: self.position(),
                });
            }
        }
        Ok(())
    }

    /// Close the token stream: final NEWLINE, outstanding DEDENTs, then EOF
    fn finish(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        self.mark_start();
        if !self.last_was_newline {
            self.pending.push_back(self.make_token(TokenKind::Newline));
        }
        while self.state.pop_indent().is_some() {
            self.pending.push_back(self.make_token(TokenKind::Dedent));
        }
        self.pending.push_back(self.make_token(TokenKind::Eof));
        self.finished = true;
        self.pending.pop_front()
    }

    /// Generate next token
    pub fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        let token = self.next_token_inner()?;
        if let Some(token) = &token {
            self.last_was_newline = matches!(token.kind, TokenKind::Newline);
        }
        Ok(token)
    }

    fn next_token_inner(&mut self) -> Result<Option<Token>, LexError> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Ok(Some(token));
            }
            if self.finished {
                return Ok(None);
            }

            if self.at_line_start && !self.state.in_brackets() {
                self.at_line_start = false;
                self.scan_indentation()?;
                if !self.pending.is_empty() {
                    continue;
                }
            }

            self.skip_inline_whitespace();
            self.mark_start();

            let c = match self.advance() {
                Some(c) => c,
                None => {
                    if let Some(open) = self.state.innermost_bracket() {
                        return Err(LexError::UnmatchedBracket {
                            ch: open,
                            position: self.position(),
                        });
                    }
                    return Ok(self.finish());
                }
            };

            if c == '\n' {
                if self.state.in_brackets() {
                    continue;
                }
                self.at_line_start = true;
                if self.last_was_newline {
                    continue;
                }
                return Ok(Some(self.make_token(TokenKind::Newline)));
            }

            return self.scan_token(c).map(Some);
        }
    }

    fn scan_token(
        &mut self,
        c: char,
    ) -> Result<Token, LexError> {
        let kind = match c {
            c if is_identifier_start(c) => return Ok(self.scan_identifier(c)),
            c if is_digit(c) => return scan_number(self, c),
            '"' | '\'' => return scan_string(self, c),
            '+' => self.with_eq(TokenKind::Plus, TokenKind::PlusEq),
            '-' => self.with_eq(TokenKind::Minus, TokenKind::MinusEq),
            '*' => self.with_eq(TokenKind::Star, TokenKind::StarEq),
            '/' => {
                if self.peek() == Some(&'/') {
                    self.advance();
                    TokenKind::SlashSlash
                } else {
                    TokenKind::Slash
                }
            }
            '%' => TokenKind::Percent,
            '=' => self.with_eq(TokenKind::Eq, TokenKind::EqEq),
            '!' => {
                if self.peek() == Some(&'=') {
                    self.advance();
                    TokenKind::Neq
                } else {
                    return Err(LexError::UnexpectedChar {
                        ch: '!',
                        position: self.start_position(),
                    });
                }
            }
            '<' => self.with_eq(TokenKind::Lt, TokenKind::Le),
            '>' => self.with_eq(TokenKind::Gt, TokenKind::Ge),
            '(' | '[' | '{' => {
                self.state.open_bracket(c);
                match c {
                    '(' => TokenKind::LParen,
                    '[' => TokenKind::LBracket,
                    _ => TokenKind::LBrace,
                }
            }
            ')' | ']' | '}' => {
                if !self.state.close_bracket(c) {
                    return Err(LexError::UnmatchedBracket {
                        ch: c,
                        position: self.start_position(),
                    });
                }
                match c {
                    ')' => TokenKind::RParen,
                    ']' => TokenKind::RBracket,
                    _ => TokenKind::RBrace,
                }
            }
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '.' => TokenKind::Dot,
            c => {
                return Err(LexError::UnexpectedChar {
                    ch: c,
                    position: self.start_position(),
                })
            }
        };
        Ok(self.make_token(kind))
    }

    /// `op` or, when followed by `=`, `op_eq`
    fn with_eq(
        &mut self,
        op: TokenKind,
        op_eq: TokenKind,
    ) -> TokenKind {
        if self.peek() == Some(&'=') {
            self.advance();
            op_eq
        } else {
            op
        }
    }

    /// Scan identifier token
    fn scan_identifier(
        &mut self,
        first_char: char,
    ) -> Token {
        let mut value = String::new();
        value.push(first_char);

        while let Some(&c) = self.peek() {
            if is_identifier_char(c) {
                value.push(c);
                self.advance();
            } else {
                break;
            }
        }

        match self.state.keyword_from_str(&value) {
            Some(kind) => self.make_token(kind),
            None => self.make_token(TokenKind::Identifier(value)),
        }
    }

    /// Number of indentation levels still open
    pub fn open_indents(&self) -> usize {
        self.state.open_indents()
    }
}
