//! Lexer state management
//! Keyword recognition and the indentation stack

use crate::script::lexer::tokens::TokenKind;

/// Lexer state management
pub struct LexerState {
    /// Open indentation widths, innermost last. Never empty.
    indent_stack: Vec<usize>,
    /// Nesting depth of `(`, `[` and `{`
    bracket_stack: Vec<char>,
}

impl LexerState {
    /// Create new lexer state
    pub fn new() -> Self {
        Self {
            indent_stack: vec![0],
            bracket_stack: Vec::new(),
        }
    }

    /// Convert string to keyword token
    pub fn keyword_from_str(
        &self,
        s: &str,
    ) -> Option<TokenKind> {
        match s {
            // Control flow keywords
            "if" => Some(TokenKind::KwIf),
            "elif" => Some(TokenKind::KwElif),
            "else" => Some(TokenKind::KwElse),
            "for" => Some(TokenKind::KwFor),
            "in" => Some(TokenKind::KwIn),
            "while" => Some(TokenKind::KwWhile),
            "break" => Some(TokenKind::KwBreak),
            "continue" => Some(TokenKind::KwContinue),
            "pass" => Some(TokenKind::KwPass),

            // Exception handling
            "try" => Some(TokenKind::KwTry),
            "except" => Some(TokenKind::KwExcept),
            "finally" => Some(TokenKind::KwFinally),
            "raise" => Some(TokenKind::KwRaise),

            // Context blocks
            "with" => Some(TokenKind::KwWith),
            "as" => Some(TokenKind::KwAs),

            // Operators spelled as words
            "and" => Some(TokenKind::KwAnd),
            "or" => Some(TokenKind::KwOr),
            "not" => Some(TokenKind::KwNot),
            "is" => Some(TokenKind::KwIs),

            // Constants
            "True" | "true" => Some(TokenKind::BoolLiteral(true)),
            "False" | "false" => Some(TokenKind::BoolLiteral(false)),
            "None" | "none" => Some(TokenKind::NoneLiteral),

            _ => None,
        }
    }

    /// Width of the innermost indentation level
    pub fn current_indent(&self) -> usize {
        self.indent_stack.last().copied().unwrap_or(0)
    }

    /// Open a deeper indentation level
    pub fn push_indent(
        &mut self,
        width: usize,
    ) {
        self.indent_stack.push(width);
    }

    /// Close the innermost indentation level; the outermost level is never popped
    pub fn pop_indent(&mut self) -> Option<usize> {
        if self.indent_stack.len() > 1 {
            self.indent_stack.pop()
        } else {
            None
        }
    }

    /// Number of open indentation levels above column zero
    pub fn open_indents(&self) -> usize {
        self.indent_stack.len() - 1
    }

    pub fn open_bracket(
        &mut self,
        ch: char,
    ) {
        self.bracket_stack.push(ch);
    }

    /// Close a bracket, returning false when it does not match the opener
    pub fn close_bracket(
        &mut self,
        ch: char,
    ) -> bool {
        let expected = match ch {
            ')' => '(',
            ']' => '[',
            '}' => '{',
            _ => return false,
        };
        if self.bracket_stack.last() == Some(&expected) {
            self.bracket_stack.pop();
            true
        } else {
            false
        }
    }

    /// Inside brackets newlines and indentation are insignificant
    pub fn in_brackets(&self) -> bool {
        !self.bracket_stack.is_empty()
    }

    /// The most recently opened bracket that is still open
    pub fn innermost_bracket(&self) -> Option<char> {
        self.bracket_stack.last().copied()
    }
}

impl Default for LexerState {
    fn default() -> Self {
        Self::new()
    }
}
