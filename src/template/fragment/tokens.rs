//! Fragment token types

/// Classification of a piece of a statement tag body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    /// Quoted string, passed through untouched
    String,
    /// `else:`, `elif cond:`, `except E as e:`, `finally:`
    BlockKeyword,
    /// `{:`
    IndentStart,
    /// `:}` or a standalone `end`
    IndentEnd,
    /// `;`
    StatementSeparator,
    /// Any other code
    Other,
}

/// A classified piece of a tag body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub kind: FragmentKind,
    pub text: String,
    /// Newlines in the body before this fragment starts
    pub line_offset: usize,
}

impl Fragment {
    pub fn new(
        kind: FragmentKind,
        text: impl Into<String>,
        line_offset: usize,
    ) -> Self {
        Self {
            kind,
            text: text.into(),
            line_offset,
        }
    }
}

/// Keywords that continue the enclosing block
pub const CONTINUATION_KEYWORDS: [&str; 4] = ["else", "elif", "except", "finally"];
