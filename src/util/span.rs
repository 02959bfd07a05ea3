//! Source location tracking

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Source position (line, column, and byte offset)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
    /// Byte offset from start of file
    pub offset: usize,
}

impl Position {
    /// Create a new position
    #[inline]
    pub fn new(
        line: usize,
        column: usize,
    ) -> Self {
        Self {
            line,
            column,
            offset: 0,
        }
    }

    /// Create a new position with offset
    #[inline]
    pub fn with_offset(
        line: usize,
        column: usize,
        offset: usize,
    ) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }

    /// Create a dummy position
    #[inline]
    pub fn dummy() -> Self {
        Self {
            line: 0,
            column: 0,
            offset: 0,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Source span (start position to end position)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// Start position (inclusive)
    pub start: Position,
    /// End position (exclusive)
    pub end: Position,
}

impl Span {
    /// Create a new span
    #[inline]
    pub fn new(
        start: Position,
        end: Position,
    ) -> Self {
        Self { start, end }
    }

    /// Create a dummy span
    #[inline]
    pub fn dummy() -> Self {
        Self {
            start: Position::dummy(),
            end: Position::dummy(),
        }
    }

    /// Check if this is a dummy span
    #[inline]
    pub fn is_dummy(&self) -> bool {
        self.start.line == 0
    }

    /// Line the span starts on
    #[inline]
    pub fn line(&self) -> usize {
        self.start.line
    }
}

impl fmt::Display for Span {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "[{} - {}]", self.start, self.end)
    }
}

/// Line-indexed view over a piece of source text
///
/// Used to cut numbered excerpts (`0007 : text`) out of generated programs
/// for diagnostics.
#[derive(Debug, Clone)]
pub struct SourceFile<'a> {
    lines: Vec<&'a str>,
}

impl<'a> SourceFile<'a> {
    /// Index the lines of `content`
    pub fn new(content: &'a str) -> Self {
        Self {
            lines: content.lines().collect(),
        }
    }

    /// Number of lines
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Get a 1-indexed line
    pub fn line(
        &self,
        line: usize,
    ) -> Option<&'a str> {
        line.checked_sub(1).and_then(|i| self.lines.get(i).copied())
    }

    /// Render the 0-indexed line range as numbered rows, clamped to the file
    pub fn excerpt(
        &self,
        range: Range<usize>,
    ) -> String {
        let end = range.end.min(self.lines.len());
        let start = range.start.min(end);
        self.lines[start..end]
            .iter()
            .enumerate()
            .map(|(i, text)| format!("{:04} : {}", start + i + 1, text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Lines 1..=`line`, numbered
    pub fn excerpt_through(
        &self,
        line: usize,
    ) -> String {
        self.excerpt(0..line)
    }

    /// `radius` lines of context on each side of a 1-indexed line
    pub fn window(
        &self,
        line: usize,
        radius: usize,
    ) -> String {
        let start = line.saturating_sub(radius);
        self.excerpt(start..line + radius)
    }
}
