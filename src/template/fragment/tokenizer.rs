//! Fragment lexer
//!
//! A byte-level state machine with explicit quote states. All markers are
//! ASCII, so every offset it slices at is a char boundary.

use super::tokens::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    InString { quote: u8, start: usize },
}

pub struct FragmentLexer<'a> {
    body: &'a str,
    bytes: &'a [u8],
    pos: usize,
    /// Start of the pending run of `Other` text
    other_start: usize,
    /// Only whitespace seen since the last statement boundary
    at_statement_start: bool,
    state: State,
    fragments: Vec<Fragment>,
}

impl<'a> FragmentLexer<'a> {
    pub fn new(body: &'a str) -> Self {
        Self {
            body,
            bytes: body.as_bytes(),
            pos: 0,
            other_start: 0,
            at_statement_start: true,
            state: State::Normal,
            fragments: Vec::new(),
        }
    }

    /// Classify the whole body
    pub fn tokenize(mut self) -> Vec<Fragment> {
        while self.pos < self.bytes.len() {
            match self.state {
                State::Normal => self.step_normal(),
                State::InString { quote, start } => self.step_string(quote, start),
            }
        }
        // An unterminated quote leaves its text in the pending `Other` run
        self.flush_other(self.bytes.len());
        self.fragments
    }

    fn step_normal(&mut self) {
        let c = self.bytes[self.pos];

        if self.at_statement_start {
            if c.is_ascii_whitespace() {
                self.pos += 1;
                return;
            }
            if let Some(end) = self.block_keyword_end(self.pos) {
                self.emit(FragmentKind::BlockKeyword, self.pos, end);
                self.at_statement_start = false;
                return;
            }
        }

        match c {
            b'"' | b'\'' => {
                self.state = State::InString {
                    quote: c,
                    start: self.pos,
                };
                self.pos += 1;
            }
            b'{' if self.peek_is(b':') => {
                self.emit(FragmentKind::IndentStart, self.pos, self.pos + 2);
                self.at_statement_start = true;
            }
            b':' if self.peek_is(b'}') => {
                self.emit(FragmentKind::IndentEnd, self.pos, self.pos + 2);
                self.at_statement_start = true;
            }
            b'e' if self.is_end_word(self.pos) => {
                self.emit(FragmentKind::IndentEnd, self.pos, self.pos + 3);
                self.at_statement_start = true;
            }
            b';' => {
                self.emit(FragmentKind::StatementSeparator, self.pos, self.pos + 1);
                self.at_statement_start = true;
            }
            b'\n' => {
                self.pos += 1;
                self.at_statement_start = true;
            }
            c => {
                self.pos += 1;
                if !c.is_ascii_whitespace() {
                    self.at_statement_start = false;
                }
            }
        }
    }

    fn step_string(
        &mut self,
        quote: u8,
        start: usize,
    ) {
        match self.bytes[self.pos] {
            b'\\' => self.pos += 2,
            c if c == quote => {
                self.state = State::Normal;
                self.emit(FragmentKind::String, start, self.pos + 1);
                self.at_statement_start = false;
            }
            _ => self.pos += 1,
        }
    }

    fn peek_is(
        &self,
        expected: u8,
    ) -> bool {
        self.bytes.get(self.pos + 1) == Some(&expected)
    }

    /// Flush pending `Other` text up to `start`, then push `kind` for `start..end`
    fn emit(
        &mut self,
        kind: FragmentKind,
        start: usize,
        end: usize,
    ) {
        self.flush_other(start);
        let end = end.min(self.bytes.len());
        self.fragments.push(Fragment::new(kind, &self.body[start..end], self.line_of(start)));
        self.pos = end;
        self.other_start = end;
    }

    fn flush_other(
        &mut self,
        end: usize,
    ) {
        if self.other_start < end {
            let start = self.other_start;
            self.fragments.push(Fragment::new(
                FragmentKind::Other,
                &self.body[start..end],
                self.line_of(start),
            ));
            self.other_start = end;
        }
    }

    fn line_of(
        &self,
        offset: usize,
    ) -> usize {
        self.bytes[..offset].iter().filter(|&&b| b == b'\n').count()
    }

    /// `end` standing alone between whitespace, `;` or the body edges
    fn is_end_word(
        &self,
        at: usize,
    ) -> bool {
        if !self.body[at..].starts_with("end") {
            return false;
        }
        let before_ok = at == 0 || matches!(self.bytes[at - 1], b';') || self.bytes[at - 1].is_ascii_whitespace();
        let after_ok = match self.bytes.get(at + 3) {
            None => true,
            Some(&b) => b == b';' || b.is_ascii_whitespace(),
        };
        before_ok && after_ok
    }

    /// End offset (after the colon) of a continuation keyword line starting at `at`
    fn block_keyword_end(
        &self,
        at: usize,
    ) -> Option<usize> {
        let rest = &self.body[at..];
        let keyword = CONTINUATION_KEYWORDS.iter().find(|kw| {
            rest.starts_with(*kw)
                && !rest[kw.len()..]
                    .bytes()
                    .next()
                    .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80)
        })?;

        let mut depth = 0usize;
        let mut i = at + keyword.len();
        while i < self.bytes.len() {
            match self.bytes[i] {
                quote @ (b'"' | b'\'') => i = closing_quote(self.bytes, i, quote)? + 1,
                b'(' | b'[' | b'{' => {
                    depth += 1;
                    i += 1;
                }
                b')' | b']' | b'}' => {
                    depth = depth.saturating_sub(1);
                    i += 1;
                }
                b'\n' if depth == 0 => return None,
                b':' if depth == 0 && self.bytes[i - 1] != b'{' => return Some(i + 1),
                _ => i += 1,
            }
        }
        None
    }
}

fn closing_quote(
    bytes: &[u8],
    open: usize,
    quote: u8,
) -> Option<usize> {
    let mut i = open + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return Some(i),
            _ => i += 1,
        }
    }
    None
}
