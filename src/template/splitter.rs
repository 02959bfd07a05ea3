//! Delimiter splitter
//!
//! Cuts template text into alternating literal and tag segments. Openers are
//! tried leftmost-first in this order: `<%=r ` (raw print), `<%=` (print),
//! `<%-` (statement trimming the indentation before it), `<%` (statement).
//! `<%%` never opens a tag. Closers are `-%>` (also eats one following
//! newline) and `%>`; quoted strings inside a body are opaque.

use crate::error::TemplateError;

/// What a tag does with its body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    /// `<%= expr %>` or `<%=r expr %>`
    Print { raw: bool },
    /// `<% code %>`
    Statement,
}

/// One `<% ... %>` tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub kind: TagKind,
    pub body: String,
    /// 1-based template line of the opener
    pub line: usize,
    pub trim_leading_whitespace: bool,
    pub trim_trailing_newline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text with `<%%` and `%%>` already unescaped
    Literal { text: String, line: usize },
    Tag(Tag),
}

/// Lazy iterator over the segments of a template
pub struct Splitter<'a> {
    name: &'a str,
    text: &'a str,
    pos: usize,
    line: usize,
    pending: Option<Segment>,
    finished: bool,
}

impl<'a> Splitter<'a> {
    pub fn new(
        name: &'a str,
        text: &'a str,
    ) -> Self {
        Self {
            name,
            text,
            pos: 0,
            line: 1,
            pending: None,
            finished: false,
        }
    }

    /// Byte offset of the next opener at or after `from`
    fn find_opener(
        &self,
        from: usize,
    ) -> Option<usize> {
        let mut search = from;
        while let Some(found) = self.text[search..].find("<%") {
            let at = search + found;
            if self.text[at + 2..].starts_with('%') {
                search = at + 3;
                continue;
            }
            return Some(at);
        }
        None
    }

    /// Advance `pos` to `to`, counting the newlines crossed
    fn advance_to(
        &mut self,
        to: usize,
    ) {
        self.line += self.text[self.pos..to].matches('\n').count();
        self.pos = to;
    }

    /// Scan a tag starting at `open`; returns the segment and the offset after it
    fn scan_tag(
        &self,
        open: usize,
    ) -> Result<(Tag, usize), TemplateError> {
        let rest = &self.text[open..];
        let (kind, opener_len, trim_requested) = if rest.starts_with("<%=r ") {
            (TagKind::Print { raw: true }, 5, false)
        } else if rest.starts_with("<%=") {
            (TagKind::Print { raw: false }, 3, false)
        } else if rest.starts_with("<%-") {
            (TagKind::Statement, 3, true)
        } else {
            (TagKind::Statement, 2, false)
        };

        let bytes = self.text.as_bytes();
        let mut body = String::new();
        let mut i = open + opener_len;
        let mut chunk_start = i;

        while i < bytes.len() {
            match bytes[i] {
                quote @ (b'"' | b'\'') => {
                    if let Some(end) = closing_quote(bytes, i, quote) {
                        i = end + 1;
                    } else {
                        i += 1;
                    }
                }
                b'%' if self.text[i..].starts_with("%%>") => {
                    body.push_str(&self.text[chunk_start..i]);
                    body.push_str("%>");
                    i += 3;
                    chunk_start = i;
                }
                b'-' if self.text[i..].starts_with("-%>") => {
                    body.push_str(&self.text[chunk_start..i]);
                    let mut after = i + 3;
                    if self.text[after..].starts_with("\r\n") {
                        after += 2;
                    } else if self.text[after..].starts_with('\n') {
                        after += 1;
                    }
                    let tag = Tag {
                        kind,
                        body,
                        line: self.line_at(open),
                        trim_leading_whitespace: trim_requested,
                        trim_trailing_newline: true,
                    };
                    return Ok((tag, after));
                }
                b'%' if self.text[i..].starts_with("%>") => {
                    body.push_str(&self.text[chunk_start..i]);
                    let tag = Tag {
                        kind,
                        body,
                        line: self.line_at(open),
                        trim_leading_whitespace: trim_requested,
                        trim_trailing_newline: false,
                    };
                    return Ok((tag, i + 2));
                }
                _ => i += 1,
            }
        }

        let line = self.line_at(open);
        Err(TemplateError::structural(
            self.name,
            format!("unterminated tag opened at line {}", line),
            line,
            self.text,
        ))
    }

    fn line_at(
        &self,
        offset: usize,
    ) -> usize {
        self.line + self.text[self.pos..offset].matches('\n').count()
    }

    /// Start of the run of spaces and tabs ending at `end`, if it begins a line
    fn indentation_before(
        &self,
        end: usize,
    ) -> Option<usize> {
        let prefix = &self.text[..end];
        let start = prefix.trim_end_matches([' ', '\t']).len();
        if start == 0 || prefix[..start].ends_with('\n') {
            Some(start)
        } else {
            None
        }
    }
}

/// Offset of the quote closing the string opened at `open`, honoring backslashes
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

/// Restore `<%%` and `%%>` in literal text
fn unescape_literal(text: &str) -> String {
    text.replace("<%%", "<%").replace("%%>", "%>")
}

impl Iterator for Splitter<'_> {
    type Item = Result<Segment, TemplateError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(segment) = self.pending.take() {
            return Some(Ok(segment));
        }
        if self.finished {
            return None;
        }

        let Some(open) = self.find_opener(self.pos) else {
            self.finished = true;
            let text = &self.text[self.pos..];
            if text.is_empty() {
                return None;
            }
            let segment = Segment::Literal {
                text: unescape_literal(text),
                line: self.line,
            };
            self.advance_to(self.text.len());
            return Some(Ok(segment));
        };

        let (mut tag, after) = match self.scan_tag(open) {
            Ok(found) => found,
            Err(err) => {
                self.finished = true;
                return Some(Err(err));
            }
        };

        let mut literal_end = open;
        if tag.trim_leading_whitespace {
            match self.indentation_before(open) {
                Some(start) if start >= self.pos => literal_end = start,
                _ => tag.trim_leading_whitespace = false,
            }
        }

        let literal = &self.text[self.pos..literal_end];
        let literal = (!literal.is_empty()).then(|| Segment::Literal {
            text: unescape_literal(literal),
            line: self.line,
        });
        self.advance_to(after);

        match literal {
            Some(literal) => {
                self.pending = Some(Segment::Tag(tag));
                Some(Ok(literal))
            }
            None => Some(Ok(Segment::Tag(tag))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(text: &str) -> Vec<Segment> {
        Splitter::new("test", text).collect::<Result<Vec<_>, _>>().unwrap()
    }

    fn literal(
        text: &str,
        line: usize,
    ) -> Segment {
        Segment::Literal {
            text: text.to_string(),
            line,
        }
    }

    fn tag(segment: &Segment) -> &Tag {
        match segment {
            Segment::Tag(tag) => tag,
            other => panic!("expected tag, got {:?}", other),
        }
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(split("hello\nworld"), vec![literal("hello\nworld", 1)]);
        assert!(split("").is_empty());
    }

    #[test]
    fn test_tag_kinds() {
        let segments = split("a<%= x %>b<%=r y %>c<% z %>");
        assert_eq!(segments.len(), 6);
        assert_eq!(tag(&segments[1]).kind, TagKind::Print { raw: false });
        assert_eq!(tag(&segments[1]).body, " x ");
        assert_eq!(tag(&segments[3]).kind, TagKind::Print { raw: true });
        assert_eq!(tag(&segments[3]).body, "y ");
        assert_eq!(tag(&segments[5]).kind, TagKind::Statement);
        assert_eq!(segments[4], literal("c", 1));
    }

    #[test]
    fn test_escapes_in_literal_text() {
        assert_eq!(split("<%% not a tag %%>"), vec![literal("<% not a tag %>", 1)]);
    }

    #[test]
    fn test_closer_inside_string_is_ignored() {
        let segments = split("<%= \"%>\" + '%>' %>!");
        assert_eq!(tag(&segments[0]).body, " \"%>\" + '%>' ");
        assert_eq!(segments[1], literal("!", 1));
    }

    #[test]
    fn test_unmatched_quote_is_ordinary() {
        let segments = split("<% x = \"a %>tail");
        assert_eq!(tag(&segments[0]).body, " x = \"a ");
        assert_eq!(segments[1], literal("tail", 1));
    }

    #[test]
    fn test_double_percent_closer_in_body() {
        let segments = split("<%= '100' + '%%>' %%> %>");
        assert_eq!(tag(&segments[0]).body, " '100' + '%%>' %> ");
    }

    #[test]
    fn test_trim_markers() {
        let segments = split("a\n  <%- if x: -%>\nb<% end %>");
        assert_eq!(segments[0], literal("a\n", 1));
        let t = tag(&segments[1]);
        assert!(t.trim_leading_whitespace);
        assert!(t.trim_trailing_newline);
        assert_eq!(t.line, 2);
        assert_eq!(segments[2], literal("b", 3));
    }

    #[test]
    fn test_trim_leading_needs_line_start() {
        let segments = split("a  <%- x %>");
        assert_eq!(segments[0], literal("a  ", 1));
        assert!(!tag(&segments[1]).trim_leading_whitespace);
    }

    #[test]
    fn test_tag_lines() {
        let segments = split("one\ntwo <% a %>\n\n<%= b\n %>");
        assert_eq!(tag(&segments[1]).line, 2);
        assert_eq!(segments[2], literal("\n\n", 2));
        assert_eq!(tag(&segments[3]).line, 4);
    }

    #[test]
    fn test_unterminated_tag() {
        let result: Result<Vec<_>, _> = Splitter::new("page", "ok\n<% if x:").collect();
        let err = result.unwrap_err();
        assert!(err.is_structural());
        assert!(err.to_string().contains("unterminated tag opened at line 2"));
    }
}
