//! Indentation tracker and code generator
//!
//! Turns template segments into script source. Nesting is inferred: a code
//! line ending in `:` opens a block, `else:`/`elif ...:`/`except ...:`/
//! `finally:` re-open the enclosing block one level out, and `<% %>`, `:}` or
//! `end` close it. Every generated line remembers the template line it came
//! from.

use crate::error::TemplateError;
use crate::template::fragment::{self, Fragment, FragmentKind};
use crate::template::splitter::{Segment, Splitter, Tag, TagKind};

/// Indentation of one nesting level
pub const INDENT: &str = "  ";
/// Callable the program writes output through
pub const APPEND_FN: &str = "__buffer_append";
/// Callable escaping printed values
pub const FILTER_FN: &str = "__filter";

/// Output of the generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub source: String,
    /// `line_map[n]` is the template line of generated line `n + 1`
    pub line_map: Vec<usize>,
}

pub struct CodeGenerator<'a> {
    name: &'a str,
    lines: Vec<String>,
    line_map: Vec<usize>,
    depth: usize,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(name: &'a str) -> Self {
        Self {
            name,
            lines: Vec::new(),
            line_map: Vec::new(),
            depth: 0,
        }
    }

    /// Generate the program source for `text`
    pub fn generate(
        name: &'a str,
        text: &str,
    ) -> Result<Generated, TemplateError> {
        let mut generator = CodeGenerator::new(name);
        for segment in Splitter::new(name, text) {
            generator.segment(segment?)?;
        }
        generator.finish()
    }

    pub fn segment(
        &mut self,
        segment: Segment,
    ) -> Result<(), TemplateError> {
        match segment {
            Segment::Literal { text, line } => {
                self.new_line(line);
                let code = format!("{}(\"\"\"{}\"\"\")", APPEND_FN, escape_literal(&text));
                self.push(&code, line);
                Ok(())
            }
            Segment::Tag(tag) => match tag.kind {
                TagKind::Print { raw } => self.print(&tag, raw),
                TagKind::Statement => self.statement(&tag),
            },
        }
    }

    fn print(
        &mut self,
        tag: &Tag,
        raw: bool,
    ) -> Result<(), TemplateError> {
        if tag.body.trim().is_empty() {
            return Err(self.error(format!("empty expression in print tag at template line {}", tag.line)));
        }
        self.new_line(tag.line);
        let code = if raw {
            format!("{}({})", APPEND_FN, tag.body)
        } else {
            format!("{}({}({}))", APPEND_FN, FILTER_FN, tag.body)
        };
        self.push(&code, tag.line);
        Ok(())
    }

    fn statement(
        &mut self,
        tag: &Tag,
    ) -> Result<(), TemplateError> {
        if tag.body.trim().is_empty() {
            self.dedent(|| format!("unexpected block end at template line {}", tag.line))?;
            self.new_line(tag.line);
            return Ok(());
        }

        self.new_line(tag.line);
        let fragments = fragment::tokenize(&tag.body);
        for (i, frag) in fragments.iter().enumerate() {
            let line = tag.line + frag.line_offset;
            match frag.kind {
                FragmentKind::String => self.push(&frag.text, line),
                FragmentKind::Other => self.other(frag, line, fragments.get(i + 1)),
                FragmentKind::IndentStart => {
                    self.push(":", line);
                    self.depth += 1;
                    self.new_line(line);
                }
                FragmentKind::IndentEnd => {
                    self.dedent(|| format!("unexpected block end at template line {}", line))?;
                    self.new_line(line);
                }
                FragmentKind::StatementSeparator => self.new_line(line),
                FragmentKind::BlockKeyword => {
                    let text = frag.text.trim_start();
                    let keyword = text.split(|c: char| !c.is_alphanumeric()).next().unwrap_or(text);
                    self.dedent(|| format!("'{}' outside of a block at template line {}", keyword, line))?;
                    self.new_line(line);
                    self.push(text, line);
                    self.depth += 1;
                }
            }
        }
        Ok(())
    }

    /// Emit plain code, one generated line per physical line
    fn other(
        &mut self,
        frag: &Fragment,
        line: usize,
        next: Option<&Fragment>,
    ) {
        let pieces: Vec<&str> = frag.text.split('\n').collect();
        for (k, piece) in pieces.iter().enumerate() {
            let piece = piece.strip_suffix('\r').unwrap_or(piece);
            if k > 0 {
                self.new_line(line + k);
            }
            let ends_line = k + 1 < pieces.len() || !matches!(next, Some(f) if f.kind == FragmentKind::String);
            let code = if ends_line {
                piece.trim()
            } else {
                piece.trim_start()
            };
            self.push(code, line + k);
            if ends_line && opens_block(code) {
                self.depth += 1;
            }
        }
    }

    fn dedent(
        &mut self,
        message: impl FnOnce() -> String,
    ) -> Result<(), TemplateError> {
        match self.depth.checked_sub(1) {
            Some(depth) => {
                self.depth = depth;
                Ok(())
            }
            None => Err(self.error(message())),
        }
    }

    /// Start a generated line at the current depth, reusing a blank last line
    fn new_line(
        &mut self,
        template_line: usize,
    ) {
        let indent = INDENT.repeat(self.depth);
        match self.lines.last_mut() {
            Some(last) if last.trim().is_empty() => {
                *last = indent;
                if let Some(mapped) = self.line_map.last_mut() {
                    *mapped = template_line;
                }
            }
            _ => {
                self.lines.push(indent);
                self.line_map.push(template_line);
            }
        }
    }

    /// Append to the current line; embedded newlines start unindented lines
    fn push(
        &mut self,
        text: &str,
        template_line: usize,
    ) {
        if self.lines.is_empty() {
            self.new_line(template_line);
        }
        let mut pieces = text.split('\n');
        if let Some(first) = pieces.next() {
            if let Some(current) = self.lines.last_mut() {
                current.push_str(first);
            }
        }
        for (k, piece) in pieces.enumerate() {
            self.lines.push(piece.to_string());
            self.line_map.push(template_line + k + 1);
        }
    }

    fn source(&self) -> String {
        self.lines.join("\n")
    }

    fn error(
        &self,
        message: String,
    ) -> TemplateError {
        TemplateError::structural(self.name, message, self.lines.len().max(1), &self.source())
    }

    pub fn finish(self) -> Result<Generated, TemplateError> {
        if self.depth != 0 {
            let plural = if self.depth == 1 { "" } else { "s" };
            return Err(self.error(format!("{} unclosed block{}", self.depth, plural)));
        }
        let mut source = self.source();
        source.push('\n');
        tracing::trace!(name = self.name, lines = self.lines.len(), "generated program source");
        Ok(Generated {
            source,
            line_map: self.line_map,
        })
    }
}

/// A code line ending in `:` (comments excluded) opens a block
fn opens_block(code: &str) -> bool {
    !code.starts_with('#') && code.trim_end().ends_with(':')
}

/// Make literal text safe inside a `"""..."""` string
pub fn escape_literal(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gen(text: &str) -> Generated {
        CodeGenerator::generate("test", text).unwrap()
    }

    fn gen_err(text: &str) -> String {
        CodeGenerator::generate("test", text).unwrap_err().to_string()
    }

    #[test]
    fn test_literal_and_prints() {
        let generated = gen("a\"b<%= x %><%=r y %>");
        assert_eq!(
            generated.source,
            "__buffer_append(\"\"\"a\\\"b\"\"\")\n__buffer_append(__filter( x ))\n__buffer_append(y )\n"
        );
        assert_eq!(generated.line_map, vec![1, 1, 1]);
    }

    #[test]
    fn test_implicit_block_and_end() {
        let generated = gen("<% if x: %>A<% end %>B");
        assert_eq!(
            generated.source,
            "if x:\n  __buffer_append(\"\"\"A\"\"\")\n__buffer_append(\"\"\"B\"\"\")\n"
        );
    }

    #[test]
    fn test_empty_tag_closes_block() {
        let generated = gen("<% for i in xs: %><%= i %><% %>");
        assert_eq!(generated.source, "for i in xs:\n  __buffer_append(__filter( i ))\n\n");
    }

    #[test]
    fn test_continuation_keywords() {
        let generated = gen("<% if a: %>1<% elif b: %>2<% else: %>3<% end %>");
        let lines: Vec<&str> = generated.source.lines().collect();
        assert_eq!(lines[0], "if a:");
        assert_eq!(lines[1], "  __buffer_append(\"\"\"1\"\"\")");
        assert_eq!(lines[2], "elif b:");
        assert_eq!(lines[4], "else:");
        assert_eq!(lines[5], "  __buffer_append(\"\"\"3\"\"\")");
    }

    #[test]
    fn test_try_except_finally() {
        let generated = gen("<% try: %>a<% except KeyError as e: %>b<% finally: %>c<% end %>");
        let lines: Vec<&str> = generated.source.lines().collect();
        assert_eq!(lines[2], "except KeyError as e:");
        assert_eq!(lines[4], "finally:");
        assert_eq!(lines[5], "  __buffer_append(\"\"\"c\"\"\")");
    }

    #[test]
    fn test_explicit_braces() {
        let generated = gen("<% if x {: y = 1 :} %>");
        assert_eq!(generated.source, "if x:\n  y = 1\n\n");
    }

    #[test]
    fn test_multiline_statement() {
        let generated = gen("<%\nx = 1\nif x:\n  y = 2\n%>z<% end %>");
        let lines: Vec<&str> = generated.source.lines().collect();
        assert_eq!(lines[0], "x = 1");
        assert_eq!(lines[1], "if x:");
        assert_eq!(lines[2], "  y = 2");
        assert_eq!(generated.line_map[0], 2);
        assert_eq!(generated.line_map[2], 4);
    }

    #[test]
    fn test_multiline_literal_line_map() {
        let generated = gen("a\nb\n<%= c %>");
        assert_eq!(generated.line_map, vec![1, 2, 3, 3]);
    }

    #[test]
    fn test_colon_before_string_does_not_open() {
        let generated = gen("<% d = {\"a\":\"b\"} %>");
        assert_eq!(generated.source, "d = {\"a\":\"b\"}\n");
    }

    #[test]
    fn test_unbalanced_blocks() {
        assert!(gen_err("<% if x: %>A").contains("1 unclosed block"));
        assert!(gen_err("<% if x: %><% for y in z: %>").contains("2 unclosed blocks"));
        assert!(gen_err("A<% end %>").contains("unexpected block end"));
        assert!(gen_err("<% else: %>").contains("'else' outside of a block"));
    }

    #[test]
    fn test_empty_print_is_rejected() {
        assert!(gen_err("<%= %>").contains("empty expression"));
    }

    #[test]
    fn test_excerpt_is_never_empty() {
        let err = CodeGenerator::generate("page", "<% else: z = 1 %>").unwrap_err();
        match err {
            TemplateError::Structural { excerpt, line, .. } => {
                assert_eq!(line, 1);
                assert_eq!(excerpt, "0001 : ");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_structural_excerpt_has_numbered_lines() {
        let err = CodeGenerator::generate("page", "x\n<% end %>").unwrap_err();
        match err {
            TemplateError::Structural { excerpt, line, .. } => {
                assert_eq!(line, 3);
                assert!(excerpt.starts_with("0001 : __buffer_append"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
