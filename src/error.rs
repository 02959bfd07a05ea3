//! Errors surfaced by compiling and rendering templates

use std::io;
use std::path::PathBuf;

use crate::script::ExceptionKind;
use crate::util::span::SourceFile;

/// Lines of context shown on each side of a failing generated line
pub const WINDOW_RADIUS: usize = 5;

/// Template compilation and rendering error
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// Unbalanced nesting, malformed tags, or generated code that does not parse
    #[error("{name}: {message} (line {line})")]
    Structural {
        name: String,
        message: String,
        /// Generated-source line (template line for malformed tags)
        line: usize,
        /// Numbered source lines up to and including `line`
        excerpt: String,
    },

    /// An exception escaped the program
    #[error("{name}: {kind}: {message} (generated line {line}{})", template_suffix(.template_line))]
    Runtime {
        name: String,
        kind: ExceptionKind,
        message: String,
        line: usize,
        template_line: Option<usize>,
        /// Numbered generated lines around `line`
        window: String,
    },

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("template {name} is not valid {encoding}")]
    Decode { name: String, encoding: String },

    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),
}

fn template_suffix(line: &Option<usize>) -> String {
    match line {
        Some(line) => format!(", template line {}", line),
        None => String::new(),
    }
}

impl TemplateError {
    /// Structural error with an excerpt of `source` through `line`
    pub fn structural(
        name: &str,
        message: impl Into<String>,
        line: usize,
        source: &str,
    ) -> Self {
        let mut excerpt = SourceFile::new(source).excerpt_through(line);
        if excerpt.is_empty() {
            // Nothing emitted yet, show the blank line being built
            excerpt = format!("{:04} : ", line.max(1));
        }
        TemplateError::Structural {
            name: name.to_string(),
            message: message.into(),
            line,
            excerpt,
        }
    }

    pub fn io(
        path: impl Into<PathBuf>,
        source: io::Error,
    ) -> Self {
        TemplateError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_structural(&self) -> bool {
        matches!(self, TemplateError::Structural { .. })
    }

    pub fn is_runtime(&self) -> bool {
        matches!(self, TemplateError::Runtime { .. })
    }

    /// The excerpt or window attached to the error, if any
    pub fn context(&self) -> Option<&str> {
        match self {
            TemplateError::Structural { excerpt, .. } => Some(excerpt),
            TemplateError::Runtime { window, .. } => Some(window),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TemplateError>;
