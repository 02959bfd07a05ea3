//! Fragment lexer for statement tag bodies
//!
//! Classifies a body into strings, continuation keywords (`else:` and
//! friends), explicit block markers (`{:`, `:}`, `end`), statement separators
//! and everything else.

pub mod tokenizer;
pub mod tokens;


pub use tokenizer::FragmentLexer;
pub use tokens::{Fragment, FragmentKind};

/// Classify a statement tag body
pub fn tokenize(body: &str) -> Vec<Fragment> {
    FragmentLexer::new(body).tokenize()
}
