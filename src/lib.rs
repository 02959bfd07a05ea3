//! Weft: an embedded template compiler
//!
//! Templates interleave literal text with code tags:
//!
//! ```text
//! <% for item in items: %>
//!   <li><%= item %></li>
//! <% end %>
//! ```
//!
//! A template is compiled once into a [`Program`] (generated script source
//! plus its parsed statements) and rendered any number of times against a
//! fresh namespace. Block nesting is inferred from trailing colons, so tags
//! never need balanced braces.
//!
//! # Example
//!
//! ```
//! use weft::{render, RenderOptions, Value, Variables};
//!
//! let mut variables = Variables::new();
//! variables.insert("name".to_string(), Value::from("<world>"));
//! let options = RenderOptions::default().with_filter(weft::html_filter());
//! let out = render("Hello <%= name %>!", &variables, &options).unwrap();
//! assert_eq!(out, "Hello &lt;world&gt;!");
//! ```

#![doc(html_root_url = "https://docs.rs/weft")]
#![warn(rust_2018_idioms)]

pub mod cache;
pub mod error;
pub mod renderer;
pub mod runtime;
pub mod script;
pub mod template;

// Utility modules
pub mod util;

use std::sync::Arc;

pub use cache::{ArtifactCache, ArtifactStore, CacheEntry, FsStore, MemoryStore, FORMAT_VERSION};
pub use error::{Result, TemplateError};
pub use renderer::{Renderer, RendererOptions};
pub use runtime::helpers::{escape_html, unescape_html};
pub use runtime::{Filter, Variables};
pub use script::{ExceptionKind, Value};
pub use template::{Compiler, Encoding, Program, RenderOptions, TemplateSource};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = "weft";

/// Compile and render `text` in one call
///
/// With `options.identity` and `options.cache_dir` set, the compiled program
/// is written to the cache. Text has no modification time, so only file
/// sources are ever loaded back from it.
pub fn render(
    text: &str,
    variables: &Variables,
    options: &RenderOptions,
) -> Result<String> {
    let source = TemplateSource::from_string(text);
    Compiler::new(source, options).render(variables)
}

/// Filter escaping `& < > ' "` as HTML entities
pub fn html_filter() -> Filter {
    Arc::new(escape_html)
}
