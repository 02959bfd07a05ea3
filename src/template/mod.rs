//! Template front end
//!
//! [`splitter`] cuts text into literal and tag segments, [`fragment`]
//! classifies statement bodies, [`codegen`] infers nesting and emits script
//! source, and [`compiler`] parses that source into a [`compiler::Program`].

pub mod codegen;
pub mod compiler;
pub mod fragment;
pub mod source;
pub mod splitter;

pub use codegen::{CodeGenerator, Generated};
pub use compiler::{compile_source, Compiler, Program, RenderOptions};
pub use source::{Encoding, TemplateSource};
pub use splitter::{Segment, Splitter, Tag, TagKind};
