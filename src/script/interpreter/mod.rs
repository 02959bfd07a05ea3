//! Tree-walking interpreter for parsed programs
//!
//! The interpreter owns no state of its own beyond the exception being
//! handled; variables and output live behind the [`Environment`] it is given.

pub mod error;
pub mod executor;
pub mod ops;


pub use error::{ExceptionKind, ScriptError};
pub use executor::Interpreter;

use indexmap::IndexMap;

use crate::script::value::Value;

/// Variable scope and output sink a program runs against
pub trait Environment {
    /// Resolve a name; builtins are consulted only when this returns `None`
    fn lookup(
        &self,
        name: &str,
    ) -> Option<Value>;

    fn assign(
        &mut self,
        name: &str,
        value: Value,
    );

    /// Append a chunk to the output buffer
    fn append(
        &mut self,
        text: String,
    );

    /// Current buffer length, for later use with `take_since`
    fn mark(&self) -> usize;

    /// Remove every chunk appended after `mark` and return them joined
    fn take_since(
        &mut self,
        mark: usize,
    ) -> String;

    /// Every variable in scope, handed on when one template renders another
    fn visible(&self) -> IndexMap<String, Value> {
        IndexMap::new()
    }
}

/// Handed to every native function so it can reach the active namespace
pub struct CallContext<'a> {
    pub env: &'a mut dyn Environment,
}

impl<'a> CallContext<'a> {
    pub fn new(env: &'a mut dyn Environment) -> Self {
        Self { env }
    }
}
