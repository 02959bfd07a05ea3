//! Per-render namespace and output buffer

use indexmap::IndexMap;

use crate::runtime::{helpers, RenderEnv, Variables};
use crate::script::{Environment, Value};
use crate::template::codegen::{APPEND_FN, FILTER_FN};

/// Variables and output of one render; never shared between renders
///
/// Names resolve through, in order: assignments made by the program, the
/// caller's variables, the template globals, then the helpers. The two
/// callables generated code depends on cannot be shadowed.
pub struct RenderNamespace<'a> {
    locals: IndexMap<String, Value>,
    variables: &'a Variables,
    globals: &'a Variables,
    filter: Value,
    buffer: Vec<String>,
}

impl<'a> RenderNamespace<'a> {
    pub fn new(
        variables: &'a Variables,
        env: &'a RenderEnv,
    ) -> Self {
        Self {
            locals: IndexMap::new(),
            variables,
            globals: &env.globals,
            filter: helpers::filter_function(env.filter.clone()),
            buffer: Vec::new(),
        }
    }

    /// Chunks appended so far
    pub fn buffer(&self) -> &[String] {
        &self.buffer
    }

    /// Names assigned by the program, in assignment order
    pub fn locals(&self) -> &IndexMap<String, Value> {
        &self.locals
    }

    /// The rendered text
    pub fn into_output(self) -> String {
        self.buffer.concat()
    }
}

impl Environment for RenderNamespace<'_> {
    fn lookup(
        &self,
        name: &str,
    ) -> Option<Value> {
        match name {
            APPEND_FN => helpers::lookup(APPEND_FN),
            FILTER_FN => Some(self.filter.clone()),
            _ => self
                .locals
                .get(name)
                .or_else(|| self.variables.get(name))
                .or_else(|| self.globals.get(name))
                .cloned()
                .or_else(|| helpers::lookup(name)),
        }
    }

    fn assign(
        &mut self,
        name: &str,
        value: Value,
    ) {
        self.locals.insert(name.to_string(), value);
    }

    fn append(
        &mut self,
        text: String,
    ) {
        self.buffer.push(text);
    }

    fn mark(&self) -> usize {
        self.buffer.len()
    }

    fn take_since(
        &mut self,
        mark: usize,
    ) -> String {
        let mark = mark.min(self.buffer.len());
        self.buffer.drain(mark..).collect()
    }

    fn visible(&self) -> IndexMap<String, Value> {
        let mut visible = self.variables.clone();
        visible.extend(self.locals.iter().map(|(name, value)| (name.clone(), value.clone())));
        visible
    }
}
