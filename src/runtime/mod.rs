//! Execution engine
//!
//! Runs a compiled program against a fresh namespace and turns escaped
//! exceptions into errors that point back into the generated source.

pub mod helpers;
pub mod namespace;

use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{Result, TemplateError};
use crate::script::{Interpreter, ScriptError, Value};
use crate::template::compiler::Program;

pub use namespace::RenderNamespace;

/// Escaping applied to `<%= %>` output
pub type Filter = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Named values handed to a render
pub type Variables = IndexMap<String, Value>;

/// What a render sees besides the caller's variables
#[derive(Clone, Default)]
pub struct RenderEnv {
    pub globals: Variables,
    pub filter: Option<Filter>,
}

/// Run `program` and return its output
pub fn render_program(
    program: &Program,
    variables: &Variables,
    env: &RenderEnv,
) -> Result<String> {
    let mut namespace = RenderNamespace::new(variables, env);
    let outcome = Interpreter::new(&mut namespace).run(&program.body);
    match outcome {
        Ok(()) => Ok(namespace.into_output()),
        Err(err) => Err(runtime_error(program, err)),
    }
}

fn runtime_error(
    program: &Program,
    err: ScriptError,
) -> TemplateError {
    let template_line = program.template_line(err.line);
    tracing::debug!(
        name = %program.name,
        kind = %err.kind,
        line = err.line,
        "render failed"
    );
    TemplateError::Runtime {
        name: program.name.clone(),
        kind: err.kind,
        message: err.message,
        line: err.line,
        template_line,
        window: program.window(err.line),
    }
}
