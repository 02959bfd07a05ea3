//! Renderer: many templates, one cache
//!
//! Keeps each template file's program in memory and recompiles it when the
//! file's modification time changes. Templates share the renderer's globals
//! and filter, and reach each other through the `renderer` global:
//!
//! - `renderer.render(name, vars=None)` renders another template file
//! - `renderer.render_string(text, vars=None)` renders inline text
//! - `renderer.with_layout(name)` moves everything output so far into `body`
//!   and renders the layout `name` with the current variables
//!
//! Relative names resolve against [`RendererOptions::template_dir`].

use std::cell::Cell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::SystemTime;

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::cache::ArtifactCache;
use crate::error::{Result, TemplateError};
use crate::runtime::{self, Filter, RenderEnv, Variables};
use crate::script::{Args, ExceptionKind, ScriptError, Value};
use crate::template::compiler::{compile_source, Program};
use crate::template::source::{Encoding, TemplateSource};

/// Global through which templates reach the renderer
pub const RENDERER_GLOBAL: &str = "renderer";

/// How deep templates may render templates on one thread
pub const MAX_NESTED_RENDERS: usize = 16;

thread_local! {
    static NESTED_RENDERS: Cell<usize> = const { Cell::new(0) };
}

#[derive(Clone, Default)]
pub struct RendererOptions {
    /// Base for relative template names
    pub template_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub globals: Variables,
    pub filter: Option<Filter>,
    /// Encoding of template files unless a call says otherwise
    pub encoding: Encoding,
}

struct Loaded {
    mtime: Option<SystemTime>,
    encoding: Encoding,
    program: Arc<Program>,
}

struct Shared {
    cache: ArtifactCache,
    env: RenderEnv,
    template_dir: Option<PathBuf>,
    encoding: Encoding,
    programs: Mutex<HashMap<PathBuf, Loaded>>,
}

pub struct Renderer {
    shared: Arc<Shared>,
}

impl Renderer {
    pub fn new(options: RendererOptions) -> Self {
        let cache = match &options.cache_dir {
            Some(dir) => ArtifactCache::in_dir(dir.clone()),
            None => ArtifactCache::disabled(),
        };
        Self::with_cache(options, cache)
    }

    /// Same renderer over a caller-built cache, e.g. one with a memory store
    pub fn with_cache(
        options: RendererOptions,
        cache: ArtifactCache,
    ) -> Self {
        let shared = Arc::new_cyclic(|weak: &Weak<Shared>| {
            let mut globals = options.globals;
            globals.insert(RENDERER_GLOBAL.to_string(), handle(weak));
            Shared {
                cache,
                env: RenderEnv {
                    globals,
                    filter: options.filter,
                },
                template_dir: options.template_dir,
                encoding: options.encoding,
                programs: Mutex::new(HashMap::new()),
            }
        });
        Self { shared }
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.shared.cache
    }

    pub fn render_file(
        &self,
        path: impl AsRef<Path>,
        variables: &Variables,
    ) -> Result<String> {
        self.shared.render_file(path.as_ref(), self.shared.encoding, variables)
    }

    pub fn render_file_with_encoding(
        &self,
        path: impl AsRef<Path>,
        encoding: Encoding,
        variables: &Variables,
    ) -> Result<String> {
        self.shared.render_file(path.as_ref(), encoding, variables)
    }

    /// Compile `text` on the spot; nothing is kept
    pub fn render_string(
        &self,
        text: &str,
        variables: &Variables,
    ) -> Result<String> {
        self.shared.render_string(text, variables)
    }

    /// Render `path`, then render `layout` with the result as `body`
    pub fn render_with_layout(
        &self,
        layout: impl AsRef<Path>,
        path: impl AsRef<Path>,
        variables: &Variables,
    ) -> Result<String> {
        let body = self.render_file(path, variables)?;
        let mut variables = variables.clone();
        variables.insert("body".to_string(), Value::markup(body));
        self.render_file(layout, &variables)
    }

    /// The program for `path`, reusing the in-memory copy while the file is unchanged
    pub fn compile_file(
        &self,
        path: &Path,
        encoding: Encoding,
    ) -> Result<Arc<Program>> {
        self.shared.compile_file(&self.shared.resolve(path), encoding)
    }
}

impl Shared {
    fn resolve(
        &self,
        path: &Path,
    ) -> PathBuf {
        match &self.template_dir {
            Some(dir) => dir.join(path),
            None => path.to_path_buf(),
        }
    }

    fn render_file(
        &self,
        path: &Path,
        encoding: Encoding,
        variables: &Variables,
    ) -> Result<String> {
        let program = self.compile_file(&self.resolve(path), encoding)?;
        runtime::render_program(&program, variables, &self.env)
    }

    fn render_string(
        &self,
        text: &str,
        variables: &Variables,
    ) -> Result<String> {
        let program = compile_source(&TemplateSource::from_string(text))?;
        runtime::render_program(&program, variables, &self.env)
    }

    fn compile_file(
        &self,
        path: &Path,
        encoding: Encoding,
    ) -> Result<Arc<Program>> {
        let mtime = fs::metadata(path)
            .and_then(|meta| meta.modified())
            .map_err(|e| TemplateError::io(path, e))?;

        let mut programs = self.programs.lock();
        if let Some(loaded) = programs.get(path) {
            if loaded.mtime == Some(mtime) && loaded.encoding == encoding {
                return Ok(loaded.program.clone());
            }
            tracing::debug!(path = %path.display(), "template changed, recompiling");
        }

        let source = TemplateSource::from_file(path, encoding)?;
        let program = self.cache.compile_or_load(&source)?;
        programs.insert(
            path.to_path_buf(),
            Loaded {
                mtime: source.mtime(),
                encoding,
                program: program.clone(),
            },
        );
        Ok(program)
    }
}

/// The `renderer` global; holds the renderer weakly so globals do not keep it alive
fn handle(shared: &Weak<Shared>) -> Value {
    let render = shared.clone();
    let render_string = shared.clone();
    let with_layout = shared.clone();
    let mut entries = IndexMap::new();
    entries.insert(
        "render".to_string(),
        Value::function("render", move |_ctx, args| {
            args.check("render", 1, 2, &["vars"])?;
            let name = text_arg("render", &args)?;
            let variables = variables_arg("render", &args)?;
            nested(&render, |shared| shared.render_file(Path::new(&name), shared.encoding, &variables))
        }),
    );
    entries.insert(
        "render_string".to_string(),
        Value::function("render_string", move |_ctx, args| {
            args.check("render_string", 1, 2, &["vars"])?;
            let text = text_arg("render_string", &args)?;
            let variables = variables_arg("render_string", &args)?;
            nested(&render_string, |shared| shared.render_string(&text, &variables))
        }),
    );
    entries.insert(
        "with_layout".to_string(),
        Value::function("with_layout", move |ctx, args| {
            args.check("with_layout", 1, 1, &[])?;
            let name = text_arg("with_layout", &args)?;
            let body = ctx.env.take_since(0);
            let mut variables = ctx.env.visible();
            variables.insert("body".to_string(), Value::markup(body));
            nested(&with_layout, |shared| shared.render_file(Path::new(&name), shared.encoding, &variables))
        }),
    );
    Value::dict(entries)
}

/// Run a render on behalf of a template, as markup
fn nested(
    shared: &Weak<Shared>,
    render: impl FnOnce(&Shared) -> Result<String>,
) -> std::result::Result<Value, ScriptError> {
    let shared = shared
        .upgrade()
        .ok_or_else(|| ScriptError::new(ExceptionKind::RuntimeError, "renderer is gone"))?;
    let _depth = NestingGuard::enter()?;
    render(&shared).map(Value::markup).map_err(script_error)
}

struct NestingGuard;

impl NestingGuard {
    fn enter() -> std::result::Result<Self, ScriptError> {
        NESTED_RENDERS.with(|depth| {
            if depth.get() >= MAX_NESTED_RENDERS {
                return Err(ScriptError::new(
                    ExceptionKind::RuntimeError,
                    "templates are nested too deeply",
                ));
            }
            depth.set(depth.get() + 1);
            Ok(NestingGuard)
        })
    }
}

impl Drop for NestingGuard {
    fn drop(&mut self) {
        NESTED_RENDERS.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// An inner template's failure, raised in the outer one
fn script_error(err: TemplateError) -> ScriptError {
    match err {
        TemplateError::Runtime {
            name, kind, message, ..
        } => ScriptError::new(kind, format!("{}: {}", name, message)),
        other => ScriptError::new(ExceptionKind::RuntimeError, other.to_string()),
    }
}

fn text_arg(
    func: &str,
    args: &Args,
) -> std::result::Result<String, ScriptError> {
    match args.arg(0) {
        Value::Str(text) | Value::Markup(text) => Ok(text.to_string()),
        other => Err(ScriptError::type_error(format!(
            "{}() argument must be str, not {}",
            func,
            other.type_name()
        ))),
    }
}

fn variables_arg(
    func: &str,
    args: &Args,
) -> std::result::Result<Variables, ScriptError> {
    let given = args.get(1).or_else(|| args.keyword("vars")).cloned();
    match given.unwrap_or(Value::None) {
        Value::None => Ok(Variables::new()),
        Value::Dict(entries) => Ok(entries.read().clone()),
        other => Err(ScriptError::type_error(format!(
            "{}() variables must be a dict, not {}",
            func,
            other.type_name()
        ))),
    }
}
