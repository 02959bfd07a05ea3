//! Compiler facade
//!
//! [`compile_source`] runs the whole front end: segments, fragments, inferred
//! nesting, generated source, parsed statements. [`Compiler`] wraps one
//! template source and keeps its program for the lifetime of the instance.

use std::path::PathBuf;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::cache::ArtifactCache;
use crate::error::{Result, TemplateError, WINDOW_RADIUS};
use crate::runtime::{self, Filter, RenderEnv, Variables};
use crate::script::{self, Block};
use crate::template::codegen::CodeGenerator;
use crate::template::source::{Encoding, TemplateSource};
use crate::util::span::SourceFile;

/// A compiled template, ready to run any number of times
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Identity of the template it came from
    pub name: String,
    /// Generated script source
    pub source: String,
    pub body: Block,
    /// `line_map[n]` is the template line of generated line `n + 1`
    pub line_map: Vec<usize>,
}

impl Program {
    /// Template line a generated line came from
    pub fn template_line(
        &self,
        line: usize,
    ) -> Option<usize> {
        line.checked_sub(1).and_then(|i| self.line_map.get(i)).copied()
    }

    /// Numbered generated lines around `line`
    pub fn window(
        &self,
        line: usize,
    ) -> String {
        SourceFile::new(&self.source).window(line, WINDOW_RADIUS)
    }
}

/// Compile `source` without any caching
pub fn compile_source(source: &TemplateSource) -> Result<Program> {
    let name = source.name();
    let generated = CodeGenerator::generate(name, source.text())?;
    let body = script::parse(&generated.source).map_err(|err| {
        let line = err.line().max(1);
        TemplateError::structural(name, err.to_string(), line, &generated.source)
    })?;
    tracing::debug!(name, lines = generated.line_map.len(), "compiled template");
    Ok(Program {
        name: name.to_string(),
        source: generated.source,
        body,
        line_map: generated.line_map,
    })
}

/// Options shared by [`crate::render`] and [`Compiler`]
#[derive(Clone, Default)]
pub struct RenderOptions {
    /// Cache key for in-memory templates; file templates use their path
    pub identity: Option<String>,
    /// Persist compiled programs here
    pub cache_dir: Option<PathBuf>,
    pub globals: Variables,
    /// Escaping applied to `<%= %>` output; none when unset
    pub filter: Option<Filter>,
    pub encoding: Encoding,
}

impl RenderOptions {
    pub fn with_filter(
        mut self,
        filter: Filter,
    ) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_global(
        mut self,
        name: impl Into<String>,
        value: impl Into<script::Value>,
    ) -> Self {
        self.globals.insert(name.into(), value.into());
        self
    }
}

/// One template source and its compiled program
pub struct Compiler {
    source: TemplateSource,
    cache: ArtifactCache,
    env: RenderEnv,
    program: OnceCell<Arc<Program>>,
}

impl Compiler {
    pub fn new(
        source: TemplateSource,
        options: &RenderOptions,
    ) -> Self {
        let source = match &options.identity {
            Some(identity) => source.with_identity(identity.clone()),
            None => source,
        };
        let cache = match &options.cache_dir {
            Some(dir) => ArtifactCache::in_dir(dir),
            None => ArtifactCache::disabled(),
        };
        Self {
            source,
            cache,
            env: RenderEnv {
                globals: options.globals.clone(),
                filter: options.filter.clone(),
            },
            program: OnceCell::new(),
        }
    }

    pub fn source(&self) -> &TemplateSource {
        &self.source
    }

    /// The program, compiled (or loaded from the cache) on first use
    pub fn compile(&self) -> Result<Arc<Program>> {
        self.program
            .get_or_try_init(|| self.cache.compile_or_load(&self.source))
            .cloned()
    }

    pub fn render(
        &self,
        variables: &Variables,
    ) -> Result<String> {
        let program = self.compile()?;
        runtime::render_program(&program, variables, &self.env)
    }

    pub fn generated_source(&self) -> Result<String> {
        Ok(self.compile()?.source.clone())
    }
}
