//! Weft - CLI

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use weft::util::config::{EscapeMode, WeftConfig};
use weft::util::logger::{self, LogLevel};
use weft::{
    html_filter, Compiler, Encoding, RenderOptions, Renderer, RendererOptions, TemplateError, TemplateSource, Value,
    Variables, NAME, VERSION,
};

/// Embedded template compiler
#[derive(Parser, Debug)]
#[command(name = "weft")]
#[command(author = "Weft Team")]
#[command(version = VERSION)]
#[command(about = "Compile and render embedded templates", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./weft.toml, then the user config)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a template to stdout
    Render {
        /// Template file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Set a string variable
        #[arg(long = "var", value_name = "KEY=VALUE")]
        vars: Vec<String>,

        /// Variables as a JSON object
        #[arg(long = "vars", value_name = "JSON")]
        json: Option<String>,

        /// Persist compiled programs in this directory
        #[arg(long, value_name = "DIR")]
        cache_dir: Option<PathBuf>,

        /// Template encoding (utf-8, ascii, latin-1, cp932, euc-jp, ...)
        #[arg(long, value_name = "ENCODING")]
        encoding: Option<String>,

        /// Print `<%= %>` output without HTML escaping
        #[arg(long)]
        no_escape: bool,
    },

    /// Print the generated program source
    Compile {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(long, value_name = "ENCODING")]
        encoding: Option<String>,
    },

    /// Compile a template and report structural errors
    Check {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(long, value_name = "ENCODING")]
        encoding: Option<String>,
    },

    /// Print version information
    Version,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            let context = err
                .chain()
                .find_map(|cause| cause.downcast_ref::<TemplateError>())
                .and_then(TemplateError::context);
            if let Some(context) = context {
                eprintln!("{}", context);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config = WeftConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    let level = if args.verbose { LogLevel::Debug } else { config.log.level };
    logger::init_with_level(level);

    match args.command {
        Commands::Render {
            file,
            vars,
            json,
            cache_dir,
            encoding,
            no_escape,
        } => {
            let variables = parse_variables(&vars, json.as_deref())?;
            let escape = if no_escape { EscapeMode::None } else { config.render.escape };
            let options = RendererOptions {
                cache_dir: cache_dir.or(config.render.cache_dir.clone()),
                filter: match escape {
                    EscapeMode::Html => Some(html_filter()),
                    EscapeMode::None => None,
                },
                encoding: pick_encoding(encoding.as_deref(), &config)?,
                ..Default::default()
            };
            let output = Renderer::new(options)
                .render_file(&file, &variables)
                .with_context(|| format!("Failed to render: {}", file.display()))?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(output.as_bytes())?;
            stdout.flush()?;
        }
        Commands::Compile { file, encoding } => {
            let compiler = load(&file, pick_encoding(encoding.as_deref(), &config)?)?;
            let source = compiler
                .generated_source()
                .with_context(|| format!("Failed to compile: {}", file.display()))?;
            print!("{}", source);
        }
        Commands::Check { file, encoding } => {
            let compiler = load(&file, pick_encoding(encoding.as_deref(), &config)?)?;
            compiler
                .compile()
                .with_context(|| format!("Failed to check: {}", file.display()))?;
            eprintln!("{} {}", "ok:".green().bold(), file.display());
        }
        Commands::Version => {
            println!("{} {}", NAME, VERSION);
        }
    }

    Ok(())
}

fn load(
    file: &Path,
    encoding: Encoding,
) -> Result<Compiler> {
    let source = TemplateSource::from_file(file, encoding)?;
    Ok(Compiler::new(source, &RenderOptions::default()))
}

fn pick_encoding(
    flag: Option<&str>,
    config: &WeftConfig,
) -> Result<Encoding> {
    let label = flag.unwrap_or(&config.render.encoding);
    Ok(label.parse::<Encoding>()?)
}

/// `--vars` JSON first, then each `--var KEY=VALUE` on top
fn parse_variables(
    pairs: &[String],
    json: Option<&str>,
) -> Result<Variables> {
    let mut variables = Variables::new();
    if let Some(json) = json {
        let parsed: serde_json::Value = serde_json::from_str(json).context("--vars is not valid JSON")?;
        let serde_json::Value::Object(entries) = parsed else {
            bail!("--vars must be a JSON object");
        };
        for (key, value) in entries {
            variables.insert(key, Value::from(value));
        }
    }
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("--var expects KEY=VALUE, got '{}'", pair);
        };
        variables.insert(key.trim().to_string(), Value::from(value));
    }
    Ok(variables)
}
