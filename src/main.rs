use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use skimcat::{Config, ContextSpec, LanguageRegistry, parse_context_spec, render_directory, render_file};

/// Display file contents with optional line numbers, pagination and outlines.
#[derive(Parser, Debug)]
#[command(name = "skimcat", version, about)]
struct Cli {
    /// File or directory to render
    path: PathBuf,

    /// Wrap output in a fenced block headed by the path
    #[arg(short = 'm', long)]
    markdown: Option<bool>,

    /// Show line numbers
    #[arg(short = 'n', long)]
    line_numbers: Option<bool>,

    /// Gutter separator character
    #[arg(short = 's', long)]
    separator: Option<char>,

    /// Produce an outline for supported source files using tree-sitter
    #[arg(long)]
    outline: bool,

    /// Symbols to keep expanded when showing an outline
    #[arg(long = "symbols", value_name = "NAME")]
    symbols: Vec<String>,

    /// Number of lines to show (0 = show all)
    #[arg(short = 'p', long)]
    page_size: Option<usize>,

    /// First line to show (1-based)
    #[arg(long)]
    start_line: Option<usize>,

    /// Show page information in the header
    #[arg(long)]
    show_page_info: Option<bool>,

    /// Glob patterns to ignore
    #[arg(long = "ignore", value_name = "GLOB")]
    ignore: Vec<String>,

    /// Glob patterns to include
    #[arg(long = "include", value_name = "GLOB")]
    include: Vec<String>,

    /// File extensions to include
    #[arg(long = "ext", value_delimiter = ',')]
    ext: Vec<String>,

    /// File extensions to exclude
    #[arg(long = "exclude-ext", value_delimiter = ',')]
    exclude_ext: Vec<String>,

    /// Files or symbols to expand, one context spec line per flag
    #[arg(short = 'e', long = "expand", value_name = "SPEC")]
    expand: Vec<String>,

    /// Print the file's symbol table as JSON instead of rendering it
    #[arg(long)]
    list_symbols: bool,

    /// Path to a JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logs
    #[arg(long)]
    debug: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        let render = &mut config.render;
        if let Some(v) = self.markdown {
            render.output_fencing = v;
        }
        if let Some(v) = self.line_numbers {
            render.show_line_numbers = v;
        }
        if let Some(v) = self.separator {
            render.gutter_separator = v;
        }
        if self.outline {
            render.outline = true;
        }
        render.expand_symbols.extend(self.symbols.iter().cloned());
        if let Some(v) = self.page_size {
            render.page_size = v;
        }
        if let Some(v) = self.start_line {
            render.start_line = v;
        }
        if let Some(v) = self.show_page_info {
            render.show_page_info = v;
        }

        let directory = &mut config.directory;
        if !self.ignore.is_empty() {
            directory.ignore_globs = self.ignore.clone();
        }
        directory.include_globs.extend(self.include.iter().cloned());
        directory.include_extensions.extend(self.ext.iter().cloned());
        directory.exclude_extensions.extend(self.exclude_ext.iter().cloned());
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    // 1. Load config
    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    // 2. Parse context spec before touching any file
    let context_spec =
        parse_context_spec(&cli.expand.join("\n")).context("invalid --expand spec")?;

    // 3. Render
    let registry = LanguageRegistry::new();
    let output = run(&cli, &config, &registry, &context_spec)?;
    println!("{output}");

    Ok(())
}

fn run(
    cli: &Cli,
    config: &Config,
    registry: &LanguageRegistry,
    context_spec: &ContextSpec,
) -> Result<String> {
    let metadata = std::fs::metadata(&cli.path)
        .with_context(|| format!("error accessing path: {}", cli.path.display()))?;

    if metadata.is_dir() {
        if cli.list_symbols {
            bail!("--list-symbols needs a file, got a directory");
        }
        return render_directory(registry, &cli.path, config, Some(context_spec))
            .with_context(|| format!("error processing directory ({})", cli.path.display()));
    }

    render_single_file(&cli.path, cli.list_symbols, config, registry, context_spec)
}

fn render_single_file(
    path: &Path,
    list_symbols: bool,
    config: &Config,
    registry: &LanguageRegistry,
    context_spec: &ContextSpec,
) -> Result<String> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("error reading file: {}", path.display()))?;
    let name = path.to_string_lossy();

    if list_symbols {
        let table = skimcat::extract(registry, &name, &text)?;
        return serde_json::to_string_pretty(&table).context("failed to serialize symbols");
    }

    let options = config.render.for_request(context_spec.get(&name));

    render_file(registry, &name, &text, &options).context("error rendering file")
}
