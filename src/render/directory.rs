use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use tracing::debug;

use crate::config::{Config, DirectoryOptions, RenderOptions};
use crate::ctxspec::ContextSpec;
use crate::outline::languages::LanguageRegistry;

use super::render_file;

/// Compiled include/exclude rules for directory walks.
struct FileFilter {
    ignore: GlobSet,
    include: Option<GlobSet>,
    include_extensions: Vec<String>,
    exclude_extensions: Vec<String>,
}

impl FileFilter {
    fn new(options: &DirectoryOptions) -> Result<Self> {
        if !options.include_extensions.is_empty() && !options.exclude_extensions.is_empty() {
            bail!("cannot specify extensions to include and exclude");
        }

        let include = if options.include_globs.is_empty() {
            None
        } else {
            Some(build_glob_set(&options.include_globs)?)
        };

        Ok(Self {
            ignore: build_glob_set(&options.ignore_globs)?,
            include,
            include_extensions: normalize_extensions(&options.include_extensions),
            exclude_extensions: normalize_extensions(&options.exclude_extensions),
        })
    }

    /// `rel_path` is relative to the walked directory, `/`-separated.
    fn accepts(&self, rel_path: &str) -> bool {
        if self.ignore.is_match(rel_path) {
            debug!(file = rel_path, "ignored by glob");
            return false;
        }

        if let Some(include) = &self.include {
            if !include.is_match(rel_path) {
                return false;
            }
        }

        let ext = Path::new(rel_path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if self.exclude_extensions.contains(&ext) {
            debug!(file = rel_path, "excluded because extension matches excludes");
            return false;
        }

        if !self.include_extensions.is_empty() && !self.include_extensions.contains(&ext) {
            debug!(file = rel_path, "excluded because extension is not included");
            return false;
        }

        true
    }
}

fn build_glob_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))?;
        builder.add(glob);
    }
    builder.build().context("failed to compile glob patterns")
}

fn normalize_extensions(extensions: &[String]) -> Vec<String> {
    extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
        .collect()
}

#[cfg(unix)]
fn is_executable(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &fs::Metadata) -> bool {
    false
}

struct DirectoryRenderer<'a> {
    registry: &'a LanguageRegistry,
    filter: FileFilter,
    options: &'a RenderOptions,
    context_spec: Option<&'a ContextSpec>,
}

impl DirectoryRenderer<'_> {
    /// Renders one file, or `None` when it is filtered out or not text.
    fn render_entry(&self, full_path: &Path, rel_path: &str) -> Result<Option<String>> {
        if !self.filter.accepts(rel_path) {
            return Ok(None);
        }

        let metadata = fs::metadata(full_path)
            .with_context(|| format!("unable to stat file {}", full_path.display()))?;
        if metadata.is_dir() {
            return Ok(None);
        }
        if is_executable(&metadata) {
            debug!(file = rel_path, "skipping executable file");
            return Ok(None);
        }

        let bytes = fs::read(full_path)
            .with_context(|| format!("failed to read {}", full_path.display()))?;
        let Ok(text) = String::from_utf8(bytes) else {
            debug!(file = rel_path, "skipping non-UTF-8 file");
            return Ok(None);
        };

        let request = self.context_spec.and_then(|spec| spec.get(rel_path));
        let options = self.options.for_request(request);
        let rendered = render_file(self.registry, rel_path, &text, &options)
            .with_context(|| format!("error rendering file {rel_path}"))?;
        Ok(Some(rendered))
    }
}

/// Render every accepted file under `dir`, separated by blank lines.
///
/// With a context spec only the files it names are rendered (relative to
/// `dir`), and a named file that does not exist is an error. Otherwise the
/// directory is walked honoring `.gitignore`, in file-name order.
pub fn render_directory(
    registry: &LanguageRegistry,
    dir: &Path,
    config: &Config,
    context_spec: Option<&ContextSpec>,
) -> Result<String> {
    let renderer = DirectoryRenderer {
        registry,
        filter: FileFilter::new(&config.directory)?,
        options: &config.render,
        context_spec,
    };

    let mut files = Vec::new();

    match context_spec.filter(|spec| !spec.is_empty()) {
        Some(spec) => {
            for request in spec.iter() {
                let full_path = dir.join(&request.filename);
                if !full_path.exists() {
                    bail!(
                        "unable to stat file ({}) in context spec",
                        request.filename
                    );
                }
                if let Some(rendered) = renderer.render_entry(&full_path, &request.filename)? {
                    files.push(rendered);
                }
            }
        }
        None => {
            let walker = WalkBuilder::new(dir)
                .hidden(false)
                .require_git(false)
                .sort_by_file_name(|a, b| a.cmp(b))
                .build();

            for entry in walker {
                let entry = entry.context("failed to walk directory")?;
                if !entry.file_type().is_some_and(|t| t.is_file()) {
                    continue;
                }

                let path = entry.path();
                let rel_path = path
                    .strip_prefix(dir)
                    .unwrap_or(path)
                    .to_string_lossy()
                    .replace('\\', "/");

                if let Some(rendered) = renderer.render_entry(path, &rel_path)? {
                    files.push(rendered);
                }
            }
        }
    }

    debug!(dir = %dir.display(), files = files.len(), "rendered directory");
    Ok(files.join("\n\n"))
}
