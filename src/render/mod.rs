/// Page-windowed rendering of files and directories.
///
/// [`render_file`] is the single-file entry point: it extracts symbols when
/// outlining is on, assembles chunks and formats the requested page.
/// [`render`] is the pure formatter over already-assembled chunks.
pub mod directory;

use tracing::debug;

use crate::config::RenderOptions;
use crate::outline::chunks::{OutlineChunk, assemble};
use crate::outline::languages::LanguageRegistry;
use crate::outline::symbols::SymbolExtractor;
use crate::outline::{ExtractError, SourceUnit};

pub use directory::render_directory;

/// Clipped `[start_index, end_index)` bounds over 0-indexed lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub start_index: usize,
    pub end_index: usize,
    pub total_lines: usize,
}

impl PageWindow {
    /// `start_line` is 1-based; a `page_size` of 0 means unbounded. A start
    /// past the end shows the last line.
    pub fn new(start_line: usize, page_size: usize, total_lines: usize) -> Self {
        let mut start_index = start_line.saturating_sub(1);
        let mut end_index = if page_size == 0 {
            total_lines
        } else {
            start_index.saturating_add(page_size).min(total_lines)
        };

        if start_index >= total_lines {
            start_index = total_lines.saturating_sub(1);
            end_index = total_lines;
        }

        Self {
            start_index,
            end_index,
            total_lines,
        }
    }

    fn contains(&self, row: usize) -> bool {
        row >= self.start_index && row < self.end_index
    }

    fn overlaps(&self, start_row: usize, end_row: usize) -> bool {
        end_row >= self.start_index && start_row < self.end_index
    }

    /// Rows of `[start_row, end_row]` that fall inside the window.
    fn visible_rows(&self, start_row: usize, end_row: usize) -> usize {
        let first = start_row.max(self.start_index);
        let last = end_row.min(self.end_index.saturating_sub(1));
        if last < first { 0 } else { last - first + 1 }
    }

    fn lines_above(&self) -> usize {
        self.start_index
    }

    fn lines_below(&self) -> usize {
        self.total_lines - self.end_index
    }
}

/// Collects output lines with a shared gutter.
struct Output<'o> {
    lines: Vec<String>,
    options: &'o RenderOptions,
    gutter_width: usize,
}

impl<'o> Output<'o> {
    fn new(options: &'o RenderOptions, total_lines: usize) -> Self {
        Self {
            lines: Vec::new(),
            options,
            gutter_width: total_lines.to_string().len() + 1,
        }
    }

    /// `line_number` is 1-based.
    fn numbered(&mut self, line_number: usize, line: &str) {
        if self.options.show_line_numbers {
            self.lines.push(format!(
                "{line_number:<width$}{sep} {line}",
                width = self.gutter_width,
                sep = self.options.gutter_separator,
            ));
        } else {
            self.lines.push(line.to_string());
        }
    }

    fn marker(&mut self, text: &str) {
        let marker = format!("... ({text}) ...");
        if self.options.show_line_numbers {
            self.lines.push(format!(
                "{:width$}{sep} {marker}",
                "",
                width = self.gutter_width,
                sep = self.options.gutter_separator,
            ));
        } else {
            self.lines.push(marker);
        }
    }

    fn raw(&mut self, line: String) {
        self.lines.push(line);
    }

    fn finish(self) -> String {
        self.lines.join("\n")
    }
}

/// Render one file's text using already-assembled chunks.
///
/// `outline` is `None` when the file's language is unsupported; an empty
/// chunk list is treated the same way and the raw lines are shown.
pub fn render(source: &SourceUnit<'_>, outline: Option<&[OutlineChunk]>, options: &RenderOptions) -> String {
    let lines: Vec<&str> = source.text.split('\n').collect();
    let window = PageWindow::new(options.start_line, options.page_size, lines.len());
    let mut out = Output::new(options, window.total_lines);

    if options.output_fencing {
        let mut header = format!("```{}", source.path);
        if options.show_page_info && options.page_size > 0 {
            header.push_str(&format!(
                " (Lines {}-{} of {})",
                window.start_index + 1,
                window.end_index,
                window.total_lines
            ));
        }
        out.raw(header);
    }

    if window.lines_above() > 0 {
        out.marker(&format!("{} lines above", window.lines_above()));
    }

    match outline {
        Some(chunks) if !chunks.is_empty() => {
            for chunk in chunks {
                if !window.overlaps(chunk.start_row, chunk.end_row) {
                    continue;
                }

                if options.outline && chunk.should_omit && !is_expanded(chunk, options) {
                    let omitted = window.visible_rows(chunk.start_row, chunk.end_row);
                    out.marker(&format!("{omitted} lines omitted"));
                    continue;
                }

                for (offset, line) in chunk.lines().enumerate() {
                    let row = chunk.start_row + offset;
                    if window.contains(row) {
                        out.numbered(row + 1, line);
                    }
                }
            }
        }
        _ => {
            for (row, line) in lines
                .iter()
                .enumerate()
                .take(window.end_index)
                .skip(window.start_index)
            {
                out.numbered(row + 1, line);
            }
        }
    }

    if window.lines_below() > 0 {
        out.marker(&format!("{} lines below", window.lines_below()));
    }

    if options.output_fencing {
        out.raw("```".to_string());
    }

    out.finish()
}

fn is_expanded(chunk: &OutlineChunk, options: &RenderOptions) -> bool {
    chunk
        .name
        .as_ref()
        .is_some_and(|name| options.expand_symbols.contains(name))
}

/// Render a file, outlining it when `options.outline` is set and its
/// language is supported.
///
/// Symbols are extracted only in outline mode; with outlining off the file is
/// never parsed, so parse and query errors cannot occur. In outline mode an
/// unsupported extension falls back to raw numbered lines and any other
/// extraction failure is returned.
pub fn render_file(
    registry: &LanguageRegistry,
    path: &str,
    text: &str,
    options: &RenderOptions,
) -> Result<String, ExtractError> {
    debug!(
        path,
        outline = options.outline,
        symbols = ?options.expand_symbols,
        "rendering file"
    );

    let source = SourceUnit::new(path, text);
    if !options.outline {
        return Ok(render(&source, None, options));
    }

    let chunks = match SymbolExtractor::new(registry).extract(&source) {
        Ok(table) => Some(assemble(text, &table.definitions)),
        Err(e) if e.is_unsupported() => {
            debug!(path, "no grammar for file, rendering raw lines");
            None
        }
        Err(e) => return Err(e),
    };

    Ok(render(&source, chunks.as_deref(), options))
}
