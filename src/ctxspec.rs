/// Context spec parsing.
///
/// A context spec lists files, and optionally symbols within them, that must
/// stay expanded in outline mode. One entry per line:
///
/// ```text
/// main.go
/// parser.go Parse ParseLine
/// "file with spaces.go" "Method \"quoted\" name"
/// ```
///
/// The first token is the filename; the rest are symbol names. A line with
/// no symbols requests the whole file.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ContextSpecError {
    #[error("unterminated quote in line '{line}'")]
    UnterminatedQuote { line: String },
}

/// Expansion request for a single file. No symbols means the whole file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileExpansionRequest {
    pub filename: String,
    #[serde(default)]
    pub symbols: Vec<String>,
}

impl FileExpansionRequest {
    pub fn whole_file(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Filename → expansion request, at most one per filename.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextSpec {
    files: BTreeMap<String, FileExpansionRequest>,
}

impl ContextSpec {
    pub fn get(&self, filename: &str) -> Option<&FileExpansionRequest> {
        self.files.get(filename)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileExpansionRequest> {
        self.files.values()
    }

    /// Fold a request into the spec.
    ///
    /// Symbol lists for the same file are concatenated. A whole-file request
    /// replaces any earlier symbol list, and later symbol requests for that
    /// file are ignored.
    pub fn merge(&mut self, request: FileExpansionRequest) {
        if request.whole_file() {
            self.files.insert(request.filename.clone(), request);
            return;
        }

        match self.files.get_mut(&request.filename) {
            Some(existing) if existing.whole_file() => {}
            Some(existing) => existing.symbols.extend(request.symbols),
            None => {
                self.files.insert(request.filename.clone(), request);
            }
        }
    }
}

impl FromIterator<FileExpansionRequest> for ContextSpec {
    fn from_iter<I: IntoIterator<Item = FileExpansionRequest>>(iter: I) -> Self {
        let mut spec = Self::default();
        for request in iter {
            spec.merge(request);
        }
        spec
    }
}

/// Parse a multi-line context spec. Blank lines are skipped.
pub fn parse_context_spec(text: &str) -> Result<ContextSpec, ContextSpecError> {
    let mut spec = ContextSpec::default();
    for line in text.lines() {
        if let Some(request) = parse_spec_line(line)? {
            spec.merge(request);
        }
    }
    Ok(spec)
}

/// Parse one line into a request; `None` for a blank line.
pub fn parse_spec_line(line: &str) -> Result<Option<FileExpansionRequest>, ContextSpecError> {
    let mut parts = tokenize(line)?.into_iter();
    let Some(filename) = parts.next() else {
        return Ok(None);
    };
    Ok(Some(FileExpansionRequest {
        filename,
        symbols: parts.collect(),
    }))
}

/// Split on whitespace outside quotes. Inside or outside quotes, `\` takes
/// the next character literally.
fn tokenize(line: &str) -> Result<Vec<String>, ContextSpecError> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for c in line.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => {
                in_quotes = !in_quotes;
                if !in_quotes {
                    parts.push(std::mem::take(&mut current));
                }
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }

    if in_quotes {
        return Err(ContextSpecError::UnterminatedQuote {
            line: line.to_string(),
        });
    }

    if !current.is_empty() {
        parts.push(current);
    }

    Ok(parts)
}
