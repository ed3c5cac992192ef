/// Tree-sitter symbol extraction and outline chunking.
///
/// [`symbols`] turns a parsed file into a [`SymbolTable`] by running the
/// language's tags query; [`chunks`] partitions the file into verbatim and
/// omittable [`chunks::OutlineChunk`]s based on the extracted definitions.
pub mod chunks;
pub mod languages;
pub mod symbols;

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while extracting symbols from a file.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// No language is registered for the file's extension. Callers fall back
    /// to raw rendering.
    #[error("unsupported file extension: {0:?}")]
    UnsupportedExtension(String),

    #[error(
        "unexpected captures in query match id:{match_id} pattern_index:{pattern_index} captures: {captures}"
    )]
    QueryContractViolation {
        match_id: u32,
        pattern_index: usize,
        captures: String,
    },

    #[error("malformed capture label: {0}")]
    MalformedCapture(String),

    #[error("invalid directive in pattern {pattern_index}: {reason}")]
    InvalidDirective { pattern_index: usize, reason: String },

    #[error("failed to parse {0}")]
    ParseFailed(String),

    #[error("setting parser language: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    #[error("creating query: {0}")]
    Query(#[from] tree_sitter::QueryError),

    #[error("node text is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

impl ExtractError {
    /// Whether this is the recoverable "no grammar for this file" signal.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedExtension(_))
    }
}

/// A file handed to the extractor and renderer. Never mutated.
#[derive(Debug, Clone, Copy)]
pub struct SourceUnit<'a> {
    pub path: &'a str,
    pub text: &'a str,
}

impl<'a> SourceUnit<'a> {
    pub fn new(path: &'a str, text: &'a str) -> Self {
        Self { path, text }
    }
}

/// 0-indexed row/column, as tree-sitter reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
pub struct Position {
    pub row: usize,
    pub column: usize,
}

impl From<tree_sitter::Point> for Position {
    fn from(point: tree_sitter::Point) -> Self {
        Self {
            row: point.row,
            column: point.column,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SourceRange {
    pub start_byte: usize,
    pub end_byte: usize,
    pub start: Position,
    pub end: Position,
}

impl From<tree_sitter::Range> for SourceRange {
    fn from(range: tree_sitter::Range) -> Self {
        Self {
            start_byte: range.start_byte,
            end_byte: range.end_byte,
            start: range.start_point.into(),
            end: range.end_point.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Class,
    Function,
    Method,
    Type,
    Interface,
    Module,
    Macro,
    Enum,
    Call,
    Implementation,
}

impl SymbolKind {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "class" => Self::Class,
            "function" => Self::Function,
            "method" => Self::Method,
            "type" => Self::Type,
            "interface" => Self::Interface,
            "module" => Self::Module,
            "macro" => Self::Macro,
            "enum" => Self::Enum,
            "call" => Self::Call,
            "implementation" => Self::Implementation,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Function => "function",
            Self::Method => "method",
            Self::Type => "type",
            Self::Interface => "interface",
            Self::Module => "module",
            Self::Macro => "macro",
            Self::Enum => "enum",
            Self::Call => "call",
            Self::Implementation => "implementation",
        }
    }

    /// Only function-like definitions get their bodies truncated.
    pub fn is_summarizable(self) -> bool {
        matches!(self, Self::Function | Self::Method)
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolCategory {
    Definition,
    Reference,
}

impl SymbolCategory {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "definition" => Some(Self::Definition),
            "reference" => Some(Self::Reference),
            _ => None,
        }
    }
}

/// One definition or reference found by a tags query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolRecord {
    pub name: String,
    pub kind: SymbolKind,
    pub category: SymbolCategory,
    pub range: SourceRange,
    pub full_text: String,
    /// Byte prefix of `full_text`; shorter only for multi-line functions and methods.
    pub summary: String,
    pub summary_end: Position,
    pub documentation: String,
}

impl SymbolRecord {
    /// Whether the body past the summary can be collapsed in an outline.
    pub fn is_summarized(&self) -> bool {
        self.summary != self.full_text
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SymbolTable {
    pub definitions: Vec<SymbolRecord>,
    pub references: Vec<SymbolRecord>,
}

impl SymbolTable {
    pub fn push(&mut self, record: SymbolRecord) {
        match record.category {
            SymbolCategory::Definition => self.definitions.push(record),
            SymbolCategory::Reference => self.references.push(record),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty() && self.references.is_empty()
    }

    pub(crate) fn records_mut(&mut self, category: SymbolCategory) -> &mut Vec<SymbolRecord> {
        match category {
            SymbolCategory::Definition => &mut self.definitions,
            SymbolCategory::Reference => &mut self.references,
        }
    }
}
