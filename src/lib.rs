//! # skimcat - source renderer for LLM context
//!
//! Renders files and directories as gutter-numbered, fenced text. In outline
//! mode, large function and method bodies collapse to `... (N lines omitted) ...`
//! markers while their signatures stay visible.
//!
//! ## Architecture
//!
//! - **[`outline`]** - Language registry, tree-sitter symbol extraction, chunk assembly
//! - **[`ctxspec`]** - Parser for the expand-list mini-language
//! - **[`render`]** - Page-windowed file rendering and directory orchestration
//! - **[`config`]** - Rendering options and JSON configuration loading

pub mod config;
pub mod ctxspec;
pub mod outline;
pub mod render;

pub use config::{Config, DirectoryOptions, RenderOptions};
pub use ctxspec::{ContextSpec, ContextSpecError, FileExpansionRequest, parse_context_spec};
pub use outline::chunks::{OutlineChunk, assemble};
pub use outline::languages::{LanguageId, LanguageRegistry};
pub use outline::symbols::SymbolExtractor;
pub use outline::{
    ExtractError, Position, SourceRange, SourceUnit, SymbolCategory, SymbolKind, SymbolRecord,
    SymbolTable,
};
pub use render::{PageWindow, render, render_directory, render_file};

/// Extract the symbol table of one file.
pub fn extract(
    registry: &LanguageRegistry,
    path: &str,
    text: &str,
) -> Result<SymbolTable, ExtractError> {
    SymbolExtractor::new(registry).extract(&SourceUnit::new(path, text))
}
