use std::collections::HashMap;
use std::path::Path;

use regex::Regex;
use tracing::debug;
use tree_sitter::{Node, Parser, Query, QueryCursor, QueryPredicateArg, StreamingIterator};

use super::languages::LanguageRegistry;
use super::{
    ExtractError, SourceUnit, SymbolCategory, SymbolKind, SymbolRecord, SymbolTable,
};

/// How far past the signature node we look for the end of its line.
const SUMMARY_SEEK_LIMIT: usize = 100;

/// Runs a language's tags query over a file and collects symbol records.
///
/// A fresh tree-sitter parser is created per call, so one extractor can be
/// shared across threads as long as the registry is.
pub struct SymbolExtractor<'r> {
    registry: &'r LanguageRegistry,
}

impl<'r> SymbolExtractor<'r> {
    pub fn new(registry: &'r LanguageRegistry) -> Self {
        Self { registry }
    }

    pub fn extract(&self, source: &SourceUnit<'_>) -> Result<SymbolTable, ExtractError> {
        let path = Path::new(source.path);
        let config = self.registry.get_by_path(path).ok_or_else(|| {
            let ext = path
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default();
            ExtractError::UnsupportedExtension(ext)
        })?;

        let mut parser = Parser::new();
        parser.set_language(&config.language)?;
        let tree = parser
            .parse(source.text, None)
            .ok_or_else(|| ExtractError::ParseFailed(source.path.to_string()))?;

        let query = Query::new(&config.language, config.query)?;
        let directives = DocDirectives::from_query(&query)?;
        let capture_names = query.capture_names();

        let text = source.text;
        let mut table = SymbolTable::default();
        let mut seen = HashMap::<_, usize>::new();

        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, tree.root_node(), text.as_bytes());
        while let Some(m) = matches.next() {
            let mut name_node = None;
            let mut content = None;
            let mut docs = Vec::new();
            let mut non_doc_captures = 0;

            for cap in m.captures {
                let label = capture_names[cap.index as usize];
                if label.starts_with("name.") {
                    name_node = Some(cap.node);
                    non_doc_captures += 1;
                } else if label == "doc" {
                    docs.push(cap.node);
                } else {
                    content = Some((cap.node, label));
                    non_doc_captures += 1;
                }
            }

            let contract_violation = || {
                let captures = m
                    .captures
                    .iter()
                    .map(|c| capture_names[c.index as usize])
                    .collect::<Vec<_>>()
                    .join(",");
                ExtractError::QueryContractViolation {
                    match_id: m.id(),
                    pattern_index: m.pattern_index,
                    captures,
                }
            };

            if non_doc_captures != 2 {
                return Err(contract_violation());
            }
            let Some(name_node) = name_node else {
                return Err(contract_violation());
            };
            // Both captures were name captures: the pattern asserts a name
            // without a definition or reference body.
            let Some((node, label)) = content else {
                continue;
            };

            let (category, kind) = parse_label(label)?;

            // One record per node and category. A method pattern is more
            // specific than a function pattern matching the same node.
            let key = (node.start_byte(), node.end_byte(), category);
            if let Some(&index) = seen.get(&key) {
                let existing = &mut table.records_mut(category)[index];
                if existing.kind == SymbolKind::Function && kind == SymbolKind::Method {
                    existing.kind = kind;
                }
                continue;
            }
            seen.insert(key, table.records_mut(category).len());

            let full_text = node.utf8_text(text.as_bytes())?.to_string();
            let mut record = SymbolRecord {
                name: name_node.utf8_text(text.as_bytes())?.to_string(),
                kind,
                category,
                range: node.range().into(),
                summary: full_text.clone(),
                full_text,
                summary_end: node.end_position().into(),
                documentation: directives.documentation(m.pattern_index, &docs, node, text)?,
            };

            if kind.is_summarizable() && node.start_position().row != node.end_position().row {
                if let Some(signature) = widest_signature_child(node) {
                    let end = seek_newline(text, signature.end_byte(), SUMMARY_SEEK_LIMIT)
                        .min(node.end_byte());
                    record.summary = text[node.start_byte()..end].to_string();
                    record.summary_end = signature.end_position().into();
                }
            }

            table.push(record);
        }

        debug!(
            path = source.path,
            language = %config.id,
            definitions = table.definitions.len(),
            references = table.references.len(),
            "extracted symbols"
        );

        Ok(table)
    }
}

fn parse_label(label: &str) -> Result<(SymbolCategory, SymbolKind), ExtractError> {
    let malformed = || ExtractError::MalformedCapture(label.to_string());
    let (category, kind) = label.split_once('.').ok_or_else(malformed)?;
    let category = SymbolCategory::parse(category).ok_or_else(malformed)?;
    let kind = SymbolKind::parse(kind).ok_or_else(malformed)?;
    Ok((category, kind))
}

/// Finds the longest direct child that starts on the node's first row but
/// does not reach its last row, e.g. a multi-line parameter list. The first
/// child wins ties.
fn widest_signature_child(node: Node<'_>) -> Option<Node<'_>> {
    let start_row = node.start_position().row;
    let end_row = node.end_position().row;

    let mut cursor = node.walk();
    let mut widest: Option<Node> = None;
    for child in node.children(&mut cursor) {
        if child.start_position().row != start_row || child.end_position().row == end_row {
            continue;
        }
        let len = child.end_byte() - child.start_byte();
        match widest {
            Some(w) if len <= w.end_byte() - w.start_byte() => {}
            _ => widest = Some(child),
        }
    }
    widest
}

/// Returns the byte offset of the first `\n` at or after `start` within
/// `limit` bytes, or `start + limit` (clamped to the text and to a char
/// boundary) when there is none.
fn seek_newline(text: &str, start: usize, limit: usize) -> usize {
    let window_end = start.saturating_add(limit).min(text.len());
    let newline = text
        .as_bytes()
        .get(start..window_end)
        .and_then(|window| window.iter().position(|&b| b == b'\n'));

    match newline {
        Some(offset) => start + offset,
        None => {
            let mut end = window_end;
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            end
        }
    }
}

/// Per-pattern `#strip!` and `#select-adjacent!` directives. Tree-sitter
/// leaves these to the caller.
#[derive(Default)]
struct DocDirectives {
    strip: Vec<Vec<Regex>>,
    select_adjacent: Vec<bool>,
}

impl DocDirectives {
    fn from_query(query: &Query) -> Result<Self, ExtractError> {
        let mut directives = Self {
            strip: vec![Vec::new(); query.pattern_count()],
            select_adjacent: vec![false; query.pattern_count()],
        };

        for pattern_index in 0..query.pattern_count() {
            for predicate in query.general_predicates(pattern_index) {
                match predicate.operator.as_ref() {
                    "strip!" => {
                        let [QueryPredicateArg::Capture(_), QueryPredicateArg::String(pattern)] =
                            predicate.args.as_ref()
                        else {
                            return Err(ExtractError::InvalidDirective {
                                pattern_index,
                                reason: "strip! expects a capture and a regex".to_string(),
                            });
                        };
                        let regex = Regex::new(pattern).map_err(|e| {
                            ExtractError::InvalidDirective {
                                pattern_index,
                                reason: e.to_string(),
                            }
                        })?;
                        directives.strip[pattern_index].push(regex);
                    }
                    "select-adjacent!" | "set-adjacent!" => {
                        directives.select_adjacent[pattern_index] = true;
                    }
                    other => debug!(pattern_index, directive = other, "ignoring query directive"),
                }
            }
        }

        Ok(directives)
    }

    fn documentation(
        &self,
        pattern_index: usize,
        docs: &[Node<'_>],
        target: Node<'_>,
        text: &str,
    ) -> Result<String, ExtractError> {
        let selected = if self.select_adjacent[pattern_index] {
            adjacent_docs(docs, target)
        } else {
            docs.to_vec()
        };

        let mut parts = Vec::with_capacity(selected.len());
        for doc in selected {
            let mut doc_text = doc.utf8_text(text.as_bytes())?.to_string();
            for regex in &self.strip[pattern_index] {
                doc_text = regex.replace_all(&doc_text, "").into_owned();
            }
            parts.push(doc_text);
        }
        Ok(parts.join("\n"))
    }
}

/// Keeps the run of doc nodes that ends directly above `target`, with no
/// blank rows between consecutive nodes.
fn adjacent_docs<'t>(docs: &[Node<'t>], target: Node<'t>) -> Vec<Node<'t>> {
    let mut kept = Vec::new();
    let mut next_row = target.start_position().row;
    for doc in docs.iter().rev() {
        if doc.end_byte() > target.start_byte() {
            continue;
        }
        if doc.end_position().row + 1 < next_row {
            break;
        }
        kept.push(*doc);
        next_row = doc.start_position().row;
    }
    kept.reverse();
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::Position;

    const GO_SAMPLE: &str = r#"package treesym

import (
	"context"
	"fmt"
)

type SourceFile struct {
	Path string
	Text string
}

// GetSymbols parses the file.
// It returns any symbols found.
func GetSymbols(ctx context.Context, file *SourceFile) (any, error) {
	tree, err := parse(ctx, file)
	if err != nil {
		return nil, err
	}

	fmt.Println(tree)
	return nil, nil
}
"#;

    const PYTHON_SAMPLE: &str = r#"
AIDER_SITE_URL = "https://aider.chat"

class LazyLiteLLM:
    _lazy_module = None

    def __getattr__(
    	self,
    	name,
    ):
        if name == "_lazy_module":
            return super()
        self._load_litellm()
        return getattr(self._lazy_module, name)

    def _load_litellm(self):
        if self._lazy_module is not None:
            return

        self._lazy_module = importlib.import_module("litellm")

litellm = LazyLiteLLM()
"#;

    fn extract(path: &str, text: &str) -> Result<SymbolTable, ExtractError> {
        let registry = LanguageRegistry::new();
        SymbolExtractor::new(&registry).extract(&SourceUnit::new(path, text))
    }

    fn find<'a>(table: &'a SymbolTable, name: &str) -> &'a SymbolRecord {
        table
            .definitions
            .iter()
            .find(|d| d.name == name)
            .unwrap_or_else(|| panic!("no definition named {name}"))
    }

    #[test]
    fn test_go_definitions() {
        let table = extract("treesym/treesym.go", GO_SAMPLE).expect("extract go");

        let source_file = find(&table, "SourceFile");
        assert_eq!(source_file.kind, SymbolKind::Type);
        assert_eq!(source_file.summary, "SourceFile struct {\n\tPath string\n\tText string\n}");
        assert!(!source_file.is_summarized());

        let get_symbols = find(&table, "GetSymbols");
        assert_eq!(get_symbols.kind, SymbolKind::Function);
        assert_eq!(
            get_symbols.summary,
            "func GetSymbols(ctx context.Context, file *SourceFile) (any, error) {"
        );
        assert_eq!(get_symbols.summary_end.row, get_symbols.range.start.row);
        assert!(get_symbols.documentation.ends_with("It returns any symbols found."));
        assert!(!get_symbols.documentation.contains("//"));

        assert!(table.references.iter().any(|r| r.name == "Println" && r.kind == SymbolKind::Call));
    }

    #[test]
    fn test_python_multiline_signature() {
        let table = extract("test.py", PYTHON_SAMPLE).expect("extract python");

        assert_eq!(find(&table, "LazyLiteLLM").kind, SymbolKind::Class);

        let getattr = find(&table, "__getattr__");
        assert_eq!(getattr.kind, SymbolKind::Function);
        assert_eq!(getattr.summary, "def __getattr__(\n    \tself,\n    \tname,\n    ):");
        assert_eq!(getattr.summary_end.row, getattr.range.start.row + 3);

        let load = find(&table, "_load_litellm");
        assert_eq!(load.summary, "def _load_litellm(self):");

        assert!(table.references.iter().any(|r| r.name == "getattr"));
    }

    #[test]
    fn test_summary_is_prefix_of_full_text() {
        for (path, text) in [("a.go", GO_SAMPLE), ("a.py", PYTHON_SAMPLE)] {
            let table = extract(path, text).unwrap();
            for def in &table.definitions {
                assert!(def.full_text.starts_with(&def.summary), "{}", def.name);
                assert!(def.summary_end.row <= def.range.end.row);
            }
        }
    }

    #[test]
    fn test_single_line_function_is_not_truncated() {
        let table = extract("one.py", "def f(): return 1\n").unwrap();
        let f = find(&table, "f");
        assert_eq!(f.summary, f.full_text);
    }

    #[test]
    fn test_brace_on_next_line_summary() {
        let text = "fn main()\n{\n    run();\n}\n";
        let table = extract("main.rs", text).unwrap();
        let main = table
            .definitions
            .iter()
            .find(|d| d.name == "main" && d.kind == SymbolKind::Function)
            .unwrap();
        assert_eq!(main.summary, "fn main()");
        assert_eq!(main.summary_end.row, 0);
        assert!(main.is_summarized());
    }

    #[test]
    fn test_rust_methods_and_functions() {
        let text = r#"struct Point {
    x: i32,
}

impl Point {
    fn norm(&self) -> i32 {
        self.x.abs()
    }
}
"#;
        let table = extract("point.rs", text).unwrap();
        assert!(table.definitions.iter().any(|d| d.name == "Point" && d.kind == SymbolKind::Class));
        let norms: Vec<_> = table.definitions.iter().filter(|d| d.name == "norm").collect();
        assert_eq!(norms.len(), 1);
        assert_eq!(norms[0].kind, SymbolKind::Method);
        assert!(table.references.iter().any(|r| r.name == "Point" && r.kind == SymbolKind::Implementation));
    }

    #[test]
    fn test_equal_width_children_first_wins() {
        // `func` and `Fooo` are both four bytes wide and stay on the first row.
        let text = "package p\n\nfunc Fooo(\n) {\n\tx()\n}\n";
        let table = extract("tie.go", text).unwrap();
        let fooo = find(&table, "Fooo");
        assert_eq!(fooo.summary_end, Position { row: 2, column: 4 });
        assert_eq!(fooo.summary, "func Fooo(");
    }

    #[test]
    fn test_unsupported_extension() {
        let err = extract("notes.xyz", "hello").unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_parse_label() {
        assert_eq!(
            parse_label("definition.method").unwrap(),
            (SymbolCategory::Definition, SymbolKind::Method)
        );
        assert!(matches!(parse_label("definition"), Err(ExtractError::MalformedCapture(_))));
        assert!(matches!(parse_label("usage.call"), Err(ExtractError::MalformedCapture(_))));
    }

    #[test]
    fn test_seek_newline() {
        assert_eq!(seek_newline("abc\ndef", 1, 100), 3);
        assert_eq!(seek_newline("abcdef", 2, 100), 6);
        assert_eq!(seek_newline(&"x".repeat(300), 10, 100), 110);
        // Never splits a multi-byte character.
        assert_eq!(seek_newline("aé", 0, 2), 1);
    }
}
