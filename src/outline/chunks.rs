use serde::Serialize;
use tracing::debug;

use super::SymbolRecord;

/// A contiguous run of source rows rendered as a unit.
///
/// `name` is set exactly when `should_omit` is: verbatim chunks can span many
/// symbols, so they carry no name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineChunk {
    pub name: Option<String>,
    pub content: String,
    pub should_omit: bool,
    /// 0-indexed, inclusive, like tree-sitter rows.
    pub start_row: usize,
    pub end_row: usize,
    #[serde(skip)]
    line_count: usize,
}

impl OutlineChunk {
    fn verbatim(start_row: usize) -> Self {
        Self {
            name: None,
            content: String::new(),
            should_omit: false,
            start_row,
            end_row: start_row,
            line_count: 0,
        }
    }

    fn omittable(name: &str, lines: &[&str], start_row: usize, end_row: usize) -> Self {
        Self {
            name: Some(name.to_string()),
            content: lines[start_row..=end_row].join("\n"),
            should_omit: true,
            start_row,
            end_row,
            line_count: end_row - start_row + 1,
        }
    }

    fn push_line(&mut self, row: usize, line: &str) {
        if self.line_count > 0 {
            self.content.push('\n');
        }
        self.content.push_str(line);
        self.end_row = row;
        self.line_count += 1;
    }

    /// Number of source rows covered.
    pub fn row_count(&self) -> usize {
        self.end_row - self.start_row + 1
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.content.split('\n')
    }
}

/// Partitions `text` into verbatim and omittable chunks.
///
/// Every summarized definition contributes one omittable chunk covering the
/// rows after its summary. The returned chunks cover every row of `text`
/// exactly once, in order. Omissions nested inside (or duplicating) an earlier
/// omission are dropped so the outer one wins.
pub fn assemble(text: &str, definitions: &[SymbolRecord]) -> Vec<OutlineChunk> {
    let lines: Vec<&str> = text.split('\n').collect();
    let omissions = omittable_chunks(&lines, definitions);

    let mut chunks = Vec::with_capacity(omissions.len() * 2 + 1);
    let mut pending = omissions.into_iter().peekable();
    let mut current = OutlineChunk::verbatim(0);
    let mut row = 0;

    while row < lines.len() {
        if let Some(omitted) = pending.next_if(|c| c.start_row == row) {
            if current.line_count > 0 {
                chunks.push(current);
            }
            row = omitted.end_row + 1;
            chunks.push(omitted);
            current = OutlineChunk::verbatim(row);
            continue;
        }

        current.push_line(row, lines[row]);
        row += 1;
    }

    if current.line_count > 0 {
        chunks.push(current);
    }

    chunks
}

fn omittable_chunks(lines: &[&str], definitions: &[SymbolRecord]) -> Vec<OutlineChunk> {
    let mut candidates: Vec<OutlineChunk> = definitions
        .iter()
        .filter(|def| def.is_summarized())
        .filter_map(|def| {
            let start_row = def.summary_end.row + 1;
            let end_row = def.range.end.row;
            (start_row <= end_row && end_row < lines.len())
                .then(|| OutlineChunk::omittable(&def.name, lines, start_row, end_row))
        })
        .collect();

    candidates.sort_by(|a, b| {
        a.start_row
            .cmp(&b.start_row)
            .then(b.end_row.cmp(&a.end_row))
    });

    let mut accepted: Vec<OutlineChunk> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if let Some(previous) = accepted.last() {
            if candidate.start_row <= previous.end_row {
                debug!(
                    name = candidate.name.as_deref().unwrap_or_default(),
                    start_row = candidate.start_row,
                    enclosing = previous.name.as_deref().unwrap_or_default(),
                    "dropping nested omission"
                );
                continue;
            }
        }
        accepted.push(candidate);
    }
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::{Position, SourceRange, SymbolCategory, SymbolKind};

    fn function(name: &str, start_row: usize, summary_row: usize, end_row: usize) -> SymbolRecord {
        SymbolRecord {
            name: name.to_string(),
            kind: SymbolKind::Function,
            category: SymbolCategory::Definition,
            range: SourceRange {
                start: Position { row: start_row, column: 0 },
                end: Position { row: end_row, column: 1 },
                ..SourceRange::default()
            },
            full_text: "full body".to_string(),
            summary: "full".to_string(),
            summary_end: Position { row: summary_row, column: 0 },
            documentation: String::new(),
        }
    }

    fn numbered_text(lines: usize) -> String {
        (0..lines).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n")
    }

    fn assert_partition(chunks: &[OutlineChunk], total_lines: usize) {
        let mut next_row = 0;
        for chunk in chunks {
            assert_eq!(chunk.start_row, next_row, "gap or overlap at {chunk:?}");
            assert!(chunk.end_row >= chunk.start_row);
            assert_eq!(chunk.lines().count(), chunk.row_count());
            assert_eq!(chunk.name.is_some(), chunk.should_omit);
            next_row = chunk.end_row + 1;
        }
        assert_eq!(next_row, total_lines);
    }

    #[test]
    fn test_no_definitions_is_single_chunk() {
        let text = numbered_text(5);
        let chunks = assemble(&text, &[]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, text);
        assert!(!chunks[0].should_omit);
        assert_partition(&chunks, 5);
    }

    #[test]
    fn test_omission_in_the_middle() {
        let text = numbered_text(50);
        let chunks = assemble(&text, &[function("run", 10, 11, 40)]);

        assert_eq!(chunks.len(), 3);
        assert_eq!((chunks[0].start_row, chunks[0].end_row), (0, 11));
        assert_eq!((chunks[1].start_row, chunks[1].end_row), (12, 40));
        assert_eq!(chunks[1].name.as_deref(), Some("run"));
        assert_eq!(chunks[1].row_count(), 29);
        assert!(chunks[1].content.starts_with("line 12\n"));
        assert!(chunks[1].content.ends_with("line 40"));
        assert_eq!((chunks[2].start_row, chunks[2].end_row), (41, 49));
        assert_partition(&chunks, 50);
    }

    #[test]
    fn test_unsummarized_definitions_are_ignored() {
        let text = numbered_text(10);
        let mut def = function("whole", 0, 9, 9);
        def.summary = def.full_text.clone();
        let chunks = assemble(&text, &[def]);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_adjacent_omissions_and_blank_separator() {
        let text = "fn a(\n) {\n  1\n}\n\nfn b(\n) {\n  2\n}";
        let defs = [function("a", 0, 1, 3), function("b", 5, 6, 8)];
        let chunks = assemble(text, &defs);

        let omitted: Vec<_> = chunks.iter().filter(|c| c.should_omit).collect();
        assert_eq!(omitted.len(), 2);
        // The single blank row between the two functions is kept.
        assert!(chunks.iter().any(|c| !c.should_omit && c.start_row == 4 && c.end_row == 6));
        assert_partition(&chunks, 9);
    }

    #[test]
    fn test_omission_reaching_last_line() {
        let text = numbered_text(6);
        let chunks = assemble(&text, &[function("tail", 2, 2, 5)]);
        assert_eq!(chunks.last().map(|c| c.should_omit), Some(true));
        assert_partition(&chunks, 6);
    }

    #[test]
    fn test_nested_and_duplicate_omissions_keep_outer() {
        let text = numbered_text(30);
        let defs = [
            function("inner", 8, 8, 12),
            function("outer", 2, 3, 20),
            function("outer_again", 2, 3, 20),
            function("after", 22, 22, 25),
        ];
        let chunks = assemble(&text, &defs);

        let names: Vec<_> = chunks.iter().filter_map(|c| c.name.as_deref()).collect();
        assert_eq!(names, ["outer", "after"]);
        assert_partition(&chunks, 30);
    }

    #[test]
    fn test_trailing_newline_row_is_covered() {
        let text = "a\nb\n";
        let chunks = assemble(text, &[]);
        assert_partition(&chunks, 3);
    }
}
