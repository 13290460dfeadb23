use tracing::{debug, trace};

use crate::block::{Block, Span, Variant};
use crate::inline::parse_inline;

/// Parse Markdown-subset text into a list of blocks.
///
/// Never fails: anything that is not a heading, list item or table row
/// becomes a paragraph, and malformed table rows are dropped.
pub fn parse(text: &str, variant: Variant) -> Vec<Block> {
    let mut state = ParseState::new(variant);

    for raw in text.split('\n') {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        state.line(line);
    }

    state.finish()
}

struct ParseState {
    tables: bool,
    blocks: Vec<Block>,
    pending: Pending,
}

/// Accumulator for blocks that span several lines.
#[derive(Default)]
enum Pending {
    #[default]
    None,
    List(Vec<Vec<Span>>),
    Table(TableBuilder),
}

struct TableBuilder {
    headers: Vec<Vec<Span>>,
    rows: Vec<Vec<Vec<Span>>>,
}

impl ParseState {
    fn new(variant: Variant) -> Self {
        Self {
            tables: variant.supports_tables(),
            blocks: Vec::new(),
            pending: Pending::None,
        }
    }

    fn line(&mut self, line: &str) {
        let trimmed = line.trim();

        if self.tables && trimmed.starts_with('|') {
            self.table_row(trimmed);
        } else if let Some(rest) = line.strip_prefix("## ") {
            self.flush();
            self.heading(2, rest);
        } else if let Some(rest) = line.strip_prefix("### ") {
            self.flush();
            self.heading(3, rest);
        } else if let Some(item) = trimmed.strip_prefix("* ") {
            self.list_item(item);
        } else {
            self.flush();
            if !trimmed.is_empty() {
                self.blocks.push(Block::Paragraph {
                    content: parse_inline(line),
                });
            }
        }
    }

    fn heading(&mut self, level: u8, text: &str) {
        self.blocks.push(Block::Heading {
            level,
            content: parse_inline(text),
        });
    }

    fn list_item(&mut self, item: &str) {
        if !matches!(self.pending, Pending::List(_)) {
            self.flush();
        }
        let content = parse_inline(item);
        match &mut self.pending {
            Pending::List(items) => items.push(content),
            pending => *pending = Pending::List(vec![content]),
        }
    }

    fn table_row(&mut self, trimmed: &str) {
        if matches!(self.pending, Pending::List(_)) {
            self.flush();
        }

        let cells = split_cells(trimmed);
        if cells.iter().all(|cell| cell.is_empty()) {
            trace!(line = trimmed, "ignoring empty table row");
            return;
        }

        match &mut self.pending {
            Pending::Table(table) => {
                if is_separator(trimmed) {
                    return;
                }
                if cells.len() == table.headers.len() {
                    table.rows.push(cells.into_iter().map(parse_inline).collect());
                } else {
                    debug!(
                        cells = cells.len(),
                        expected = table.headers.len(),
                        "dropping table row with mismatched cell count"
                    );
                }
            }
            pending => {
                *pending = Pending::Table(TableBuilder {
                    headers: cells.into_iter().map(parse_inline).collect(),
                    rows: Vec::new(),
                });
            }
        }
    }

    fn flush(&mut self) {
        match std::mem::take(&mut self.pending) {
            Pending::None => {}
            Pending::List(items) => {
                if !items.is_empty() {
                    self.blocks.push(Block::List { items });
                }
            }
            Pending::Table(TableBuilder { headers, rows }) => {
                self.blocks.push(Block::Table { headers, rows });
            }
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush();
        self.blocks
    }
}

/// Split a trimmed `|`-prefixed line into trimmed cells, dropping the
/// segments before the first and after the last pipe.
fn split_cells(trimmed: &str) -> Vec<&str> {
    let mut segments = trimmed.split('|');
    segments.next();
    let mut cells: Vec<&str> = segments.map(str::trim).collect();
    cells.pop();
    cells
}

/// Alignment row such as `|---|:--:|`: every cell is dashes with optional
/// colons at either end, and the line starts and ends with a pipe.
fn is_separator(trimmed: &str) -> bool {
    let Some(inner) = trimmed
        .strip_prefix('|')
        .and_then(|rest| rest.strip_suffix('|'))
    else {
        return false;
    };
    inner.split('|').all(is_separator_cell)
}

fn is_separator_cell(cell: &str) -> bool {
    let cell = cell.trim();
    let cell = cell.strip_prefix(':').unwrap_or(cell);
    let cell = cell.strip_suffix(':').unwrap_or(cell);
    !cell.is_empty() && cell.chars().all(|c| c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockKind, TextSize};

    const COMPACT: Variant = Variant::Compact(TextSize::Normal);

    fn text(s: &str) -> Span {
        Span::Text(s.to_string())
    }

    fn bold(s: &str) -> Span {
        Span::Bold(s.to_string())
    }

    fn cells(values: &[&str]) -> Vec<Vec<Span>> {
        values.iter().map(|v| vec![text(v)]).collect()
    }

    #[test]
    fn heading_level_two() {
        assert_eq!(
            parse("## Title", Variant::Full),
            vec![Block::Heading {
                level: 2,
                content: vec![text("Title")],
            }]
        );
    }

    #[test]
    fn heading_level_three_with_bold() {
        assert_eq!(
            parse("### Sub **bold** end", Variant::Full),
            vec![Block::Heading {
                level: 3,
                content: vec![text("Sub "), bold("bold"), text(" end")],
            }]
        );
    }

    #[test]
    fn heading_prefix_is_matched_on_raw_line() {
        let blocks = parse("  ## not a heading", Variant::Full);
        assert_eq!(
            blocks,
            vec![Block::Paragraph {
                content: vec![text("  ## not a heading")],
            }]
        );
    }

    #[test]
    fn heading_needs_space() {
        let blocks = parse("##Title\n#### Deep", Variant::Full);
        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().all(|b| b.kind() == BlockKind::Paragraph));
    }

    #[test]
    fn list_then_paragraph() {
        assert_eq!(
            parse("* a\n* b\n\nc", Variant::Full),
            vec![
                Block::List {
                    items: vec![vec![text("a")], vec![text("b")]],
                },
                Block::Paragraph {
                    content: vec![text("c")],
                },
            ]
        );
    }

    #[test]
    fn indented_list_items_are_trimmed() {
        assert_eq!(
            parse("   * one\n\t* **two**", COMPACT),
            vec![Block::List {
                items: vec![vec![text("one")], vec![bold("two")]],
            }]
        );
    }

    #[test]
    fn blank_line_splits_lists() {
        let blocks = parse("* a\n\n* b", Variant::Full);
        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().all(|b| b.kind() == BlockKind::List));
    }

    #[test]
    fn heading_interrupts_list() {
        let kinds: Vec<_> = parse("* a\n## H\n* b", Variant::Full)
            .iter()
            .map(Block::kind)
            .collect();
        assert_eq!(
            kinds,
            vec![BlockKind::List, BlockKind::Heading2, BlockKind::List]
        );
    }

    #[test]
    fn paragraph_keeps_leading_whitespace() {
        assert_eq!(
            parse("   indented", Variant::Full),
            vec![Block::Paragraph {
                content: vec![text("   indented")],
            }]
        );
    }

    #[test]
    fn blank_lines_produce_nothing() {
        assert!(parse("", Variant::Full).is_empty());
        assert!(parse("\n  \n\t\n", COMPACT).is_empty());
    }

    #[test]
    fn crlf_input() {
        assert_eq!(
            parse("## Title\r\n* a\r\n* b\r\n", Variant::Full),
            vec![
                Block::Heading {
                    level: 2,
                    content: vec![text("Title")],
                },
                Block::List {
                    items: vec![vec![text("a")], vec![text("b")]],
                },
            ]
        );
    }

    #[test]
    fn table_with_separator() {
        assert_eq!(
            parse("| A | B |\n|---|---|\n| 1 | 2 |", Variant::Full),
            vec![Block::Table {
                headers: cells(&["A", "B"]),
                rows: vec![cells(&["1", "2"])],
            }]
        );
    }

    #[test]
    fn aligned_separator_is_skipped() {
        let blocks = parse("| A | B |\n| :-- | --: |\n|:-:|-|\n| 1 | 2 |", Variant::Full);
        assert_eq!(
            blocks,
            vec![Block::Table {
                headers: cells(&["A", "B"]),
                rows: vec![cells(&["1", "2"])],
            }]
        );
    }

    #[test]
    fn ragged_rows_are_dropped() {
        assert_eq!(
            parse("| A | B |\n| 1 | 2 | 3 |\n| 4 |\n| 5 | 6 |", Variant::Full),
            vec![Block::Table {
                headers: cells(&["A", "B"]),
                rows: vec![cells(&["5", "6"])],
            }]
        );
    }

    #[test]
    fn header_only_table() {
        assert_eq!(
            parse("| A | B |", Variant::Full),
            vec![Block::Table {
                headers: cells(&["A", "B"]),
                rows: vec![],
            }]
        );
    }

    #[test]
    fn separator_before_header_becomes_header() {
        let blocks = parse("|---|---|\n| 1 | 2 |", Variant::Full);
        assert_eq!(
            blocks,
            vec![Block::Table {
                headers: cells(&["---", "---"]),
                rows: vec![cells(&["1", "2"])],
            }]
        );
    }

    #[test]
    fn empty_row_does_not_start_table() {
        assert_eq!(
            parse("|  |\nafter", Variant::Full),
            vec![Block::Paragraph {
                content: vec![text("after")],
            }]
        );
    }

    #[test]
    fn empty_row_inside_table_is_ignored() {
        let blocks = parse("| A |\n|   |\n| 1 |", Variant::Full);
        assert_eq!(
            blocks,
            vec![Block::Table {
                headers: cells(&["A"]),
                rows: vec![cells(&["1"])],
            }]
        );
    }

    #[test]
    fn blank_line_ends_table() {
        let kinds: Vec<_> = parse("| A |\n| 1 |\n\n| B |\n| 2 |", Variant::Full)
            .iter()
            .map(Block::kind)
            .collect();
        assert_eq!(kinds, vec![BlockKind::Table, BlockKind::Table]);
    }

    #[test]
    fn table_row_flushes_list_and_list_flushes_table() {
        let kinds: Vec<_> = parse("* a\n| A |\n* b", Variant::Full)
            .iter()
            .map(Block::kind)
            .collect();
        assert_eq!(
            kinds,
            vec![BlockKind::List, BlockKind::Table, BlockKind::List]
        );
    }

    #[test]
    fn table_cells_parse_bold() {
        let blocks = parse("| **A** | B |\n| x | **y** |", Variant::Full);
        assert_eq!(
            blocks,
            vec![Block::Table {
                headers: vec![vec![bold("A")], vec![text("B")]],
                rows: vec![vec![vec![text("x")], vec![bold("y")]]],
            }]
        );
    }

    #[test]
    fn compact_never_emits_tables() {
        let blocks = parse("| A | B |\n|---|---|\n| 1 | 2 |", COMPACT);
        assert_eq!(blocks.len(), 3);
        assert!(blocks.iter().all(|b| b.kind() == BlockKind::Paragraph));
        assert_eq!(
            blocks[0],
            Block::Paragraph {
                content: vec![text("| A | B |")],
            }
        );
    }

    #[test]
    fn order_is_preserved() {
        let input = "## One\nintro\n### Two\n* x\n| H |\n| v |\nend";
        let kinds: Vec<_> = parse(input, Variant::Full).iter().map(Block::kind).collect();
        assert_eq!(
            kinds,
            vec![
                BlockKind::Heading2,
                BlockKind::Paragraph,
                BlockKind::Heading3,
                BlockKind::List,
                BlockKind::Table,
                BlockKind::Paragraph,
            ]
        );
    }

    #[test]
    fn tolerates_arbitrary_input() {
        let inputs = [
            "|",
            "||||",
            "| a | b\n|---",
            "**",
            "* ",
            "*",
            "## ",
            "### ",
            "\r",
            "| ** | ** |\n| **x",
        ];
        for input in inputs {
            let _ = parse(input, Variant::Full);
            let _ = parse(input, Variant::Compact(TextSize::Small));
        }
    }

    #[test]
    fn separator_detection() {
        assert!(is_separator("|---|---|"));
        assert!(is_separator("| :--- | ---: | :-: |"));
        assert!(!is_separator("|---|---"));
        assert!(!is_separator("| : |"));
        assert!(!is_separator("| - - |"));
        assert!(!is_separator("||"));
        assert!(!is_separator("| a |"));
    }
}
