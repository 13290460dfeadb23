use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};

/// Inline text spans with formatting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "style", content = "text", rename_all = "lowercase")]
pub enum Span {
    Text(String),
    Bold(String),
}

impl Span {
    pub fn text(&self) -> &str {
        match self {
            Span::Text(text) | Span::Bold(text) => text,
        }
    }
}

/// Concatenate spans into unstyled text.
pub fn spans_text(spans: &[Span]) -> String {
    spans.iter().map(Span::text).collect()
}

/// Text size presets of the compact renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextSize {
    #[default]
    Normal,
    Small,
}

/// Which renderer flavor to parse and present with.
///
/// `Full` recognizes pipe tables and uses generous spacing. `Compact` is the
/// chat flavor: no tables, tighter spacing, and a text size preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    #[default]
    Full,
    Compact(TextSize),
}

impl Variant {
    pub fn supports_tables(self) -> bool {
        matches!(self, Variant::Full)
    }

    pub fn size(self) -> TextSize {
        match self {
            Variant::Full => TextSize::Normal,
            Variant::Compact(size) => size,
        }
    }
}

/// Tag identifying a block for templating layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Heading2,
    Heading3,
    List,
    Table,
    Paragraph,
}

/// Block-level elements parsed from the Markdown subset
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading {
        level: u8,
        content: Vec<Span>,
    },
    List {
        items: Vec<Vec<Span>>,
    },
    Paragraph {
        content: Vec<Span>,
    },
    Table {
        headers: Vec<Vec<Span>>,
        rows: Vec<Vec<Vec<Span>>>,
    },
}

impl Block {
    pub fn kind(&self) -> BlockKind {
        match self {
            Block::Heading { level, .. } if *level <= 2 => BlockKind::Heading2,
            Block::Heading { .. } => BlockKind::Heading3,
            Block::List { .. } => BlockKind::List,
            Block::Paragraph { .. } => BlockKind::Paragraph,
            Block::Table { .. } => BlockKind::Table,
        }
    }

    /// Unstyled rendition for terminals and logs.
    pub fn plain_text(&self) -> String {
        match self {
            Block::Heading { content, .. } | Block::Paragraph { content } => spans_text(content),
            Block::List { items } => items
                .iter()
                .map(|item| format!("• {}", spans_text(item)))
                .collect::<Vec<_>>()
                .join("\n"),
            Block::Table { headers, rows } => std::iter::once(headers)
                .chain(rows)
                .map(|row| {
                    row.iter()
                        .map(|cell| spans_text(cell))
                        .collect::<Vec<_>>()
                        .join(" | ")
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

impl Serialize for Block {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Block::Heading { content, .. } | Block::Paragraph { content } => {
                let mut state = serializer.serialize_struct("Block", 2)?;
                state.serialize_field("kind", &self.kind())?;
                state.serialize_field("content", content)?;
                state.end()
            }
            Block::List { items } => {
                let mut state = serializer.serialize_struct("Block", 2)?;
                state.serialize_field("kind", &self.kind())?;
                state.serialize_field("items", items)?;
                state.end()
            }
            Block::Table { headers, rows } => {
                let mut state = serializer.serialize_struct("Block", 3)?;
                state.serialize_field("kind", &self.kind())?;
                state.serialize_field("headers", headers)?;
                state.serialize_field("rows", rows)?;
                state.end()
            }
        }
    }
}

/// Render blocks as plain text, one blank line between blocks.
pub fn blocks_to_text(blocks: &[Block]) -> String {
    let mut out = String::new();
    for block in blocks {
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str(&block.plain_text());
    }
    out
}
