use crate::block::{Block, Span, TextSize, Variant};
use crate::config::Config;
use crate::equation::EquationPart;
use crate::latex;

use tracing::debug;

/// Convert blocks to Typst markup
pub fn blocks_to_typst(blocks: &[Block], variant: Variant, config: &Config) -> String {
    let mut out = String::new();
    emit_preamble(variant, config, &mut out);

    let mut i = 0;
    while i < blocks.len() {
        let block = &blocks[i];

        match block {
            Block::Heading { .. } => {
                // Keep heading with following content using a block that prevents breaks
                out.push_str("#block(breakable: false)[\n");
                emit_block(block, &mut out);

                if i + 1 < blocks.len() {
                    i += 1;
                    emit_block(&blocks[i], &mut out);
                }
                out.push_str("]\n\n");
            }
            _ => emit_block(block, &mut out),
        }

        i += 1;
    }

    out
}

fn emit_preamble(variant: Variant, config: &Config, out: &mut String) {
    out.push_str("#set par(linebreaks: \"optimized\")\n");

    if config.page.numbers {
        out.push_str("#set page(numbering: \"1\")\n");
    }

    let size = match variant.size() {
        TextSize::Normal => config.font.size.clone(),
        TextSize::Small => format!("({}) * 0.875", config.font.size),
    };
    let mut text_args = vec![format!("size: {size}")];
    if let Some(family) = &config.font.family {
        text_args.push(format!("font: {}", quote(family)));
    }
    if let Some(lang) = &config.text.lang {
        text_args.push(format!("lang: {}", quote(lang)));
    }
    text_args.push(format!("dir: {}", config.text.dir.as_str()));
    out.push_str(&format!("#set text({})\n", text_args.join(", ")));

    match variant {
        Variant::Full => {
            out.push_str("#set par(leading: 0.8em)\n");
            out.push_str("#show heading: set block(above: 1.6em, below: 0.9em)\n");
            out.push_str("#show heading.where(level: 2): set text(size: 1.5em)\n");
            out.push_str("#show heading.where(level: 3): set text(size: 1.25em)\n");
        }
        Variant::Compact(_) => {
            out.push_str("#set block(spacing: 0.6em)\n");
            out.push_str("#show heading: set block(above: 0.9em, below: 0.4em)\n");
            out.push_str("#show heading.where(level: 2): set text(size: 1.125em)\n");
            out.push_str("#show heading.where(level: 3): set text(size: 1em)\n");
        }
    }

    out.push('\n');
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn emit_block(block: &Block, out: &mut String) {
    match block {
        Block::Heading { level, content } => {
            for _ in 0..*level {
                out.push('=');
            }
            out.push(' ');
            spans_to_typst(content, false, out);
            out.push_str("\n\n");
        }
        Block::Paragraph { content } => {
            spans_to_typst(content, true, out);
            out.push_str("\n\n");
        }
        Block::List { items } => {
            // Keep small lists together, allow breaks in large ones
            if items.len() <= 5 {
                out.push_str("#block(breakable: false)[\n");
                list_to_typst(items, out);
                out.push_str("]\n\n");
            } else {
                list_to_typst(items, out);
                out.push('\n');
            }
        }
        Block::Table { headers, rows } => {
            out.push_str("#block(breakable: false)[\n");
            table_to_typst(headers, rows, out);
            out.push_str("]\n\n");
        }
    }
}

fn spans_to_typst(spans: &[Span], line_start: bool, out: &mut String) {
    let mut line_start = line_start;
    for span in spans {
        match span {
            Span::Text(text) => escape_text(text, line_start, out),
            Span::Bold(text) => {
                out.push('*');
                escape_text(text, false, out);
                out.push('*');
            }
        }
        line_start = line_start && span.text().trim().is_empty();
    }
}

/// Escape Typst markup characters. At the start of a line, list, heading and
/// enumeration markers are escaped too.
fn escape_text(text: &str, line_start: bool, out: &mut String) {
    let mut line_start = line_start;
    let mut leading_digits = false;

    for ch in text.chars() {
        let special = matches!(
            ch,
            '#' | '*' | '_' | '@' | '$' | '\\' | '`' | '<' | '>' | '[' | ']' | '/' | '~'
        );
        let marker = line_start && matches!(ch, '=' | '-' | '+');
        let enumeration = leading_digits && ch == '.';
        if special || marker || enumeration {
            out.push('\\');
        }
        out.push(ch);

        leading_digits = (line_start || leading_digits) && ch.is_ascii_digit();
        line_start = line_start && ch.is_whitespace();
    }
}

fn list_to_typst(items: &[Vec<Span>], out: &mut String) {
    for item in items {
        out.push_str("- ");
        spans_to_typst(item, true, out);
        out.push('\n');
    }
}

fn table_to_typst(headers: &[Vec<Span>], rows: &[Vec<Vec<Span>>], out: &mut String) {
    let col_count = headers.len();
    if col_count == 0 {
        return;
    }

    out.push_str("#table(\n");
    out.push_str(&format!("  columns: {},\n", col_count));

    // Header cells (bold)
    for cell in headers {
        if cell.is_empty() {
            out.push_str("  [],\n");
            continue;
        }
        // Already strong, so bold spans inside are plain text
        out.push_str("  [*");
        for span in cell {
            escape_text(span.text(), false, out);
        }
        out.push_str("*],\n");
    }

    for row in rows {
        for cell in row {
            out.push_str("  [");
            spans_to_typst(cell, true, out);
            out.push_str("],\n");
        }
    }

    out.push_str(")\n");
}

/// Typst equation markup for an equation part. `None` for prose and for
/// LaTeX outside the supported subset.
pub fn equation_math(part: &EquationPart) -> Option<String> {
    let (latex, display) = match part {
        EquationPart::Text(_) => return None,
        EquationPart::Inline(eq) => (eq, false),
        EquationPart::Display(eq) => (eq, true),
    };
    match latex::to_typst(latex) {
        Ok(math) if display => Some(format!("$ {math} $")),
        Ok(math) => Some(format!("${math}$")),
        Err(e) => {
            debug!(error = %e, source = %latex, "equation left as source");
            None
        }
    }
}

/// Convert equation-bearing text to Typst markup.
///
/// Equations the LaTeX converter cannot handle are written out as their
/// escaped delimited source.
pub fn equation_to_typst(parts: &[EquationPart], config: &Config) -> String {
    equation_document(parts, config, equation_math)
}

/// Like [`equation_to_typst`], with `math` deciding the markup of each
/// equation. `None` shows the equation's source.
pub(crate) fn equation_document(
    parts: &[EquationPart],
    config: &Config,
    mut math: impl FnMut(&EquationPart) -> Option<String>,
) -> String {
    let mut out = String::new();
    emit_preamble(Variant::Full, config, &mut out);

    let mut line_start = true;
    for part in parts {
        match part {
            EquationPart::Text(text) => {
                for (i, line) in text.split('\n').enumerate() {
                    if i > 0 {
                        out.push_str(" \\\n");
                        line_start = true;
                    }
                    escape_text(line, line_start, &mut out);
                    line_start = line_start && line.trim().is_empty();
                }
            }
            equation => {
                match math(equation) {
                    Some(markup) => out.push_str(&markup),
                    None => escape_text(&equation.source(), line_start, &mut out),
                }
                line_start = false;
            }
        }
    }

    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::TextSize;
    use crate::config::{Config, Direction};
    use crate::{equation, markdown_to_typst};

    const PREAMBLE: &str = "#set par(linebreaks: \"optimized\")\n\
#set text(size: 11pt, dir: ltr)\n\
#set par(leading: 0.8em)\n\
#show heading: set block(above: 1.6em, below: 0.9em)\n\
#show heading.where(level: 2): set text(size: 1.5em)\n\
#show heading.where(level: 3): set text(size: 1.25em)\n\n";

    fn full(markdown: &str) -> String {
        markdown_to_typst(markdown, Variant::Full, &Config::default())
    }

    #[test]
    fn heading() {
        assert_eq!(
            full("## Hello"),
            format!("{PREAMBLE}#block(breakable: false)[\n== Hello\n\n]\n\n")
        );
    }

    #[test]
    fn heading_with_following_content() {
        let result = full("### Title\n\nSome text.");
        assert!(result.contains("#block(breakable: false)[\n=== Title\n\nSome text.\n\n]\n\n"));
    }

    #[test]
    fn paragraph() {
        assert_eq!(full("Hello world"), format!("{PREAMBLE}Hello world\n\n"));
    }

    #[test]
    fn bold() {
        assert_eq!(full("**bold**"), format!("{PREAMBLE}*bold*\n\n"));
    }

    #[test]
    fn unordered_list() {
        assert_eq!(
            full("* one\n* two"),
            format!("{PREAMBLE}#block(breakable: false)[\n- one\n- two\n]\n\n")
        );
    }

    #[test]
    fn long_list_is_breakable() {
        let md = (1..=6).map(|n| format!("* item {n}")).collect::<Vec<_>>().join("\n");
        let result = full(&md);
        assert!(!result.contains("#block"));
        assert!(result.ends_with("- item 6\n\n"));
    }

    #[test]
    fn escapes_special_chars() {
        assert_eq!(full("a * b"), format!("{PREAMBLE}a \\* b\n\n"));
        assert_eq!(full("a # b"), format!("{PREAMBLE}a \\# b\n\n"));
        assert_eq!(full("a_b"), format!("{PREAMBLE}a\\_b\n\n"));
        assert_eq!(full("see http://x"), format!("{PREAMBLE}see http:\\/\\/x\n\n"));
    }

    #[test]
    fn escapes_line_start_markers() {
        assert_eq!(full("- not a list"), format!("{PREAMBLE}\\- not a list\n\n"));
        assert_eq!(full("= not a heading"), format!("{PREAMBLE}\\= not a heading\n\n"));
        assert_eq!(full("12. not numbered"), format!("{PREAMBLE}12\\. not numbered\n\n"));
        assert_eq!(full("a - b = c"), format!("{PREAMBLE}a - b = c\n\n"));
    }

    #[test]
    fn table() {
        let md = "| A | B |\n|---|---|\n| 1 | 2 |";
        let expected = format!(
            "{PREAMBLE}#block(breakable: false)[\n#table(\n  columns: 2,\n  [*A*],\n  [*B*],\n  [1],\n  [2],\n)\n]\n\n"
        );
        assert_eq!(full(md), expected);
    }

    #[test]
    fn empty_header_cell() {
        let result = full("| | B |\n| 1 | 2 |");
        assert!(result.contains("  columns: 2,\n  [],\n  [*B*],\n  [1],\n  [2],\n"));
    }

    #[test]
    fn compact_preamble() {
        let result =
            markdown_to_typst("text", Variant::Compact(TextSize::Small), &Config::default());
        assert!(result.contains("#set text(size: (11pt) * 0.875, dir: ltr)\n"));
        assert!(result.contains("#set block(spacing: 0.6em)\n"));
        assert!(result.ends_with("text\n\n"));
    }

    #[test]
    fn document_settings() {
        let mut config = Config::default();
        config.page.numbers = true;
        config.font.family = Some("Libertinus Serif".to_string());
        config.text.lang = Some("ar".to_string());
        config.text.dir = Direction::Rtl;
        let result = markdown_to_typst("x", Variant::Full, &config);
        assert!(result.contains("#set page(numbering: \"1\")\n"));
        assert!(result.contains(
            "#set text(size: 11pt, font: \"Libertinus Serif\", lang: \"ar\", dir: rtl)\n"
        ));
    }

    #[test]
    fn bold_header_cell_stays_bold() {
        let result = full("| **A** | B |\n|---|---|\n| **1** | 2 |");
        assert!(result.contains("  [*A*],\n  [*B*],\n  [*1*],\n  [2],\n"));
    }

    #[test]
    fn equations() {
        let parts = equation::split("Speed is $v=d/t$ meters.\n$$ E = mc^2 $$");
        let result = equation_to_typst(&parts, &Config::default());
        assert!(result.ends_with("Speed is $v=d\\/t$ meters. \\\n$ E = m c^(2) $\n"));
    }

    #[test]
    fn latex_equations() {
        let parts = equation::split("$\\frac{1}{2}$, $x^{2} + \\sqrt{y}$ and $\\alpha + \\beta$");
        let result = equation_to_typst(&parts, &Config::default());
        assert!(result.ends_with("$frac(1, 2)$, $x^(2) + sqrt(y)$ and $alpha + beta$\n"));
    }

    #[test]
    fn unsupported_latex_is_source() {
        let parts = equation::split("Speed is $\\foo{v}$.");
        let result = equation_to_typst(&parts, &Config::default());
        assert!(result.ends_with("Speed is \\$\\\\foo{v}\\$.\n"));
    }

    #[test]
    fn rejected_equation_is_source() {
        let parts = equation::split("$a$ and $b$");
        let result = equation_document(&parts, &Config::default(), |part| match part {
            EquationPart::Inline(eq) if eq == "a" => None,
            part => equation_math(part),
        });
        assert!(result.ends_with("\\$a\\$ and $b$\n"));
    }
}
