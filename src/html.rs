use crate::block::{Block, Span, TextSize, Variant};
use crate::config::Config;
use crate::equation::EquationPart;

/// Class names applied to each block type.
struct Classes {
    h2: &'static str,
    h3: &'static str,
    list: &'static str,
    paragraph: &'static str,
}

static FULL: Classes = Classes {
    h2: "sm-h2",
    h3: "sm-h3",
    list: "sm-list",
    paragraph: "sm-p",
};

static CHAT: Classes = Classes {
    h2: "sm-chat-h2",
    h3: "sm-chat-h3",
    list: "sm-chat-list",
    paragraph: "sm-chat-p",
};

static CHAT_SMALL: Classes = Classes {
    h2: "sm-chat-h2 sm-small",
    h3: "sm-chat-h3 sm-small",
    list: "sm-chat-list",
    paragraph: "sm-chat-p sm-small",
};

fn classes(variant: Variant) -> &'static Classes {
    match variant {
        Variant::Full => &FULL,
        Variant::Compact(TextSize::Normal) => &CHAT,
        Variant::Compact(TextSize::Small) => &CHAT_SMALL,
    }
}

/// Stylesheet for the class names emitted by this module.
pub const STYLESHEET: &str = "\
.sm-h2 { font-size: 1.5rem; font-weight: 700; margin: 1.5rem 0 0.75rem; padding-bottom: 0.5rem; border-bottom: 2px solid #99f6e4; }
.sm-h3 { font-size: 1.25rem; font-weight: 600; margin: 1rem 0 0.5rem; }
.sm-list { list-style: disc inside; margin: 1rem 0; padding-inline-start: 1.25rem; }
.sm-list li + li { margin-top: 0.25rem; }
.sm-p { margin: 1rem 0; line-height: 1.625; color: #374151; }
.sm-table-wrap { overflow-x: auto; margin: 1.5rem 0; border: 1px solid #e5e7eb; border-radius: 0.5rem; }
.sm-table { min-width: 100%; border-collapse: collapse; }
.sm-table thead { background: #f9fafb; }
.sm-table th { padding: 0.75rem 1.5rem; font-size: 0.75rem; font-weight: 500; color: #6b7280; text-transform: uppercase; letter-spacing: 0.05em; text-align: start; }
.sm-table td { padding: 1rem 1.5rem; font-size: 0.875rem; color: #374151; }
.sm-table tr + tr, .sm-table tbody tr { border-top: 1px solid #e5e7eb; }
.sm-chat-h2 { font-size: 1.125rem; font-weight: 700; margin: 0.75rem 0 0.25rem; }
.sm-chat-h3 { font-size: 1rem; font-weight: 600; margin: 0.5rem 0 0.25rem; }
.sm-chat-h2.sm-small { font-size: 1rem; }
.sm-chat-h3.sm-small { font-size: 0.875rem; }
.sm-chat-list { list-style: disc inside; margin: 0.5rem 0; padding-inline-start: 1rem; }
.sm-chat-list li + li { margin-top: 0.25rem; }
.sm-chat-p { margin: 0.25rem 0; }
.sm-chat-p.sm-small { font-size: 0.875rem; }
.sm-math-display { margin: 0.75rem 0; text-align: center; }
";

/// Convert blocks to an HTML fragment.
pub fn blocks_to_html(blocks: &[Block], variant: Variant) -> String {
    let classes = classes(variant);
    let mut out = String::new();

    for block in blocks {
        match block {
            Block::Heading { level, content } => {
                let (tag, class) = if *level <= 2 {
                    ("h2", classes.h2)
                } else {
                    ("h3", classes.h3)
                };
                open(tag, class, &mut out);
                spans_to_html(content, &mut out);
                close(tag, &mut out);
            }
            Block::Paragraph { content } => {
                open("p", classes.paragraph, &mut out);
                spans_to_html(content, &mut out);
                close("p", &mut out);
            }
            Block::List { items } => {
                open("ul", classes.list, &mut out);
                out.push('\n');
                for item in items {
                    out.push_str("<li>");
                    spans_to_html(item, &mut out);
                    out.push_str("</li>\n");
                }
                close("ul", &mut out);
            }
            Block::Table { headers, rows } => table_to_html(headers, rows, &mut out),
        }
    }

    out
}

fn open(tag: &str, class: &str, out: &mut String) {
    out.push('<');
    out.push_str(tag);
    out.push_str(" class=\"");
    out.push_str(class);
    out.push_str("\">");
}

fn close(tag: &str, out: &mut String) {
    out.push_str("</");
    out.push_str(tag);
    out.push_str(">\n");
}

fn table_to_html(headers: &[Vec<Span>], rows: &[Vec<Vec<Span>>], out: &mut String) {
    out.push_str("<div class=\"sm-table-wrap\">\n<table class=\"sm-table\">\n<thead>\n<tr>");
    for cell in headers {
        out.push_str("<th>");
        spans_to_html(cell, out);
        out.push_str("</th>");
    }
    out.push_str("</tr>\n</thead>\n<tbody>\n");
    for row in rows {
        out.push_str("<tr>");
        for cell in row {
            out.push_str("<td>");
            spans_to_html(cell, out);
            out.push_str("</td>");
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</tbody>\n</table>\n</div>\n");
}

fn spans_to_html(spans: &[Span], out: &mut String) {
    for span in spans {
        match span {
            Span::Text(text) => escape(text, out),
            Span::Bold(text) => {
                out.push_str("<strong>");
                escape(text, out);
                out.push_str("</strong>");
            }
        }
    }
}

/// Convert equation-bearing text to HTML.
///
/// Equations are emitted as `\(...\)` and `\[...\]` for a client-side math
/// typesetter; line breaks in prose become `<br>`.
pub fn equation_to_html(parts: &[EquationPart]) -> String {
    let mut out = String::new();

    for part in parts {
        match part {
            EquationPart::Text(text) => {
                for (i, line) in text.split('\n').enumerate() {
                    if i > 0 {
                        out.push_str("<br>\n");
                    }
                    escape(line, &mut out);
                }
            }
            EquationPart::Inline(eq) => {
                out.push_str("<span class=\"sm-math\">\\(");
                escape(eq, &mut out);
                out.push_str("\\)</span>");
            }
            EquationPart::Display(eq) => {
                out.push_str("<div class=\"sm-math-display\" dir=\"ltr\">\\[");
                escape(eq, &mut out);
                out.push_str("\\]</div>");
            }
        }
    }

    out
}

/// Wrap a fragment in a complete HTML document with the stylesheet.
pub fn standalone_html(body: &str, config: &Config) -> String {
    let mut out = String::from("<!DOCTYPE html>\n<html");
    if let Some(lang) = &config.text.lang {
        out.push_str(" lang=\"");
        escape(lang, &mut out);
        out.push('"');
    }
    out.push_str(" dir=\"");
    out.push_str(config.text.dir.as_str());
    out.push_str("\">\n<head>\n<meta charset=\"utf-8\">\n<style>\n");
    out.push_str(STYLESHEET);
    out.push_str("</style>\n</head>\n<body>\n");
    out.push_str(body);
    out.push_str("</body>\n</html>\n");
    out
}

fn escape(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Direction;
    use crate::{equation, markdown_to_html};

    #[test]
    fn heading() {
        assert_eq!(
            markdown_to_html("## Hello", Variant::Full),
            "<h2 class=\"sm-h2\">Hello</h2>\n"
        );
    }

    #[test]
    fn bold_inside_paragraph() {
        assert_eq!(
            markdown_to_html("a **b** c", Variant::Full),
            "<p class=\"sm-p\">a <strong>b</strong> c</p>\n"
        );
    }

    #[test]
    fn list() {
        assert_eq!(
            markdown_to_html("* one\n* two", Variant::Full),
            "<ul class=\"sm-list\">\n<li>one</li>\n<li>two</li>\n</ul>\n"
        );
    }

    #[test]
    fn table() {
        let html = markdown_to_html("| A | B |\n|---|---|\n| 1 | 2 |", Variant::Full);
        assert_eq!(
            html,
            "<div class=\"sm-table-wrap\">\n<table class=\"sm-table\">\n<thead>\n<tr><th>A</th><th>B</th></tr>\n</thead>\n<tbody>\n<tr><td>1</td><td>2</td></tr>\n</tbody>\n</table>\n</div>\n"
        );
    }

    #[test]
    fn compact_sizes() {
        assert_eq!(
            markdown_to_html("### Sub\ntext", Variant::Compact(TextSize::Normal)),
            "<h3 class=\"sm-chat-h3\">Sub</h3>\n<p class=\"sm-chat-p\">text</p>\n"
        );
        assert_eq!(
            markdown_to_html("### Sub\ntext", Variant::Compact(TextSize::Small)),
            "<h3 class=\"sm-chat-h3 sm-small\">Sub</h3>\n<p class=\"sm-chat-p sm-small\">text</p>\n"
        );
    }

    #[test]
    fn compact_table_is_paragraph_text() {
        assert_eq!(
            markdown_to_html("| A |", Variant::Compact(TextSize::Normal)),
            "<p class=\"sm-chat-p\">| A |</p>\n"
        );
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            markdown_to_html("<script>\"x\" & 'y'</script>", Variant::Full),
            "<p class=\"sm-p\">&lt;script&gt;&quot;x&quot; &amp; &#39;y&#39;&lt;/script&gt;</p>\n"
        );
    }

    #[test]
    fn equations() {
        let parts = equation::split("a < b\n$x$ and $$y$$");
        assert_eq!(
            equation_to_html(&parts),
            "a &lt; b<br>\n<span class=\"sm-math\">\\(x\\)</span> and <div class=\"sm-math-display\" dir=\"ltr\">\\[y\\]</div>"
        );
    }

    #[test]
    fn standalone_document_attributes() {
        let mut config = Config::default();
        config.text.lang = Some("ar".to_string());
        config.text.dir = Direction::Rtl;
        let html = standalone_html("<p>x</p>\n", &config);
        assert!(html.starts_with("<!DOCTYPE html>\n<html lang=\"ar\" dir=\"rtl\">"));
        assert!(html.contains(STYLESHEET));
        assert!(html.ends_with("<body>\n<p>x</p>\n</body>\n</html>\n"));
    }
}
