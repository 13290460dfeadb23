pub mod assistant;
mod block;
mod config;
pub mod equation;
mod error;
pub mod generator;
mod html;
mod inline;
pub mod latex;
mod parser;
pub mod records;
mod typst;

pub use assistant::StudyAssistant;
pub use block::{Block, BlockKind, Span, TextSize, Variant, blocks_to_text, spans_text};
pub use config::{
    Config, Direction, FontConfig, GeneratorConfig, PageConfig, RenderConfig, TextConfig,
    VariantName,
};
pub use equation::EquationPart;
pub use error::Error;
pub use html::{STYLESHEET, blocks_to_html, equation_to_html, standalone_html};
pub use inline::parse_inline;
pub use typst::{blocks_to_typst, equation_math, equation_to_typst};

use std::collections::HashMap;

use tracing::{debug, warn};
use typst_as_lib::TypstEngine;
use typst_as_lib::typst_kit_options::TypstKitFontOptions;
use typst_library::layout::PagedDocument;
use typst_pdf::PdfOptions;

/// Parse Markdown-subset text into a vector of blocks.
pub fn parse(markdown: &str, variant: Variant) -> Vec<Block> {
    let blocks = parser::parse(markdown, variant);
    debug!(?variant, blocks = blocks.len(), "parsed markdown");
    blocks
}

/// Convert Markdown-subset text to an HTML fragment.
pub fn markdown_to_html(markdown: &str, variant: Variant) -> String {
    blocks_to_html(&parse(markdown, variant), variant)
}

/// Convert Markdown-subset text to Typst markup.
pub fn markdown_to_typst(markdown: &str, variant: Variant, config: &Config) -> String {
    blocks_to_typst(&parse(markdown, variant), variant, config)
}

/// Convert Markdown-subset text to PDF bytes.
pub fn markdown_to_pdf(
    markdown: &str,
    variant: Variant,
    config: &Config,
) -> Result<Vec<u8>, Error> {
    let doc = compile_document(markdown_to_typst(markdown, variant, config))?;
    export_pdf(&doc)
}

/// Convert Markdown-subset text to SVG pages.
pub fn markdown_to_svg(
    markdown: &str,
    variant: Variant,
    config: &Config,
) -> Result<SvgDocument, Error> {
    let doc = compile_document(markdown_to_typst(markdown, variant, config))?;
    Ok(export_svg(&doc))
}

/// Convert equation-bearing text to PDF bytes.
pub fn equation_to_pdf(text: &str, config: &Config) -> Result<Vec<u8>, Error> {
    let doc = compile_equations(&equation::split(text), config)?;
    export_pdf(&doc)
}

/// Convert equation-bearing text to SVG pages.
pub fn equation_to_svg(text: &str, config: &Config) -> Result<SvgDocument, Error> {
    let doc = compile_equations(&equation::split(text), config)?;
    Ok(export_svg(&doc))
}

/// Compile equation-bearing text. When the document does not compile, each
/// equation is typeset on its own and only the ones that fail are shown as
/// source.
fn compile_equations(parts: &[EquationPart], config: &Config) -> Result<PagedDocument, Error> {
    let error = match compile_document(equation_to_typst(parts, config)) {
        Ok(doc) => return Ok(doc),
        Err(e) => e,
    };

    let (content, rejected) = checked_equation_markup(parts, config);
    if rejected == 0 {
        return Err(error);
    }
    warn!(rejected, %error, "equation typesetting failed, rendering source text");
    compile_document(content)
}

/// Typst markup with every equation that fails to typeset alone replaced by
/// its source, plus the number of rejected equations.
fn checked_equation_markup(parts: &[EquationPart], config: &Config) -> (String, usize) {
    let mut typesets: HashMap<String, bool> = HashMap::new();
    let mut rejected = 0;

    let content = typst::equation_document(parts, config, |part| {
        let math = typst::equation_math(part)?;
        let ok = *typesets
            .entry(math.clone())
            .or_insert_with(|| compile_document(math.clone()).is_ok());
        if !ok {
            debug!(source = %part.source(), "equation does not typeset");
            rejected += 1;
        }
        ok.then_some(math)
    });

    (content, rejected)
}

/// Compile Typst markup to a paged document.
fn compile_document(typst_content: String) -> Result<PagedDocument, Error> {
    let font_options = TypstKitFontOptions::new()
        .include_embedded_fonts(true)
        .include_system_fonts(false);

    let engine = TypstEngine::builder()
        .main_file(typst_content)
        .search_fonts_with(font_options)
        .build();

    engine
        .compile()
        .output
        .map_err(|e| Error::Compile(format!("{:?}", e)))
}

fn export_pdf(doc: &PagedDocument) -> Result<Vec<u8>, Error> {
    typst_pdf::pdf(doc, &PdfOptions::default()).map_err(|e| Error::Export(format!("{:?}", e)))
}

/// Result of rendering to SVG pages.
pub struct SvgDocument {
    pub pages: Vec<String>,
    pub width_pt: f64,
    pub height_pt: f64,
}

fn export_svg(doc: &PagedDocument) -> SvgDocument {
    let pages: Vec<String> = doc.pages.iter().map(typst_svg::svg).collect();

    // Get dimensions from first page (assuming all pages same size)
    let (width_pt, height_pt) = if let Some(first_page) = doc.pages.first() {
        let size = first_page.frame.size();
        (size.x.to_pt(), size.y.to_pt())
    } else {
        (595.0, 842.0) // A4 default
    };

    SvgDocument {
        pages,
        width_pt,
        height_pt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_to_pdf_produces_pdf() {
        let bytes = markdown_to_pdf(
            "## Title\n\nSome **bold** text.\n\n* a\n* b\n\n| A | B |\n|---|---|\n| 1 | 2 |",
            Variant::Full,
            &Config::default(),
        )
        .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn markdown_to_svg_has_pages() {
        let doc = markdown_to_svg("hello", Variant::Compact(TextSize::Small), &Config::default())
            .unwrap();
        assert_eq!(doc.pages.len(), 1);
        assert!(doc.pages[0].contains("<svg"));
        assert!(doc.width_pt > 0.0);
    }

    #[test]
    fn equation_to_pdf_produces_pdf() {
        let bytes = equation_to_pdf("Speed is $v = d/t$ meters.", &Config::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn latex_equations_typeset() {
        let parts = equation::split("$\\frac{1}{2}$, $x^{2} + \\sqrt{y}$ and $\\alpha + \\beta$");
        assert!(compile_document(equation_to_typst(&parts, &Config::default())).is_ok());
    }

    #[test]
    fn only_failing_equation_is_source() {
        let parts = equation::split("$\\frac{1}{2}$ and $\\sqrt{}$");
        let (content, rejected) = checked_equation_markup(&parts, &Config::default());
        assert_eq!(rejected, 1);
        assert!(content.ends_with("$frac(1, 2)$ and \\$\\\\sqrt{}\\$\n"));

        let bytes = equation_to_pdf("$\\frac{1}{2}$ and $\\sqrt{}$", &Config::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn invalid_font_size_is_compile_error() {
        let mut config = Config::default();
        config.font.size = "eleven".to_string();
        assert!(matches!(
            markdown_to_pdf("x", Variant::Full, &config),
            Err(Error::Compile(_))
        ));
    }
}
