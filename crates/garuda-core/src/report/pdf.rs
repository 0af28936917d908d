//! PDF backend: US Letter pages, builtin Helvetica, greedy word wrap.

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};

use super::{ReportElement, ReportError, ReportLayout};

const PAGE_WIDTH: f32 = 215.9;
const PAGE_HEIGHT: f32 = 279.4;
const MARGIN: f32 = 25.4;
const PT_TO_MM: f32 = 0.3528;
const LINE_SPACING: f32 = 1.25;
/// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.5;
const BULLET_INDENT: f32 = 6.0;

struct TextStyle {
    size: f32,
    bold: bool,
    space_before: f32,
    space_after: f32,
    indent: f32,
}

fn style_for(element: &ReportElement) -> TextStyle {
    let (size, bold, space_before, space_after, indent) = match element {
        ReportElement::Title(_) => (22.0, true, 0.0, 3.0, 0.0),
        ReportElement::Subtitle(_) => (10.0, false, 0.0, 4.0, 0.0),
        ReportElement::Heading(_) => (15.0, true, 2.0, 2.0, 0.0),
        ReportElement::Subheading(_) => (12.0, true, 1.0, 2.0, 0.0),
        ReportElement::Paragraph(_) => (10.0, false, 1.0, 2.0, 0.0),
        ReportElement::GroupLabel(_) => (11.0, true, 2.0, 1.0, 0.0),
        ReportElement::Bullet(_) => (10.0, false, 0.0, 1.0, BULLET_INDENT),
        ReportElement::PageBreak => (0.0, false, 0.0, 0.0, 0.0),
    };
    TextStyle {
        size,
        bold,
        space_before,
        space_after,
        indent,
    }
}

/// Writes lines top-down, starting new pages on overflow.
struct PageCursor<'d> {
    doc: &'d PdfDocumentReference,
    layer: PdfLayerReference,
    y: f32,
    pages: usize,
}

impl<'d> PageCursor<'d> {
    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
        self.pages += 1;
    }

    fn advance(&mut self, mm: f32) {
        self.y -= mm;
    }

    fn line(&mut self, text: &str, style: &TextStyle, font: &IndirectFontRef) {
        let height = style.size * PT_TO_MM * LINE_SPACING;
        if self.y - height < MARGIN {
            self.new_page();
        }
        self.y -= height;
        self.layer
            .use_text(text, style.size, Mm(MARGIN + style.indent), Mm(self.y), font);
    }
}

/// Render a laid-out report to PDF bytes.
pub fn render_pdf(layout: &ReportLayout) -> Result<Vec<u8>, ReportError> {
    let (doc, page, layer) =
        PdfDocument::new(layout.title(), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ReportError::Pdf(e.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ReportError::Pdf(e.to_string()))?;

    let pages = {
        let mut cursor = PageCursor {
            doc: &doc,
            layer: doc.get_page(page).get_layer(layer),
            y: PAGE_HEIGHT - MARGIN,
            pages: 1,
        };

        for element in layout.elements() {
            if matches!(element, ReportElement::PageBreak) {
                cursor.new_page();
                continue;
            }

            let style = style_for(element);
            let font = if style.bold { &bold } else { &regular };
            let width = PAGE_WIDTH - 2.0 * MARGIN - style.indent;
            let text = match element {
                ReportElement::Bullet(item) => format!("- {}", item),
                other => other.text().to_string(),
            };

            cursor.advance(style.space_before);
            for line in wrap_text(&sanitize(&text), style.size, width) {
                cursor.line(&line, &style, font);
            }
            cursor.advance(style.space_after);
        }

        cursor.pages
    };

    tracing::debug!(pages, elements = layout.elements().len(), "Rendered PDF");
    doc.save_to_bytes()
        .map_err(|e| ReportError::Pdf(e.to_string()))
}

/// Map text onto what the builtin fonts can encode.
fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            '\u{2022}' => '-',
            '\t' => ' ',
            '\n' | '\r' => c,
            c if (' '..='~').contains(&c) => c,
            c if ('\u{A0}'..='\u{FF}').contains(&c) => c,
            _ => '?',
        })
        .collect()
}

/// Greedy word wrap using an average glyph width estimate.
///
/// Explicit newlines start new lines; words longer than a line are split.
fn wrap_text(text: &str, font_size: f32, width_mm: f32) -> Vec<String> {
    let glyph_mm = font_size * PT_TO_MM * AVG_GLYPH_WIDTH;
    let max_chars = ((width_mm / glyph_mm).floor() as usize).max(1);

    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > max_chars {
                if !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                }
                let rest = word.split_off(max_chars);
                lines.push(word.into_iter().collect());
                word = rest;
            }

            let line_len = line.chars().count();
            let needed = if line.is_empty() { word.len() } else { line_len + 1 + word.len() };
            if needed > max_chars && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.extend(word);
        }
        lines.push(line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
