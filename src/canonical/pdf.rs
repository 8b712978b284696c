//! PDF rendering for wrapped, paginated text.

use std::io::BufWriter;

use printpdf::{BuiltinFont, Mm, PdfDocument};

use super::ConversionError;
use crate::layout::{Page, PageGeometry, Paginator, wrap_text};

/// Page and typography settings for rendered PDFs, in PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfLayout {
    /// Vertical geometry driving pagination.
    pub geometry: PageGeometry,
    /// Page width.
    pub page_width: f32,
    /// Horizontal start of every line.
    pub margin_left: f32,
    /// Maximum characters per wrapped line.
    pub wrap_width: usize,
    /// Font size used for body text.
    pub font_size: f32,
}

impl PdfLayout {
    /// US Letter, one-inch margins, 90 columns of 12pt Helvetica on a 14pt line step.
    pub const LETTER: Self = Self {
        geometry: PageGeometry::LETTER,
        page_width: 612.0,
        margin_left: 72.0,
        wrap_width: 90,
        font_size: 12.0,
    };
}

impl Default for PdfLayout {
    fn default() -> Self {
        Self::LETTER
    }
}

/// A rendered PDF together with layout counters.
#[derive(Debug, Clone)]
pub struct RenderedPdf {
    /// Serialized PDF bytes.
    pub bytes: Vec<u8>,
    /// Non-empty paragraphs that were laid out.
    pub paragraphs: usize,
    /// Pages containing text.
    pub pages: usize,
}

/// Render paragraphs as a PDF.
///
/// Each paragraph is trimmed; empty ones are skipped. The rest are wrapped to
/// `layout.wrap_width` and fed through one running [`Paginator`], so paragraphs flow across
/// page boundaries without rebalancing. A document with no text still yields one blank page.
pub fn render_paragraphs_pdf<S: AsRef<str>>(
    title: &str,
    paragraphs: &[S],
    layout: &PdfLayout,
) -> Result<RenderedPdf, ConversionError> {
    let mut paginator = Paginator::new(layout.geometry);
    let mut rendered = 0usize;
    for paragraph in paragraphs {
        let text = paragraph.as_ref().trim();
        if text.is_empty() {
            continue;
        }
        paginator.push_lines(wrap_text(text, layout.wrap_width));
        rendered += 1;
    }

    let pages = paginator.finish();
    let bytes = write_pdf(title, &pages, layout)?;
    Ok(RenderedPdf {
        bytes,
        paragraphs: rendered,
        pages: pages.len(),
    })
}

fn write_pdf(title: &str, pages: &[Page], layout: &PdfLayout) -> Result<Vec<u8>, ConversionError> {
    let width = points(layout.page_width);
    let height = points(layout.geometry.page_height());
    let (doc, first_page, first_layer) = PdfDocument::new(title, width, height, "Layer 1");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|error| ConversionError::Render(format!("font: {error}")))?;

    for (index, page) in pages.iter().enumerate() {
        let (page_index, layer_index) = if index == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(width, height, format!("Layer {}", index + 1))
        };
        let layer = doc.get_page(page_index).get_layer(layer_index);
        for line in &page.lines {
            // PDF coordinates grow upwards from the bottom edge.
            let baseline = layout.geometry.page_height() - line.offset;
            layer.use_text(
                line.text.as_str(),
                layout.font_size,
                points(layout.margin_left),
                points(baseline),
                &font,
            );
        }
    }

    let mut buffer = BufWriter::new(Vec::new());
    doc.save(&mut buffer)
        .map_err(|error| ConversionError::Render(format!("save: {error}")))?;
    buffer
        .into_inner()
        .map_err(|error| ConversionError::Render(format!("flush: {error}")))
}

fn points(value: f32) -> Mm {
    Mm(value * 25.4 / 72.0)
}
