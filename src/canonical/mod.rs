//! Format canonicalization: every accepted upload becomes a document the extraction service
//! can read natively.
//!
//! PDF and legacy Word uploads pass through untouched. OOXML word-processing documents are
//! reduced to their body paragraphs and re-rendered as a PDF through [`crate::layout`].

mod docx;
mod format;
mod pdf;

pub use format::{DocumentFormat, UploadedDocument};
pub use pdf::{PdfLayout, RenderedPdf, render_paragraphs_pdf};

use thiserror::Error;

/// Errors raised while converting an upload into the canonical format.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// Upload is not a readable OOXML package.
    #[error("document is not a valid Word package: {0}")]
    Archive(String),
    /// Package does not contain the main document part.
    #[error("document package is missing '{0}'")]
    MissingPart(&'static str),
    /// Main document part is not well-formed XML.
    #[error("failed to parse document XML: {0}")]
    Xml(String),
    /// PDF generation failed.
    #[error("failed to render PDF: {0}")]
    Render(String),
}

/// How a canonical document was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalOrigin {
    /// Upload bytes were forwarded unchanged.
    Passthrough,
    /// Upload was re-rendered as a PDF.
    Converted {
        /// Number of non-empty paragraphs rendered.
        paragraphs: usize,
        /// Number of pages in the rendered PDF.
        pages: usize,
    },
}

/// A document in a format the extraction service accepts.
#[derive(Debug, Clone)]
pub struct CanonicalDocument {
    content: Vec<u8>,
    format: DocumentFormat,
    origin: CanonicalOrigin,
}

impl CanonicalDocument {
    /// Raw document bytes.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Consume the document and return its bytes.
    pub fn into_content(self) -> Vec<u8> {
        self.content
    }

    /// Format of the canonical bytes.
    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    /// Whether the document was forwarded or converted.
    pub fn origin(&self) -> CanonicalOrigin {
        self.origin
    }
}

/// Converts uploads into [`CanonicalDocument`]s.
#[derive(Debug, Clone, Default)]
pub struct Canonicalizer {
    layout: PdfLayout,
}

impl Canonicalizer {
    /// Build a canonicalizer that renders converted documents with `layout`.
    pub fn new(layout: PdfLayout) -> Self {
        Self { layout }
    }

    /// Produce the canonical form of `upload`.
    pub fn canonicalize(
        &self,
        upload: &UploadedDocument,
    ) -> Result<CanonicalDocument, ConversionError> {
        let format = upload.format();
        if format.is_natively_extractable() {
            tracing::debug!(?format, bytes = upload.content().len(), "Forwarding upload unchanged");
            return Ok(CanonicalDocument {
                content: upload.content().to_vec(),
                format,
                origin: CanonicalOrigin::Passthrough,
            });
        }

        // Only OOXML reaches this point.
        let paragraphs = docx::read_paragraphs(upload.content())?;
        let rendered = render_paragraphs_pdf(upload.filename(), &paragraphs, &self.layout)?;
        tracing::debug!(
            source_paragraphs = paragraphs.len(),
            rendered_paragraphs = rendered.paragraphs,
            pages = rendered.pages,
            "Converted Word document to PDF"
        );
        Ok(CanonicalDocument {
            content: rendered.bytes,
            format: DocumentFormat::Pdf,
            origin: CanonicalOrigin::Converted {
                paragraphs: rendered.paragraphs,
                pages: rendered.pages,
            },
        })
    }
}

#[cfg(test)]
pub(crate) use docx::tests::docx_fixture;
