use std::path::Path;

/// Upload formats accepted by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    /// Portable Document Format, the canonical format.
    Pdf,
    /// Legacy binary Word document.
    Doc,
    /// Office Open XML word-processing document.
    Docx,
}

impl DocumentFormat {
    /// Infer the format from a filename suffix, ignoring case. No content sniffing is done.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let extension = Path::new(filename).extension()?.to_str()?;
        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "doc" => Some(Self::Doc),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }

    /// Lowercase file extension without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Doc => "doc",
            Self::Docx => "docx",
        }
    }

    /// MIME type used when the document is stored.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Doc => "application/msword",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }

    /// Whether the extraction service reads this format without conversion.
    pub fn is_natively_extractable(self) -> bool {
        matches!(self, Self::Pdf | Self::Doc)
    }
}

/// A validated upload: sanitized filename, inferred format, and raw bytes.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    filename: String,
    format: DocumentFormat,
    content: Vec<u8>,
}

impl UploadedDocument {
    /// Bundle an upload whose format has already been determined.
    pub fn new(filename: impl Into<String>, format: DocumentFormat, content: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            format,
            content,
        }
    }

    /// Sanitized filename supplied by the client.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Format inferred from the filename.
    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    /// Raw upload bytes.
    pub fn content(&self) -> &[u8] {
        &self.content
    }
}
