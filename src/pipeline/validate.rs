use crate::canonical::{DocumentFormat, UploadedDocument};

use super::types::PipelineError;

const NO_FILE: &str = "No valid file uploaded";
const UNSUPPORTED: &str = "Unsupported file type";
const MAX_FILENAME_CHARS: usize = 255;

/// Accept an upload when it carries a usable filename with an allowed extension.
///
/// The filename is sanitized before its suffix is inspected; the content is never sniffed.
pub fn validate_upload(
    filename: Option<&str>,
    content: Vec<u8>,
) -> Result<UploadedDocument, PipelineError> {
    let raw = filename
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| PipelineError::InvalidInput(NO_FILE.into()))?;

    let filename = sanitize_filename(raw);
    if filename.is_empty() {
        return Err(PipelineError::InvalidInput(NO_FILE.into()));
    }

    let format = DocumentFormat::from_filename(&filename)
        .ok_or_else(|| PipelineError::InvalidInput(UNSUPPORTED.into()))?;
    Ok(UploadedDocument::new(filename, format, content))
}

/// Reduce a client-supplied name to a safe single path component.
///
/// Directory parts are dropped, characters outside `[alnum . - _]` become `_`, dot runs that
/// could climb directories are removed, and leading dots are stripped.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter(|c| *c != '\0')
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let mut cleaned = cleaned;
    while cleaned.contains("..") {
        cleaned = cleaned.replace("..", ".");
    }
    cleaned
        .trim_start_matches(['.', '_'])
        .chars()
        .take(MAX_FILENAME_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_allowed_extensions_in_any_case() {
        let upload = validate_upload(Some("Lease Agreement.PDF"), b"%PDF".to_vec()).expect("pdf");
        assert_eq!(upload.format(), DocumentFormat::Pdf);
        assert_eq!(upload.filename(), "Lease_Agreement.PDF");

        let upload = validate_upload(Some("nda.docx"), Vec::new()).expect("docx");
        assert_eq!(upload.format(), DocumentFormat::Docx);
    }

    #[test]
    fn missing_or_blank_filename_is_rejected() {
        for name in [None, Some(""), Some("   ")] {
            let error = validate_upload(name, Vec::new()).expect_err("no file");
            assert!(matches!(&error, PipelineError::InvalidInput(message) if message == NO_FILE));
        }
    }

    #[test]
    fn disallowed_extension_is_rejected() {
        for name in ["notes.txt", "contract", "archive.pdf.zip"] {
            let error = validate_upload(Some(name), Vec::new()).expect_err("unsupported");
            assert!(
                matches!(&error, PipelineError::InvalidInput(message) if message == UNSUPPORTED),
                "{name}"
            );
        }
    }

    #[test]
    fn sanitizing_strips_directories_and_traversal() {
        assert_eq!(sanitize_filename("../../etc/passwd.pdf"), "passwd.pdf");
        assert_eq!(sanitize_filename(r"C:\Users\me\deal.docx"), "deal.docx");
        assert_eq!(sanitize_filename(".hidden..pdf"), "hidden.pdf");
        assert_eq!(sanitize_filename("contrat été.pdf"), "contrat_été.pdf");
    }

    #[test]
    fn name_that_sanitizes_to_nothing_counts_as_missing() {
        let error = validate_upload(Some("/"), Vec::new()).expect_err("empty");
        assert!(matches!(&error, PipelineError::InvalidInput(message) if message == NO_FILE));
    }
}
