//! Text extraction from stored documents.
//!
//! The pipeline hands a [`StoredObjectReference`] to a [`DocumentExtractor`] and receives the
//! document's text as pages of lines in reading order.

mod form_recognizer;

pub use form_recognizer::{FormRecognizerClient, PollSettings};

use crate::storage::StoredObjectReference;
use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;
use time::OffsetDateTime;

/// Errors surfaced while extracting text from a stored document.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The read locator lapsed before extraction could start.
    #[error("Document locator for '{name}' expired at {expired_at}")]
    LocatorExpired {
        /// Stored object name.
        name: String,
        /// Expiry instant carried by the locator.
        expired_at: OffsetDateTime,
    },
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Analysis service responded with an unexpected status code.
    #[error("Unexpected analysis response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the service.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// The service reported the analysis operation as failed.
    #[error("Document analysis failed: {0}")]
    AnalysisFailed(String),
    /// The operation was still running after the configured number of polls.
    #[error("Document analysis did not finish after {polls} polls")]
    PollBudgetExhausted {
        /// Polls issued before giving up.
        polls: u32,
    },
    /// Response payload could not be interpreted.
    #[error("Malformed analysis response: {0}")]
    InvalidResponse(String),
}

impl ExtractionError {
    /// Whether retrying the same extraction may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(error) => error.is_timeout() || error.is_connect(),
            Self::UnexpectedStatus { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::PollBudgetExhausted { .. } => true,
            Self::LocatorExpired { .. } | Self::AnalysisFailed(_) | Self::InvalidResponse(_) => {
                false
            }
        }
    }
}

/// One page of extracted text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPage {
    /// Lines in reading order.
    pub lines: Vec<String>,
}

/// Extracted document text, page-major.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedDocument {
    /// Pages in document order.
    pub pages: Vec<ExtractedPage>,
}

impl ExtractedDocument {
    /// Build a document from nested page/line lists.
    pub fn from_lines<P, L>(pages: P) -> Self
    where
        P: IntoIterator<Item = L>,
        L: IntoIterator,
        L::Item: Into<String>,
    {
        Self {
            pages: pages
                .into_iter()
                .map(|lines| ExtractedPage {
                    lines: lines.into_iter().map(Into::into).collect(),
                })
                .collect(),
        }
    }

    /// Total line count across all pages.
    pub fn line_count(&self) -> usize {
        self.pages.iter().map(|page| page.lines.len()).sum()
    }

    /// Flatten to text: every line followed by `\n`, page by page.
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        for line in self.pages.iter().flat_map(|page| &page.lines) {
            text.push_str(line);
            text.push('\n');
        }
        text
    }
}

/// Interface implemented by document-analysis providers.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    /// Extract text from the document readable at `source`.
    async fn extract(
        &self,
        source: &StoredObjectReference,
    ) -> Result<ExtractedDocument, ExtractionError>;
}
