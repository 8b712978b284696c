//! Core data types and error definitions for the summarization pipeline.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::canonical::{ConversionError, PdfLayout};
use crate::extraction::ExtractionError;
use crate::storage::StoreError;
use crate::summarization::SummarizationClientError;

/// Unique identifier of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Uuid);

impl RunId {
    /// Allocate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

/// Linear lifecycle of a run. `Failed` is reachable from every non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    /// Upload received, not yet checked.
    Received,
    /// Filename and format accepted.
    Validated,
    /// Canonical document produced.
    Canonicalized,
    /// Canonical document stored; read locator issued.
    Stored,
    /// Text extracted.
    Extracted,
    /// Summary generated.
    Summarized,
    /// Summary artifacts written.
    Persisted,
    /// Run aborted.
    Failed,
}

impl RunStage {
    /// Stage following `self` on the success path.
    pub fn successor(self) -> Option<Self> {
        match self {
            Self::Received => Some(Self::Validated),
            Self::Validated => Some(Self::Canonicalized),
            Self::Canonicalized => Some(Self::Stored),
            Self::Stored => Some(Self::Extracted),
            Self::Extracted => Some(Self::Summarized),
            Self::Summarized => Some(Self::Persisted),
            Self::Persisted | Self::Failed => None,
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        self.successor().is_none()
    }

    /// Lowercase label used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Validated => "validated",
            Self::Canonicalized => "canonicalized",
            Self::Stored => "stored",
            Self::Extracted => "extracted",
            Self::Summarized => "summarized",
            Self::Persisted => "persisted",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse failure classes, used to choose the response and retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected upload; nothing was processed.
    InvalidInput,
    /// The upload could not be converted.
    Conversion,
    /// Storage, extraction, or summarization failed.
    ExternalService,
    /// Local scratch space could not be prepared.
    Internal,
}

/// Errors emitted by the pipeline, tagged by the stage that produced them.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing file, empty filename, or disallowed extension.
    #[error("{0}")]
    InvalidInput(String),
    /// Canonicalization failed.
    #[error("Failed to convert document: {0}")]
    Conversion(#[from] ConversionError),
    /// Upload to durable storage failed.
    #[error("Failed to store document: {0}")]
    Storage(#[from] StoreError),
    /// Text extraction failed.
    #[error("Failed to extract text: {0}")]
    Extraction(#[from] ExtractionError),
    /// Summary generation failed.
    #[error("Failed to summarize document: {0}")]
    Summarization(#[from] SummarizationClientError),
    /// Per-run scratch space could not be created or written.
    #[error("Failed to prepare run workspace: {0}")]
    Workspace(#[source] std::io::Error),
    /// The run exceeded its time bound.
    #[error("Processing timed out after {}s", after.as_secs())]
    TimedOut {
        /// Configured bound.
        after: Duration,
    },
}

impl PipelineError {
    /// Failure class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Conversion(_) => ErrorKind::Conversion,
            Self::Storage(_)
            | Self::Extraction(_)
            | Self::Summarization(_)
            | Self::TimedOut { .. } => ErrorKind::ExternalService,
            Self::Workspace(_) => ErrorKind::Internal,
        }
    }

    /// Whether repeating the failed external call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Storage(error) => error.is_transient(),
            Self::Extraction(error) => error.is_transient(),
            Self::Summarization(error) => error.is_transient(),
            Self::InvalidInput(_)
            | Self::Conversion(_)
            | Self::Workspace(_)
            | Self::TimedOut { .. } => false,
        }
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    /// Identifier under which the summary artifacts are archived.
    pub run_id: RunId,
    /// Generated summary, trimmed.
    pub summary: String,
    /// Whether both summary artifacts were written.
    pub persisted: bool,
}

/// Tunables of the orchestrator.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Attempts per external call, first attempt included.
    pub max_attempts: u32,
    /// Base delay between attempts; the n-th retry waits `n * retry_backoff`.
    pub retry_backoff: Duration,
    /// Optional bound on a whole run.
    pub run_timeout: Option<Duration>,
    /// Parent of per-run scratch directories; the system temp dir when `None`.
    pub work_dir: Option<PathBuf>,
    /// Layout of converted documents and summary PDFs.
    pub layout: PdfLayout,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            retry_backoff: Duration::from_millis(500),
            run_timeout: None,
            work_dir: None,
            layout: PdfLayout::LETTER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn stages_advance_linearly_to_persisted() {
        let mut stage = RunStage::Received;
        let mut visited = vec![stage];
        while let Some(next) = stage.successor() {
            visited.push(next);
            stage = next;
        }
        assert_eq!(
            visited,
            vec![
                RunStage::Received,
                RunStage::Validated,
                RunStage::Canonicalized,
                RunStage::Stored,
                RunStage::Extracted,
                RunStage::Summarized,
                RunStage::Persisted,
            ]
        );
        assert!(RunStage::Failed.is_terminal());
    }

    #[test]
    fn classifies_errors() {
        let invalid = PipelineError::InvalidInput("Unsupported file type".into());
        assert_eq!(invalid.kind(), ErrorKind::InvalidInput);
        assert_eq!(invalid.to_string(), "Unsupported file type");
        assert!(!invalid.is_retryable());

        let conversion = PipelineError::from(ConversionError::MissingPart("word/document.xml"));
        assert_eq!(conversion.kind(), ErrorKind::Conversion);
        assert!(!conversion.is_retryable());

        let throttled = PipelineError::from(StoreError::UnexpectedStatus {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: String::new(),
        });
        assert_eq!(throttled.kind(), ErrorKind::ExternalService);
        assert!(throttled.is_retryable());

        let timed_out = PipelineError::TimedOut {
            after: Duration::from_secs(30),
        };
        assert_eq!(timed_out.kind(), ErrorKind::ExternalService);
        assert!(!timed_out.is_retryable());
    }

    #[test]
    fn run_ids_are_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }
}
