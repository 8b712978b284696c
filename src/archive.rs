//! Run-scoped storage of summary artifacts on the local filesystem.
//!
//! Every run writes into its own directory, `{root}/{run_id}/`, so concurrent runs never
//! overwrite each other's output.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

/// Errors raised while writing or reading archived summaries.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Filesystem operation failed.
    #[error("Archive I/O failed for {path}: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// No artifact exists for the requested run.
    #[error("No artifact '{file}' for run '{run_id}'")]
    NotFound {
        /// Requested run identifier.
        run_id: String,
        /// Requested file name.
        file: String,
    },
    /// The requested name is not a known artifact or the run id is malformed.
    #[error("Unknown artifact '{0}'")]
    UnknownArtifact(String),
}

/// Artifacts written for each summarized run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// `summary.txt`
    PlainText,
    /// `summary.pdf`
    Pdf,
}

impl ArtifactKind {
    /// Fixed file name within a run directory.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::PlainText => "summary.txt",
            Self::Pdf => "summary.pdf",
        }
    }

    /// MIME type served on download.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::PlainText => "text/plain; charset=utf-8",
            Self::Pdf => "application/pdf",
        }
    }

    /// Resolve a requested file name. Anything other than the two fixed names is rejected.
    pub fn from_file_name(name: &str) -> Option<Self> {
        match name {
            "summary.txt" => Some(Self::PlainText),
            "summary.pdf" => Some(Self::Pdf),
            _ => None,
        }
    }
}

/// Paths of a persisted pair of summary artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedSummary {
    /// Plain-text summary.
    pub text_path: PathBuf,
    /// Paginated PDF summary.
    pub pdf_path: PathBuf,
}

/// Root directory holding one sub-directory per run.
#[derive(Debug, Clone)]
pub struct SummaryArchive {
    root: PathBuf,
}

impl SummaryArchive {
    /// Archive rooted at `root`; the directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Write both artifacts for `run_id`, replacing any earlier output of the same run.
    pub async fn persist(
        &self,
        run_id: Uuid,
        summary: &str,
        pdf: &[u8],
    ) -> Result<PersistedSummary, ArchiveError> {
        let dir = self.run_dir(run_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| ArchiveError::Io {
                path: dir.clone(),
                source,
            })?;

        let text_path = dir.join(ArtifactKind::PlainText.file_name());
        write(&text_path, summary.as_bytes()).await?;
        let pdf_path = dir.join(ArtifactKind::Pdf.file_name());
        write(&pdf_path, pdf).await?;

        Ok(PersistedSummary {
            text_path,
            pdf_path,
        })
    }

    /// Read an archived artifact by run id and file name.
    pub async fn open(
        &self,
        run_id: &str,
        file: &str,
    ) -> Result<(ArtifactKind, Vec<u8>), ArchiveError> {
        let kind = ArtifactKind::from_file_name(file)
            .ok_or_else(|| ArchiveError::UnknownArtifact(file.to_string()))?;
        let run = Uuid::parse_str(run_id)
            .map_err(|_| ArchiveError::UnknownArtifact(run_id.to_string()))?;

        let path = self.run_dir(run).join(kind.file_name());
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok((kind, bytes)),
            Err(source) if source.kind() == io::ErrorKind::NotFound => Err(ArchiveError::NotFound {
                run_id: run_id.to_string(),
                file: file.to_string(),
            }),
            Err(source) => Err(ArchiveError::Io { path, source }),
        }
    }

    fn run_dir(&self, run_id: Uuid) -> PathBuf {
        // Hyphenated form regardless of how the caller spelled the id.
        self.root.join(run_id.hyphenated().to_string())
    }
}

async fn write(path: &Path, contents: &[u8]) -> Result<(), ArchiveError> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|source| ArchiveError::Io {
            path: path.to_path_buf(),
            source,
        })
}
