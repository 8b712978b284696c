//! Pipeline service sequencing canonicalization, storage, extraction, and summarization.

use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tracing::Instrument;

use super::prompt::build_summary_request;
use super::retry::{RetryPolicy, retry_external};
use super::types::{PipelineError, PipelineOutcome, PipelineSettings, RunId, RunStage};
use super::validate::validate_upload;
use super::workspace::RunWorkspace;
use crate::archive::{ArchiveError, ArtifactKind, SummaryArchive};
use crate::canonical::{CanonicalOrigin, Canonicalizer, UploadedDocument, render_paragraphs_pdf};
use crate::extraction::{DocumentExtractor, ExtractionError};
use crate::metrics::{MetricsSnapshot, PipelineMetrics};
use crate::storage::ArtifactStore;
use crate::summarization::Summarizer;

/// Runs uploads through the pipeline, one request at a time per call.
///
/// The three external capabilities are injected at construction, so production wiring and
/// tests differ only in what they pass in. Construct the service once near process start and
/// share it through an `Arc`.
pub struct PipelineService {
    store: Box<dyn ArtifactStore>,
    extractor: Box<dyn DocumentExtractor>,
    summarizer: Box<dyn Summarizer>,
    canonicalizer: Canonicalizer,
    archive: SummaryArchive,
    settings: PipelineSettings,
    metrics: Arc<PipelineMetrics>,
}

/// Abstraction over the pipeline used by the HTTP surface.
#[async_trait]
pub trait PipelineApi: Send + Sync {
    /// Validate an upload and run it through every stage.
    async fn summarize_upload(
        &self,
        filename: Option<String>,
        content: Vec<u8>,
    ) -> Result<PipelineOutcome, PipelineError>;

    /// Read an archived summary artifact.
    async fn open_artifact(
        &self,
        run_id: &str,
        file: &str,
    ) -> Result<(ArtifactKind, Vec<u8>), ArchiveError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl PipelineService {
    /// Assemble a service from its capabilities.
    pub fn new(
        store: Box<dyn ArtifactStore>,
        extractor: Box<dyn DocumentExtractor>,
        summarizer: Box<dyn Summarizer>,
        archive: SummaryArchive,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store,
            extractor,
            summarizer,
            canonicalizer: Canonicalizer::new(settings.layout),
            archive,
            settings,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Run a validated upload to completion or to its first failure.
    ///
    /// Every stage runs strictly after the previous one. Transient external failures are
    /// retried per [`PipelineSettings`]; anything else aborts the run. Side effects of completed
    /// stages, such as a stored blob, are left in place.
    pub async fn run(&self, upload: UploadedDocument) -> Result<PipelineOutcome, PipelineError> {
        let run_id = RunId::new();
        let span = tracing::info_span!("run", run_id = %run_id, format = ?upload.format());
        self.metrics.record_started();

        let mut stage = RunStage::Validated;
        let result = async {
            tracing::info!(filename = upload.filename(), bytes = upload.content().len(), "Run started");
            match self.settings.run_timeout {
                Some(limit) => tokio::time::timeout(limit, self.execute(run_id, &upload, &mut stage))
                    .await
                    .unwrap_or(Err(PipelineError::TimedOut { after: limit })),
                None => self.execute(run_id, &upload, &mut stage).await,
            }
        }
        .instrument(span.clone())
        .await;

        span.in_scope(|| match &result {
            Ok(outcome) => {
                self.metrics.record_succeeded();
                tracing::info!(stage = %stage, persisted = outcome.persisted, "Run completed");
            }
            Err(error) => {
                self.metrics.record_failed();
                tracing::error!(
                    stage = %RunStage::Failed,
                    last_completed = %stage,
                    kind = ?error.kind(),
                    error = %error,
                    "Run failed"
                );
            }
        });
        result
    }

    async fn execute(
        &self,
        run_id: RunId,
        upload: &UploadedDocument,
        stage: &mut RunStage,
    ) -> Result<PipelineOutcome, PipelineError> {
        let policy = RetryPolicy {
            max_attempts: self.settings.max_attempts,
            backoff: self.settings.retry_backoff,
        };
        let workspace = RunWorkspace::create(self.settings.work_dir.as_deref(), run_id)
            .map_err(PipelineError::Workspace)?;
        tracing::debug!(workspace = %workspace.path().display(), "Workspace created");
        workspace
            .stage(&format!("upload.{}", upload.format().extension()), upload.content())
            .await
            .map_err(PipelineError::Workspace)?;

        let canonical = self.canonicalizer.canonicalize(upload)?;
        let format = canonical.format();
        workspace
            .stage(&format!("canonical.{}", format.extension()), canonical.content())
            .await
            .map_err(PipelineError::Workspace)?;
        if let CanonicalOrigin::Converted { paragraphs, pages } = canonical.origin() {
            tracing::debug!(paragraphs, pages, "Upload converted");
        }
        advance(stage);

        let blob_name = format!("{run_id}.{}", format.extension());
        let content = canonical.into_content();
        let store = self.store.as_ref();
        let name = blob_name.as_str();
        let content = &content;
        let reference = retry_external(RunStage::Stored, policy, &self.metrics, move || {
            store.put(name, content.clone(), format.content_type())
        })
        .await?;
        tracing::debug!(blob = reference.name(), expires_at = %reference.expires_at(), "Document stored");
        advance(stage);

        if reference.is_expired_at(OffsetDateTime::now_utc()) {
            return Err(ExtractionError::LocatorExpired {
                name: reference.name().to_string(),
                expired_at: reference.expires_at(),
            }
            .into());
        }
        let extractor = self.extractor.as_ref();
        let source = &reference;
        let document = retry_external(RunStage::Extracted, policy, &self.metrics, move || {
            extractor.extract(source)
        })
        .await?;
        let text = document.to_text();
        tracing::debug!(
            pages = document.pages.len(),
            lines = document.line_count(),
            chars = text.len(),
            "Text extracted"
        );
        advance(stage);

        let request = build_summary_request(&text);
        let summarizer = self.summarizer.as_ref();
        let request = &request;
        let summary = retry_external(RunStage::Summarized, policy, &self.metrics, move || {
            summarizer.summarize(request.clone())
        })
        .await?;
        let summary = summary.trim().to_string();
        advance(stage);

        let persisted = self.persist(run_id, &summary).await;
        if persisted {
            advance(stage);
        }

        Ok(PipelineOutcome {
            run_id,
            summary,
            persisted,
        })
    }

    /// Write the plain-text and PDF summaries. Failure is reported, never propagated.
    async fn persist(&self, run_id: RunId, summary: &str) -> bool {
        let lines: Vec<&str> = summary.lines().collect();
        let written = match render_paragraphs_pdf("summary", &lines, &self.settings.layout) {
            Ok(pdf) => self
                .archive
                .persist(run_id.as_uuid(), summary, &pdf.bytes)
                .await
                .map_err(|error| error.to_string()),
            Err(error) => Err(error.to_string()),
        };

        match written {
            Ok(paths) => {
                tracing::debug!(
                    text = %paths.text_path.display(),
                    pdf = %paths.pdf_path.display(),
                    "Summary persisted"
                );
                true
            }
            Err(error) => {
                self.metrics.record_persistence_failure();
                tracing::warn!(error = %error, "Failed to persist summary; returning it anyway");
                false
            }
        }
    }

    /// Return the current pipeline metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

fn advance(stage: &mut RunStage) {
    if let Some(next) = stage.successor() {
        tracing::info!(stage = %next, "Stage completed");
        *stage = next;
    }
}

#[async_trait]
impl PipelineApi for PipelineService {
    async fn summarize_upload(
        &self,
        filename: Option<String>,
        content: Vec<u8>,
    ) -> Result<PipelineOutcome, PipelineError> {
        let upload = match validate_upload(filename.as_deref(), content) {
            Ok(upload) => upload,
            Err(error) => {
                self.metrics.record_invalid_input();
                tracing::info!(
                    stage = %RunStage::Received,
                    filename = filename.as_deref().unwrap_or_default(),
                    error = %error,
                    "Upload rejected"
                );
                return Err(error);
            }
        };
        self.run(upload).await
    }

    async fn open_artifact(
        &self,
        run_id: &str,
        file: &str,
    ) -> Result<(ArtifactKind, Vec<u8>), ArchiveError> {
        self.archive.open(run_id, file).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        PipelineService::metrics_snapshot(self)
    }
}
