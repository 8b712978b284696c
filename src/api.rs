//! HTTP surface for lexsum.
//!
//! This module exposes a compact Axum router, every route behind HTTP Basic auth:
//!
//! - `GET /` – Minimal HTML form for uploading a document.
//! - `POST /upload` – Multipart upload (field `file`, `.pdf`/`.doc`/`.docx`). Runs the pipeline
//!   and returns `{"summary": ...}`; the run identifier travels in the `X-Run-Id` header.
//! - `GET /download/:run_id/:filename` – Fetch `summary.txt` or `summary.pdf` of a past run.
//! - `GET /metrics` – Observe pipeline counters.
//!
//! Request bodies above the configured ceiling are refused with `413` before the handler runs.

use crate::archive::ArchiveError;
use crate::auth::{BasicCredentials, require_basic_auth};
use crate::pipeline::{ErrorKind, PipelineApi, PipelineError};
use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, Path, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::{StatusCode, header},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

/// Header carrying the identifier of the run that produced a summary.
pub const RUN_ID_HEADER: &str = "x-run-id";

const UPLOAD_FIELD: &str = "file";

const INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>Legal document summarizer</title></head>
<body>
<h1>Legal document summarizer</h1>
<form action="/upload" method="post" enctype="multipart/form-data">
<input type="file" name="file" accept=".pdf,.doc,.docx" required>
<button type="submit">Summarize</button>
</form>
</body>
</html>
"#;

/// Settings of the HTTP surface.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Credentials every request must present.
    pub credentials: BasicCredentials,
    /// Request body ceiling in bytes.
    pub max_upload_bytes: usize,
}

/// Build the HTTP router exposing the upload and download surface.
pub fn create_router<S>(service: Arc<S>, settings: ApiSettings) -> Router
where
    S: PipelineApi + 'static,
{
    let credentials = Arc::new(settings.credentials);
    Router::new()
        .route("/", get(index_page))
        .route("/upload", post(upload_document::<S>))
        .route("/download/:run_id/:filename", get(download_artifact::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .with_state(service)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(settings.max_upload_bytes))
        .layer(middleware::from_fn_with_state(credentials, require_basic_auth))
}

async fn index_page() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Success response for `POST /upload`.
#[derive(Serialize)]
struct SummaryResponse {
    summary: String,
}

/// Run an uploaded document through the pipeline and return its summary.
///
/// A request without a multipart `file` field is treated like an upload without a filename.
async fn upload_document<S>(
    State(service): State<Arc<S>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError>
where
    S: PipelineApi,
{
    let (filename, content) = match multipart {
        Ok(multipart) => read_upload(multipart).await?,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Upload request is not multipart");
            (None, Vec::new())
        }
    };

    let outcome = service.summarize_upload(filename, content).await?;
    tracing::info!(
        run_id = %outcome.run_id,
        persisted = outcome.persisted,
        "Upload summarized"
    );
    Ok((
        [(RUN_ID_HEADER, outcome.run_id.to_string())],
        Json(SummaryResponse {
            summary: outcome.summary,
        }),
    )
        .into_response())
}

async fn read_upload(mut multipart: Multipart) -> Result<(Option<String>, Vec<u8>), AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let content = field.bytes().await?;
        return Ok((filename, content.to_vec()));
    }
    Ok((None, Vec::new()))
}

/// Stream a persisted summary artifact as an attachment.
async fn download_artifact<S>(
    State(service): State<Arc<S>>,
    Path((run_id, filename)): Path<(String, String)>,
) -> Result<Response, AppError>
where
    S: PipelineApi,
{
    let (kind, bytes) = service.open_artifact(&run_id, &filename).await?;
    let disposition = format!("attachment; filename=\"{}\"", kind.file_name());
    Ok((
        [
            (header::CONTENT_TYPE, kind.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// Return the pipeline counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<crate::metrics::MetricsSnapshot>
where
    S: PipelineApi,
{
    Json(service.metrics_snapshot())
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

enum AppError {
    Pipeline(PipelineError),
    Archive(ArchiveError),
    Multipart(MultipartError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Pipeline(error) => {
                let status = match error.kind() {
                    ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
                    ErrorKind::Conversion | ErrorKind::ExternalService | ErrorKind::Internal => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, error.to_string())
            }
            Self::Archive(error) => {
                let status = match error {
                    ArchiveError::NotFound { .. } | ArchiveError::UnknownArtifact(_) => {
                        StatusCode::NOT_FOUND
                    }
                    ArchiveError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, error.to_string())
            }
            Self::Multipart(error) => (error.status(), error.body_text()),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(inner: PipelineError) -> Self {
        Self::Pipeline(inner)
    }
}

impl From<ArchiveError> for AppError {
    fn from(inner: ArchiveError) -> Self {
        Self::Archive(inner)
    }
}

impl From<MultipartError> for AppError {
    fn from(inner: MultipartError) -> Self {
        Self::Multipart(inner)
    }
}
