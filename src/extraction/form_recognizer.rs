//! Azure Form Recognizer (`prebuilt-document`) client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header::LOCATION};
use serde::Deserialize;
use serde_json::json;
use time::OffsetDateTime;

use super::{DocumentExtractor, ExtractedDocument, ExtractedPage, ExtractionError};
use crate::storage::StoredObjectReference;

const API_VERSION: &str = "2023-07-31";
const MODEL_ID: &str = "prebuilt-document";
const OPERATION_LOCATION: &str = "operation-location";
const KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// How long to wait on a running analysis operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Delay between status checks.
    pub interval: Duration,
    /// Status checks issued before giving up.
    pub max_polls: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_polls: 120,
        }
    }
}

/// Client for the Form Recognizer REST API.
pub struct FormRecognizerClient {
    http: Client,
    endpoint: String,
    key: String,
    poll: PollSettings,
}

impl FormRecognizerClient {
    /// Build a client for the resource at `endpoint`.
    pub fn new(
        endpoint: impl Into<String>,
        key: impl Into<String>,
        poll: PollSettings,
    ) -> Result<Self, ExtractionError> {
        let http = Client::builder().user_agent("lexsum/extract").build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            key: key.into(),
            poll,
        })
    }

    fn analyze_url(&self) -> String {
        format!(
            "{}/formrecognizer/documentModels/{MODEL_ID}:analyze?api-version={API_VERSION}",
            self.endpoint
        )
    }

    async fn start_analysis(&self, source: &StoredObjectReference) -> Result<String, ExtractionError> {
        let response = self
            .http
            .post(self.analyze_url())
            .header(KEY_HEADER, &self.key)
            .json(&json!({ "urlSource": source.url() }))
            .send()
            .await?;

        if response.status() != StatusCode::ACCEPTED {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::UnexpectedStatus { status, body });
        }

        response
            .headers()
            .get(OPERATION_LOCATION)
            .or_else(|| response.headers().get(LOCATION))
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                ExtractionError::InvalidResponse("missing Operation-Location header".into())
            })
    }

    async fn await_result(&self, operation: &str) -> Result<AnalyzeResult, ExtractionError> {
        for poll in 1..=self.poll.max_polls {
            let response = self
                .http
                .get(operation)
                .header(KEY_HEADER, &self.key)
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(ExtractionError::UnexpectedStatus { status, body });
            }

            let body: AnalyzeOperation = response.json().await.map_err(|error| {
                ExtractionError::InvalidResponse(format!("failed to decode operation: {error}"))
            })?;

            match body.status.as_str() {
                "succeeded" => {
                    tracing::debug!(poll, "Document analysis succeeded");
                    return body.analyze_result.ok_or_else(|| {
                        ExtractionError::InvalidResponse("succeeded without analyzeResult".into())
                    });
                }
                "failed" => {
                    let message = body
                        .error
                        .map(|error| format!("{}: {}", error.code, error.message))
                        .unwrap_or_else(|| "no error detail".into());
                    return Err(ExtractionError::AnalysisFailed(message));
                }
                status => {
                    tracing::trace!(poll, status, "Document analysis still running");
                    if poll < self.poll.max_polls {
                        tokio::time::sleep(self.poll.interval).await;
                    }
                }
            }
        }

        Err(ExtractionError::PollBudgetExhausted {
            polls: self.poll.max_polls,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeOperation {
    status: String,
    #[serde(default)]
    analyze_result: Option<AnalyzeResult>,
    #[serde(default)]
    error: Option<ServiceError>,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
struct AnalyzeResult {
    #[serde(default)]
    pages: Vec<ResultPage>,
}

#[derive(Debug, Deserialize)]
struct ResultPage {
    #[serde(default)]
    lines: Vec<ResultLine>,
}

#[derive(Debug, Deserialize)]
struct ResultLine {
    content: String,
}

impl From<AnalyzeResult> for ExtractedDocument {
    fn from(result: AnalyzeResult) -> Self {
        Self {
            pages: result
                .pages
                .into_iter()
                .map(|page| ExtractedPage {
                    lines: page.lines.into_iter().map(|line| line.content).collect(),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl DocumentExtractor for FormRecognizerClient {
    async fn extract(
        &self,
        source: &StoredObjectReference,
    ) -> Result<ExtractedDocument, ExtractionError> {
        if source.is_expired_at(OffsetDateTime::now_utc()) {
            return Err(ExtractionError::LocatorExpired {
                name: source.name().to_string(),
                expired_at: source.expires_at(),
            });
        }

        let operation = self.start_analysis(source).await?;
        tracing::debug!(document = source.name(), "Document analysis started");
        let document = ExtractedDocument::from(self.await_result(&operation).await?);
        tracing::debug!(
            document = source.name(),
            pages = document.pages.len(),
            lines = document.line_count(),
            "Document text extracted"
        );
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{
        Method::{GET, POST},
        MockServer,
    };
    use time::Duration as TimeDuration;

    const OPERATION_PATH: &str = "/formrecognizer/documentModels/prebuilt-document/analyzeResults/op-1";

    fn client_for(server: &MockServer, max_polls: u32) -> FormRecognizerClient {
        FormRecognizerClient::new(
            format!("{}/", server.base_url()),
            "secret",
            PollSettings {
                interval: Duration::ZERO,
                max_polls,
            },
        )
        .expect("client")
    }

    fn live_reference() -> StoredObjectReference {
        StoredObjectReference::new(
            "run.pdf",
            "https://acme.blob.core.windows.net/legal-docs/run.pdf?sig=x",
            OffsetDateTime::now_utc() + TimeDuration::minutes(10),
        )
    }

    async fn mock_start(server: &MockServer) -> httpmock::Mock<'_> {
        let location = server.url(OPERATION_PATH);
        server
            .mock_async(move |when, then| {
                when.method(POST)
                    .path("/formrecognizer/documentModels/prebuilt-document:analyze")
                    .query_param("api-version", API_VERSION)
                    .header(KEY_HEADER, "secret")
                    .json_body(json!({
                        "urlSource": "https://acme.blob.core.windows.net/legal-docs/run.pdf?sig=x"
                    }));
                then.status(202).header("Operation-Location", location.as_str());
            })
            .await
    }

    #[tokio::test]
    async fn extracts_lines_page_by_page() {
        let server = MockServer::start_async().await;
        let start = mock_start(&server).await;
        let poll = server
            .mock_async(|when, then| {
                when.method(GET).path(OPERATION_PATH).header(KEY_HEADER, "secret");
                then.status(200).json_body(json!({
                    "status": "succeeded",
                    "analyzeResult": {
                        "pages": [
                            { "pageNumber": 1, "lines": [
                                { "content": "Party A agrees to pay Party B $500." },
                                { "content": "Signed 1 May." }
                            ]},
                            { "pageNumber": 2, "lines": [ { "content": "Annex" } ] }
                        ]
                    }
                }));
            })
            .await;

        let document = client_for(&server, 3)
            .extract(&live_reference())
            .await
            .expect("extraction");

        start.assert_async().await;
        poll.assert_async().await;
        assert_eq!(
            document.to_text(),
            "Party A agrees to pay Party B $500.\nSigned 1 May.\nAnnex\n"
        );
    }

    #[tokio::test]
    async fn expired_locator_is_rejected_without_calling_the_service() {
        let server = MockServer::start_async().await;
        let start = mock_start(&server).await;
        let reference = StoredObjectReference::new(
            "run.pdf",
            "https://acme.blob.core.windows.net/legal-docs/run.pdf?sig=x",
            OffsetDateTime::now_utc() - TimeDuration::seconds(1),
        );

        let error = client_for(&server, 3)
            .extract(&reference)
            .await
            .expect_err("expired");

        assert!(matches!(error, ExtractionError::LocatorExpired { .. }));
        start.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn failed_operation_reports_service_error() {
        let server = MockServer::start_async().await;
        mock_start(&server).await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(OPERATION_PATH);
                then.status(200).json_body(json!({
                    "status": "failed",
                    "error": { "code": "InvalidContent", "message": "The file is corrupted." }
                }));
            })
            .await;

        let error = client_for(&server, 3)
            .extract(&live_reference())
            .await
            .expect_err("failed analysis");

        assert!(
            matches!(&error, ExtractionError::AnalysisFailed(message) if message.contains("InvalidContent"))
        );
        assert!(!error.is_transient());
    }

    #[tokio::test]
    async fn gives_up_after_poll_budget() {
        let server = MockServer::start_async().await;
        mock_start(&server).await;
        let poll = server
            .mock_async(|when, then| {
                when.method(GET).path(OPERATION_PATH);
                then.status(200).json_body(json!({ "status": "running" }));
            })
            .await;

        let error = client_for(&server, 2)
            .extract(&live_reference())
            .await
            .expect_err("still running");

        assert!(matches!(error, ExtractionError::PollBudgetExhausted { polls: 2 }));
        poll.assert_hits_async(2).await;
    }

    #[tokio::test]
    async fn rejected_submission_surfaces_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/formrecognizer/documentModels/prebuilt-document:analyze");
                then.status(401).body("Access denied due to invalid subscription key.");
            })
            .await;

        let error = client_for(&server, 1)
            .extract(&live_reference())
            .await
            .expect_err("unauthorized");

        assert!(
            matches!(error, ExtractionError::UnexpectedStatus { status, .. } if status == StatusCode::UNAUTHORIZED)
        );
    }
}
