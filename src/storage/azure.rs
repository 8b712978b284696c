//! Azure Blob Storage adapter.
//!
//! Uploads and read locators are both authorized with service SAS tokens derived from the
//! account key, so the client never has to canonicalize request headers for Shared Key auth.

use async_trait::async_trait;
use reqwest::{Client, Url, header::CONTENT_TYPE};
use time::{Duration, OffsetDateTime};

use super::sas::{self, BlobTarget, SAS_VERSION, SasPermissions};
use super::{ArtifactStore, StoreError, StoredObjectReference};

const UPLOAD_SAS_TTL: Duration = Duration::minutes(5);

/// Parsed storage account connection string.
#[derive(Clone)]
pub struct ConnectionString {
    account_name: String,
    account_key: String,
    blob_endpoint: String,
}

impl std::fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionString")
            .field("account_name", &self.account_name)
            .field("blob_endpoint", &self.blob_endpoint)
            .finish_non_exhaustive()
    }
}

impl ConnectionString {
    /// Parse `Key=Value;...` pairs. `AccountName` and `AccountKey` are required; the blob
    /// endpoint comes from `BlobEndpoint` or is derived from the protocol and endpoint suffix.
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let mut account_name = None;
        let mut account_key = None;
        let mut blob_endpoint = None;
        let mut protocol = "https".to_string();
        let mut suffix = "core.windows.net".to_string();

        for pair in raw.split(';').map(str::trim).filter(|pair| !pair.is_empty()) {
            // Segments may carry the key, so errors never echo them.
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                StoreError::InvalidConnectionString("segment without '='".into())
            })?;
            match key {
                "AccountName" => account_name = Some(value.to_string()),
                "AccountKey" => account_key = Some(value.to_string()),
                "BlobEndpoint" => blob_endpoint = Some(value.trim_end_matches('/').to_string()),
                "DefaultEndpointsProtocol" => protocol = value.to_string(),
                "EndpointSuffix" => suffix = value.to_string(),
                _ => {}
            }
        }

        let account_name = account_name
            .filter(|name| !name.is_empty())
            .ok_or_else(|| StoreError::InvalidConnectionString("missing AccountName".into()))?;
        let account_key = account_key
            .filter(|key| !key.is_empty())
            .ok_or_else(|| StoreError::InvalidConnectionString("missing AccountKey".into()))?;
        let blob_endpoint = blob_endpoint
            .unwrap_or_else(|| format!("{protocol}://{account_name}.blob.{suffix}"));
        Url::parse(&blob_endpoint)
            .map_err(|error| StoreError::InvalidConnectionString(format!("blob endpoint: {error}")))?;

        Ok(Self {
            account_name,
            account_key,
            blob_endpoint,
        })
    }

    /// Storage account name.
    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    /// Base URL of the blob service.
    pub fn blob_endpoint(&self) -> &str {
        &self.blob_endpoint
    }
}

/// Blob container client issuing read locators with a fixed lifetime.
pub struct AzureBlobStore {
    client: Client,
    connection: ConnectionString,
    container: String,
    locator_ttl: Duration,
}

impl AzureBlobStore {
    /// Construct a client for `container` from a storage connection string.
    pub fn new(
        connection_string: &str,
        container: impl Into<String>,
        locator_ttl: Duration,
    ) -> Result<Self, StoreError> {
        let connection = ConnectionString::parse(connection_string)?;
        let client = Client::builder().user_agent("lexsum/0.1").build()?;
        let container = container.into();
        tracing::debug!(
            account = connection.account_name(),
            endpoint = connection.blob_endpoint(),
            container = %container,
            locator_ttl_secs = locator_ttl.whole_seconds(),
            "Initialized blob storage client"
        );
        Ok(Self {
            client,
            connection,
            container,
            locator_ttl,
        })
    }

    fn signed_url(
        &self,
        name: &str,
        permissions: SasPermissions,
        expires_at: OffsetDateTime,
    ) -> Result<Url, StoreError> {
        let target = BlobTarget {
            account: &self.connection.account_name,
            container: &self.container,
            blob: name,
        };
        let query = sas::blob_sas_query(target, &self.connection.account_key, permissions, expires_at)?;

        let mut url = Url::parse(&self.connection.blob_endpoint)
            .map_err(|error| StoreError::InvalidConnectionString(error.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| {
                StoreError::InvalidConnectionString("blob endpoint cannot carry a path".into())
            })?
            .pop_if_empty()
            .push(&self.container)
            .push(name);
        url.query_pairs_mut().extend_pairs(query);
        Ok(url)
    }
}

#[async_trait]
impl ArtifactStore for AzureBlobStore {
    async fn put(
        &self,
        name: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObjectReference, StoreError> {
        let upload_url = self.signed_url(
            name,
            SasPermissions::CreateWrite,
            OffsetDateTime::now_utc() + UPLOAD_SAS_TTL,
        )?;
        let size = content.len();

        let response = self
            .client
            .put(upload_url)
            .header("x-ms-blob-type", "BlockBlob")
            .header("x-ms-version", SAS_VERSION)
            .header(CONTENT_TYPE, content_type)
            .body(content)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = StoreError::UnexpectedStatus { status, body };
            tracing::error!(blob = name, error = %error, "Failed to upload blob");
            return Err(error);
        }

        // The locator lifetime starts once the blob exists.
        let expires_at = sas::truncate_to_seconds(OffsetDateTime::now_utc() + self.locator_ttl);
        let url = self.signed_url(name, SasPermissions::Read, expires_at)?;
        tracing::debug!(
            blob = name,
            container = %self.container,
            bytes = size,
            %expires_at,
            "Blob uploaded"
        );
        Ok(StoredObjectReference::new(name, url.to_string(), expires_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::PUT, MockServer};

    const KEY: &str = "a2V5";

    fn store_for(server: &MockServer) -> AzureBlobStore {
        let connection = format!(
            "DefaultEndpointsProtocol=http;AccountName=devstoreaccount1;AccountKey={KEY};BlobEndpoint={}",
            server.base_url()
        );
        AzureBlobStore::new(&connection, "legal-docs", Duration::minutes(10)).expect("store")
    }

    #[test]
    fn derives_public_endpoint_from_account_and_suffix() {
        let parsed = ConnectionString::parse(
            "DefaultEndpointsProtocol=https;AccountName=acme;AccountKey=a2V5==;EndpointSuffix=core.windows.net",
        )
        .expect("connection string");
        assert_eq!(parsed.account_name(), "acme");
        assert_eq!(parsed.blob_endpoint(), "https://acme.blob.core.windows.net");
        assert_eq!(parsed.account_key, "a2V5==");
    }

    #[test]
    fn explicit_blob_endpoint_wins() {
        let parsed = ConnectionString::parse(
            "AccountName=devstoreaccount1;AccountKey=a2V5;BlobEndpoint=http://127.0.0.1:10000/devstoreaccount1/",
        )
        .expect("connection string");
        assert_eq!(
            parsed.blob_endpoint(),
            "http://127.0.0.1:10000/devstoreaccount1"
        );
    }

    #[test]
    fn rejects_connection_string_without_key() {
        let error = ConnectionString::parse("AccountName=acme;EndpointSuffix=core.windows.net")
            .expect_err("missing key");
        assert!(matches!(error, StoreError::InvalidConnectionString(message) if message.contains("AccountKey")));
    }

    #[test]
    fn debug_output_omits_account_key() {
        let parsed = ConnectionString::parse("AccountName=acme;AccountKey=c2VjcmV0").expect("parse");
        assert!(!format!("{parsed:?}").contains("c2VjcmV0"));
    }

    #[tokio::test]
    async fn put_uploads_block_blob_and_returns_read_locator() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/legal-docs/run-1.pdf")
                    .header("x-ms-blob-type", "BlockBlob")
                    .header("content-type", "application/pdf")
                    .query_param("sp", "cw")
                    .query_param("sr", "b")
                    .query_param_exists("sig")
                    .body("%PDF-1.7");
                then.status(201);
            })
            .await;

        let store = store_for(&server);
        let before = OffsetDateTime::now_utc();
        let reference = store
            .put("run-1.pdf", b"%PDF-1.7".to_vec(), "application/pdf")
            .await
            .expect("upload");
        let after = OffsetDateTime::now_utc();

        mock.assert_async().await;
        assert_eq!(reference.name(), "run-1.pdf");
        let url = Url::parse(reference.url()).expect("locator url");
        assert_eq!(url.path(), "/legal-docs/run-1.pdf");
        let params: Vec<(String, String)> = url
            .query_pairs()
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        assert!(params.contains(&("sp".into(), "r".into())));
        assert!(params.iter().any(|(key, _)| key == "sig"));

        assert!(reference.expires_at() <= after + Duration::minutes(10));
        assert!(reference.expires_at() > before + Duration::minutes(10) - Duration::seconds(1));
    }

    #[tokio::test]
    async fn locator_lifetime_starts_after_a_slow_upload() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path("/legal-docs/run-3.pdf");
                then.status(201).delay(std::time::Duration::from_millis(1_500));
            })
            .await;

        let before = OffsetDateTime::now_utc();
        let reference = store_for(&server)
            .put("run-3.pdf", b"%PDF".to_vec(), "application/pdf")
            .await
            .expect("upload");

        // Whole-second truncation costs at most one second of the 1.5s upload.
        assert!(
            reference.expires_at()
                >= before + Duration::minutes(10) + Duration::milliseconds(500)
        );
    }

    #[tokio::test]
    async fn put_surfaces_rejections() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path("/legal-docs/run-2.pdf");
                then.status(403).body("AuthenticationFailed");
            })
            .await;

        let error = store_for(&server)
            .put("run-2.pdf", b"%PDF".to_vec(), "application/pdf")
            .await
            .expect_err("rejected");

        assert!(
            matches!(&error, StoreError::UnexpectedStatus { status, body } if status.as_u16() == 403 && body == "AuthenticationFailed")
        );
        assert!(!error.is_transient());
    }
}
