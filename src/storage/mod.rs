//! Durable artifact storage with time-limited read locators.

mod azure;
mod sas;

pub use azure::{AzureBlobStore, ConnectionString};

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;
use time::OffsetDateTime;

/// Errors returned while storing artifacts.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Storage connection string is missing required fields or malformed.
    #[error("Invalid storage connection string: {0}")]
    InvalidConnectionString(String),
    /// Access signature could not be produced.
    #[error("Failed to sign storage request: {0}")]
    Signing(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Storage responded with an unexpected status code.
    #[error("Unexpected storage response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the storage service.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

impl StoreError {
    /// Whether retrying the same upload may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(error) => error.is_timeout() || error.is_connect(),
            Self::UnexpectedStatus { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::InvalidConnectionString(_) | Self::Signing(_) => false,
        }
    }
}

/// A stored object and the read-only locator issued for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObjectReference {
    name: String,
    url: String,
    expires_at: OffsetDateTime,
}

impl StoredObjectReference {
    /// Describe a stored object readable at `url` until `expires_at`.
    pub fn new(name: impl Into<String>, url: impl Into<String>, expires_at: OffsetDateTime) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            expires_at,
        }
    }

    /// Durable object name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Time-limited read locator.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Instant after which the locator no longer grants access.
    pub fn expires_at(&self) -> OffsetDateTime {
        self.expires_at
    }

    /// Whether the locator has lapsed at `now`.
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }
}

/// Write-once-per-name object storage.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store `content` under `name` and return a read locator for it.
    async fn put(
        &self,
        name: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObjectReference, StoreError>;
}
