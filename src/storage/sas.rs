//! Service shared-access signatures for individual blobs.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use super::StoreError;

/// Storage service version the signatures are computed for.
pub(crate) const SAS_VERSION: &str = "2022-11-02";

/// Access granted by a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SasPermissions {
    /// Read the blob.
    Read,
    /// Create or overwrite the blob.
    CreateWrite,
}

impl SasPermissions {
    fn as_str(self) -> &'static str {
        match self {
            Self::Read => "r",
            Self::CreateWrite => "cw",
        }
    }
}

/// Blob addressed by a signature.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BlobTarget<'a> {
    pub(crate) account: &'a str,
    pub(crate) container: &'a str,
    pub(crate) blob: &'a str,
}

/// Drop sub-second precision; signed expiry times are whole seconds.
pub(crate) fn truncate_to_seconds(instant: OffsetDateTime) -> OffsetDateTime {
    instant.replace_nanosecond(0).unwrap_or(instant)
}

/// Query parameters granting `permissions` on `target` until `expires_at`.
pub(crate) fn blob_sas_query(
    target: BlobTarget<'_>,
    account_key: &str,
    permissions: SasPermissions,
    expires_at: OffsetDateTime,
) -> Result<Vec<(&'static str, String)>, StoreError> {
    let expiry = truncate_to_seconds(expires_at)
        .format(&Rfc3339)
        .map_err(|error| StoreError::Signing(format!("expiry format: {error}")))?;
    let payload = string_to_sign(target, permissions, &expiry);
    let signature = sign(account_key, &payload)?;

    Ok(vec![
        ("sv", SAS_VERSION.to_string()),
        ("sr", "b".to_string()),
        ("sp", permissions.as_str().to_string()),
        ("se", expiry),
        ("sig", signature),
    ])
}

fn string_to_sign(target: BlobTarget<'_>, permissions: SasPermissions, expiry: &str) -> String {
    let resource = format!(
        "/blob/{}/{}/{}",
        target.account, target.container, target.blob
    );
    // Order: sp, st, se, resource, si, sip, spr, sv, sr, snapshot, ses, rscc, rscd, rsce, rscl, rsct.
    [
        permissions.as_str(),
        "",
        expiry,
        resource.as_str(),
        "",
        "",
        "",
        SAS_VERSION,
        "b",
        "",
        "",
        "",
        "",
        "",
        "",
        "",
    ]
    .join("\n")
}

fn sign(account_key: &str, payload: &str) -> Result<String, StoreError> {
    let key = STANDARD
        .decode(account_key)
        .map_err(|error| StoreError::Signing(format!("account key is not base64: {error}")))?;
    let mut mac = Hmac::<Sha256>::new_from_slice(&key)
        .map_err(|error| StoreError::Signing(error.to_string()))?;
    mac.update(payload.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}
