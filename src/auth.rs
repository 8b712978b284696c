//! HTTP Basic authentication gating every route.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use subtle::ConstantTimeEq;

const CHALLENGE: &str = r#"Basic realm="Login Required""#;
const UNAUTHORIZED_BODY: &str = "Unauthorized. Please provide valid credentials.\n";

/// A user name and password pair.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    username: String,
    password: String,
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl BasicCredentials {
    /// Bundle a user name and password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Compare against `presented` without short-circuiting on the first mismatch.
    pub fn verify(&self, presented: &BasicCredentials) -> bool {
        let user = self.username.as_bytes().ct_eq(presented.username.as_bytes());
        let pass = self.password.as_bytes().ct_eq(presented.password.as_bytes());
        (user & pass).into()
    }
}

/// Decode an `Authorization: Basic base64(user:pass)` header value.
pub fn parse_basic_authorization(value: &HeaderValue) -> Option<BasicCredentials> {
    let value = value.to_str().ok()?.trim();
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some(BasicCredentials::new(username, password))
}

/// Reject requests whose Basic credentials do not match `expected`.
pub async fn require_basic_auth(
    State(expected): State<Arc<BasicCredentials>>,
    request: Request,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(parse_basic_authorization);

    match presented {
        Some(credentials) if expected.verify(&credentials) => next.run(request).await,
        presented => {
            tracing::warn!(
                path = %request.uri().path(),
                provided = presented.is_some(),
                "Rejected request without valid credentials"
            );
            unauthorized()
        }
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, CHALLENGE)],
        UNAUTHORIZED_BODY,
    )
        .into_response()
}

#[cfg(test)]
pub(crate) fn basic_header(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}
