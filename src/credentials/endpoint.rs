//! # OAuth token endpoint seam.
//!
//! [`TokenEndpoint`] is the only piece of I/O the token cache performs. Tests
//! plug in closures; production code uses `ReqwestTokenEndpoint` (feature `http`).

use crate::error::Status;

/// Default OAuth2 refresh endpoint.
pub const GOOGLE_OAUTH_REFRESH_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Raw response from the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status_code: u16,
    pub payload: String,
}

impl HttpResponse {
    pub fn new(status_code: u16, payload: impl Into<String>) -> Self {
        Self {
            status_code,
            payload: payload.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status_code == 200
    }

    /// Converts a non-200 response into a transport status.
    pub fn to_status(&self) -> Status {
        Status::from_http(self.status_code, format!("token endpoint: {}", self.payload.trim()))
    }
}

/// Posts a form-encoded body to an OAuth token endpoint.
///
/// `Err` is reserved for failures where no HTTP response was received
/// (connection reset, timeout); any HTTP status is returned as `Ok`.
pub trait TokenEndpoint: Send + Sync + 'static {
    fn post_form(&self, body: &str) -> Result<HttpResponse, Status>;
}

impl<F> TokenEndpoint for F
where
    F: Fn(&str) -> Result<HttpResponse, Status> + Send + Sync + 'static,
{
    fn post_form(&self, body: &str) -> Result<HttpResponse, Status> {
        self(body)
    }
}

/// Token endpoint backed by a blocking `reqwest` client.
///
/// The blocking client must not be created or used from inside a tokio
/// runtime thread; call it from `spawn_blocking` in async code.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct ReqwestTokenEndpoint {
    client: reqwest::blocking::Client,
    url: String,
}

#[cfg(feature = "http")]
impl ReqwestTokenEndpoint {
    /// Creates an endpoint targeting [`GOOGLE_OAUTH_REFRESH_ENDPOINT`].
    pub fn new() -> Result<Self, Status> {
        Self::with_url(GOOGLE_OAUTH_REFRESH_ENDPOINT)
    }

    pub fn with_url(url: impl Into<String>) -> Result<Self, Status> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| {
                Status::new(
                    crate::error::StatusCode::Internal,
                    format!("failed to create HTTP client: {e}"),
                )
            })?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[cfg(feature = "http")]
impl TokenEndpoint for ReqwestTokenEndpoint {
    fn post_form(&self, body: &str) -> Result<HttpResponse, Status> {
        let resp = self
            .client
            .post(&self.url)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(body.to_owned())
            .send()
            .map_err(|e| Status::unavailable(format!("token request failed: {e}")))?;

        let status_code = resp.status().as_u16();
        let payload = resp
            .text()
            .map_err(|e| Status::unavailable(format!("token response body: {e}")))?;
        Ok(HttpResponse {
            status_code,
            payload,
        })
    }
}
