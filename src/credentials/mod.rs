//! # Credentials and the shared token cache.
//!
//! Produces the `Authorization` header attached to every outgoing request.
//!
//! ## Contents
//! - [`Credentials`] the header-producing interface
//! - [`AnonymousCredentials`] no header, no network
//! - [`AuthorizedUserCredentials`] refresh-token exchange backed by a [`TokenCache`]
//! - [`CredentialsFile`] JSON credentials files and application-default discovery
//! - [`TokenEndpoint`] the HTTP seam (`ReqwestTokenEndpoint` with feature `http`)
//!
//! ```text
//! GOOGLE_APPLICATION_CREDENTIALS ──► CredentialsFile::read ──► "type"
//!     ├─ authorized_user ──► AuthorizedUserCredentials ──► TokenCache ──► TokenEndpoint
//!     ├─ service_account ──► unsupported (JWT minting)
//!     └─ other           ──► Error::Credentials("Unsupported credential type (...)")
//! ```

mod authorized_user;
mod endpoint;
mod file;
mod token;
mod token_cache;

pub use authorized_user::{AuthorizedUserCredentials, AuthorizedUserInfo};
#[cfg(feature = "http")]
pub use endpoint::ReqwestTokenEndpoint;
pub use endpoint::{GOOGLE_OAUTH_REFRESH_ENDPOINT, HttpResponse, TokenEndpoint};
#[cfg(feature = "http")]
pub use file::google_default_credentials;
pub use file::{
    CredentialsFile, GOOGLE_ADC_ENV_VAR, ServiceAccountInfo, adc_path, credentials_from_file,
    google_default_credentials_with,
};
pub use token::TokenResponse;
pub use token_cache::TokenCache;

use crate::error::Error;

/// Source of the `Authorization` header for outgoing requests.
pub trait Credentials: Send + Sync {
    /// Returns the full header line, e.g. `"Authorization: Bearer ya29..."`.
    ///
    /// May block while a token is refreshed.
    fn authorization_header(&self) -> Result<String, Error>;
}

/// Credentials for unauthenticated access to public resources.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousCredentials;

impl Credentials for AnonymousCredentials {
    fn authorization_header(&self) -> Result<String, Error> {
        Ok(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_has_empty_header() {
        let creds: Box<dyn Credentials> = Box::new(AnonymousCredentials);
        assert_eq!(creds.authorization_header().unwrap(), "");
    }
}
