//! Credentials files and application-default discovery.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::Config;
use crate::credentials::Credentials;
use crate::credentials::authorized_user::{AuthorizedUserCredentials, AuthorizedUserInfo};
use crate::credentials::endpoint::TokenEndpoint;
use crate::error::Error;

/// Environment variable naming the application-default credentials file.
pub const GOOGLE_ADC_ENV_VAR: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Fields of a `service_account` credentials file.
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct ServiceAccountInfo {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl std::fmt::Debug for ServiceAccountInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountInfo")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

/// A parsed credentials file, selected by its `type` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialsFile {
    AuthorizedUser(AuthorizedUserInfo),
    ServiceAccount(ServiceAccountInfo),
}

impl CredentialsFile {
    /// Parses file contents; `source` names the origin in error messages.
    pub fn parse(contents: &str, source: &str) -> Result<Self, Error> {
        let json: serde_json::Value = serde_json::from_str(contents).map_err(|e| {
            Error::Credentials(format!("Invalid contents in credentials file {source}: {e}"))
        })?;
        let kind = json
            .get("type")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("no type given")
            .to_string();

        let invalid = |e: serde_json::Error| {
            Error::Credentials(format!("Invalid {kind} credentials in {source}: {e}"))
        };
        match kind.as_str() {
            "authorized_user" => serde_json::from_value(json)
                .map(CredentialsFile::AuthorizedUser)
                .map_err(invalid),
            "service_account" => serde_json::from_value(json)
                .map(CredentialsFile::ServiceAccount)
                .map_err(invalid),
            other => Err(Error::Credentials(format!(
                "Unsupported credential type ({other}) when reading credentials from {source}."
            ))),
        }
    }

    pub fn read(path: &Path) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Credentials(format!(
                "Cannot open credentials file {}: {e}",
                path.display()
            ))
        })?;
        Self::parse(&contents, &path.display().to_string())
    }

    /// Builds credentials that refresh through `endpoint`.
    pub fn into_credentials<E: TokenEndpoint>(
        self,
        endpoint: E,
        config: &Config,
    ) -> Result<Box<dyn Credentials>, Error> {
        match self {
            CredentialsFile::AuthorizedUser(info) => Ok(Box::new(
                AuthorizedUserCredentials::new(&info, endpoint, config),
            )),
            CredentialsFile::ServiceAccount(info) => Err(Error::Credentials(format!(
                "service account credentials ({}) require signed JWT token minting, which is not supported",
                info.client_email
            ))),
        }
    }
}

/// Loads credentials from a JSON file.
pub fn credentials_from_file<E: TokenEndpoint>(
    path: &Path,
    endpoint: E,
    config: &Config,
) -> Result<Box<dyn Credentials>, Error> {
    CredentialsFile::read(path)?.into_credentials(endpoint, config)
}

/// Resolves the application-default credentials path from the env var value.
pub fn adc_path(var: Option<OsString>) -> Option<PathBuf> {
    var.filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// Loads the application-default credentials named by
/// [`GOOGLE_APPLICATION_CREDENTIALS`](GOOGLE_ADC_ENV_VAR).
pub fn google_default_credentials_with<E: TokenEndpoint>(
    endpoint: E,
    config: &Config,
) -> Result<Box<dyn Credentials>, Error> {
    match adc_path(std::env::var_os(GOOGLE_ADC_ENV_VAR)) {
        Some(path) => credentials_from_file(&path, endpoint, config),
        None => Err(Error::Credentials(
            "No eligible credential types were found to use as default credentials.".into(),
        )),
    }
}

/// Loads the application-default credentials, refreshing over HTTPS.
#[cfg(feature = "http")]
pub fn google_default_credentials() -> Result<Box<dyn Credentials>, Error> {
    let endpoint = crate::credentials::endpoint::ReqwestTokenEndpoint::new()
        .map_err(|st| Error::Credentials(st.to_string()))?;
    google_default_credentials_with(endpoint, &Config::default())
}
