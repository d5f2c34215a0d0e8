//! Credentials for a user who authorized the application through OAuth2.

use serde::Deserialize;

use crate::config::{Config, ResolvedPolicies};
use crate::credentials::Credentials;
use crate::credentials::endpoint::TokenEndpoint;
use crate::credentials::token_cache::TokenCache;
use crate::error::Error;
use crate::subscribers::SubscriberSet;

/// Fields of an `authorized_user` credentials file.
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct AuthorizedUserInfo {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for AuthorizedUserInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizedUserInfo")
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl AuthorizedUserInfo {
    /// Form-encoded body of the refresh request.
    pub fn refresh_form(&self) -> String {
        format!(
            "grant_type=refresh_token&client_id={}&client_secret={}&refresh_token={}",
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.client_secret),
            urlencoding::encode(&self.refresh_token),
        )
    }
}

/// Exchanges a refresh token for access tokens, caching them until they expire.
#[derive(Debug)]
pub struct AuthorizedUserCredentials<E: TokenEndpoint> {
    cache: TokenCache<E>,
}

impl<E: TokenEndpoint> AuthorizedUserCredentials<E> {
    pub fn new(info: &AuthorizedUserInfo, endpoint: E, config: &Config) -> Self {
        Self {
            cache: TokenCache::new(endpoint, info.refresh_form(), config),
        }
    }

    /// Parses the JSON contents of an `authorized_user` file.
    pub fn from_json(contents: &str, endpoint: E, config: &Config) -> Result<Self, Error> {
        let info: AuthorizedUserInfo = serde_json::from_str(contents)
            .map_err(|e| Error::Credentials(format!("invalid authorized_user credentials: {e}")))?;
        Ok(Self::new(&info, endpoint, config))
    }

    /// Overrides the refresh retry and backoff policies.
    pub fn with_policies(mut self, policies: &ResolvedPolicies) -> Self {
        self.cache = self.cache.with_policies(policies);
        self
    }

    pub fn with_subscribers(mut self, subscribers: SubscriberSet) -> Self {
        self.cache = self.cache.with_subscribers(subscribers);
        self
    }

    pub fn token_cache(&self) -> &TokenCache<E> {
        &self.cache
    }
}

impl<E: TokenEndpoint> Credentials for AuthorizedUserCredentials<E> {
    fn authorization_header(&self) -> Result<String, Error> {
        self.cache.authorization_header()
    }
}
