//! OAuth token response parsing.

use std::time::{Duration, SystemTime};

use serde::Deserialize;

use crate::error::Error;

/// Successful body returned by the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
    pub token_type: String,
    pub access_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
    /// Lifetime in seconds.
    pub expires_in: u64,
}

impl TokenResponse {
    /// Parses a token endpoint body. Malformed bodies are credential errors.
    pub fn parse(payload: &str) -> Result<Self, Error> {
        let token: TokenResponse = serde_json::from_str(payload)
            .map_err(|e| Error::Credentials(format!("invalid token response: {e}")))?;
        if token.access_token.is_empty() || token.token_type.is_empty() {
            return Err(Error::Credentials(
                "invalid token response: empty token_type or access_token".into(),
            ));
        }
        Ok(token)
    }

    /// Header line attached to outgoing requests.
    pub fn authorization_header(&self) -> String {
        format!("Authorization: {} {}", self.token_type, self.access_token)
    }

    /// Point after which the token must no longer be used.
    ///
    /// Computed as `now + expires_in - slack`, never earlier than `now`.
    pub fn expiration(&self, now: SystemTime, slack: Duration) -> SystemTime {
        let lifetime = Duration::from_secs(self.expires_in).saturating_sub(slack);
        now.checked_add(lifetime).unwrap_or(now)
    }
}
