//! # Default policies and per-call overrides.
//!
//! Provides [`Config`], the centralized defaults, and [`Policies`], the
//! override set callers pass to executors and credentials.
//!
//! Config is used in two ways:
//! 1. **Defaults**: `Config::default()` reproduces the library defaults
//!    (15 min retry period, 10 ms → 5 min backoff doubling each time).
//! 2. **Resolution**: `Policies::resolve(&config)` fills every category the
//!    caller did not override.
//!
//! ## Override rules
//! ```text
//! Policies::new()
//!     .with_retry(LimitedErrorCountRetryPolicy::new(3))   // ignored: replaced below
//!     .with_backoff(ExponentialBackoffPolicy::new(..))
//!     .with_retry(LimitedTimeRetryPolicy::new(60s))       // last one wins
//! ```
//! At most one policy per category is honored; unset categories come from [`Config`].
//!
//! ## Sentinel values
//! - `polling_period = 0s` → polling shares `retry_period`
//! - `token_expiration_slack = 0s` → use tokens until their exact expiry

use std::time::Duration;

use crate::policies::{
    BackoffPolicy, ExponentialBackoffPolicy, GenericPollingPolicy, LimitedTimeRetryPolicy,
    PollingPolicy, RetryPolicy,
};

/// Library-wide defaults.
///
/// ## Field semantics
/// - `retry_period`: budget of the default `LimitedTimeRetryPolicy`
/// - `initial_backoff` / `maximum_backoff` / `backoff_scaling`: default `ExponentialBackoffPolicy`
/// - `polling_period`: budget of the default polling policy (`0s` = same as `retry_period`)
/// - `token_expiration_slack`: subtracted from every token lifetime
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum time spent retrying one logical operation.
    pub retry_period: Duration,

    /// First backoff delay.
    pub initial_backoff: Duration,

    /// Backoff delay cap.
    pub maximum_backoff: Duration,

    /// Backoff growth factor (values below 1.0 are raised to 1.0).
    pub backoff_scaling: f64,

    /// Maximum time spent polling one long-running operation.
    ///
    /// - `Duration::ZERO` = reuse `retry_period`
    pub polling_period: Duration,

    /// Safety margin so a token is never used right before it expires.
    pub token_expiration_slack: Duration,
}

impl Config {
    /// Returns the effective polling budget.
    #[inline]
    pub fn effective_polling_period(&self) -> Duration {
        if self.polling_period == Duration::ZERO {
            self.retry_period
        } else {
            self.polling_period
        }
    }

    /// Default retry policy prototype.
    pub fn retry_policy(&self) -> Box<dyn RetryPolicy> {
        Box::new(LimitedTimeRetryPolicy::new(self.retry_period))
    }

    /// Default backoff policy prototype.
    pub fn backoff_policy(&self) -> Box<dyn BackoffPolicy> {
        Box::new(self.exponential_backoff())
    }

    /// Default polling policy prototype.
    pub fn polling_policy(&self) -> Box<dyn PollingPolicy> {
        Box::new(GenericPollingPolicy::new(
            LimitedTimeRetryPolicy::new(self.effective_polling_period()),
            self.exponential_backoff(),
        ))
    }

    fn exponential_backoff(&self) -> ExponentialBackoffPolicy {
        ExponentialBackoffPolicy::new(self.initial_backoff, self.maximum_backoff, self.backoff_scaling)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `retry_period = 15min`
    /// - `initial_backoff = 10ms`, `maximum_backoff = 5min`, `backoff_scaling = 2.0`
    /// - `polling_period = 0s` (same as `retry_period`)
    /// - `token_expiration_slack = 500s`
    fn default() -> Self {
        Self {
            retry_period: Duration::from_secs(15 * 60),
            initial_backoff: Duration::from_millis(10),
            maximum_backoff: Duration::from_secs(5 * 60),
            backoff_scaling: 2.0,
            polling_period: Duration::ZERO,
            token_expiration_slack: Duration::from_secs(500),
        }
    }
}

/// One policy override, tagged by category.
#[derive(Clone, Debug)]
pub enum PolicyOverride {
    Retry(Box<dyn RetryPolicy>),
    Backoff(Box<dyn BackoffPolicy>),
    Polling(Box<dyn PollingPolicy>),
}

/// Per-call policy overrides; at most one per category.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use cloudretry::{Config, LimitedErrorCountRetryPolicy, Policies, RetryPolicy};
///
/// let resolved = Policies::new()
///     .with_retry(LimitedErrorCountRetryPolicy::new(3))
///     .resolve(&Config::default());
/// assert!(!resolved.retry.is_exhausted());
/// ```
#[derive(Clone, Debug, Default)]
pub struct Policies {
    retry: Option<Box<dyn RetryPolicy>>,
    backoff: Option<Box<dyn BackoffPolicy>>,
    polling: Option<Box<dyn PollingPolicy>>,
}

impl Policies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the retry policy (replaces a previous override).
    pub fn with_retry(mut self, policy: impl RetryPolicy) -> Self {
        self.retry = Some(Box::new(policy));
        self
    }

    /// Overrides the backoff policy (replaces a previous override).
    pub fn with_backoff(mut self, policy: impl BackoffPolicy) -> Self {
        self.backoff = Some(Box::new(policy));
        self
    }

    /// Overrides the polling policy (replaces a previous override).
    pub fn with_polling(mut self, policy: impl PollingPolicy) -> Self {
        self.polling = Some(Box::new(policy));
        self
    }

    /// Applies one tagged override; later overrides of the same category win.
    pub fn apply(&mut self, policy: PolicyOverride) {
        match policy {
            PolicyOverride::Retry(p) => self.retry = Some(p),
            PolicyOverride::Backoff(p) => self.backoff = Some(p),
            PolicyOverride::Polling(p) => self.polling = Some(p),
        }
    }

    /// Fills categories without an override from `config`.
    pub fn resolve(&self, config: &Config) -> ResolvedPolicies {
        ResolvedPolicies {
            retry: self
                .retry
                .as_ref()
                .map(|p| p.clone_box())
                .unwrap_or_else(|| config.retry_policy()),
            backoff: self
                .backoff
                .as_ref()
                .map(|p| p.clone_box())
                .unwrap_or_else(|| config.backoff_policy()),
            polling: self
                .polling
                .as_ref()
                .map(|p| p.clone_box())
                .unwrap_or_else(|| config.polling_policy()),
        }
    }
}

impl FromIterator<PolicyOverride> for Policies {
    fn from_iter<I: IntoIterator<Item = PolicyOverride>>(iter: I) -> Self {
        let mut policies = Policies::new();
        for p in iter {
            policies.apply(p);
        }
        policies
    }
}

/// Complete set of policy prototypes; executors clone from these per operation.
#[derive(Clone, Debug)]
pub struct ResolvedPolicies {
    pub retry: Box<dyn RetryPolicy>,
    pub backoff: Box<dyn BackoffPolicy>,
    pub polling: Box<dyn PollingPolicy>,
}

impl Default for ResolvedPolicies {
    fn default() -> Self {
        Policies::new().resolve(&Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Status;
    use crate::policies::LimitedErrorCountRetryPolicy;

    #[test]
    fn defaults_match_library_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.retry_period, Duration::from_secs(900));
        assert_eq!(cfg.effective_polling_period(), Duration::from_secs(900));
        let mut backoff = cfg.backoff_policy();
        assert_eq!(backoff.on_completion(), Duration::from_millis(10));
        assert_eq!(backoff.on_completion(), Duration::from_millis(20));
    }

    #[test]
    fn last_override_wins() {
        let policies: Policies = vec![
            PolicyOverride::Retry(Box::new(LimitedErrorCountRetryPolicy::new(10))),
            PolicyOverride::Backoff(Box::new(ExponentialBackoffPolicy::new(
                Duration::from_millis(1),
                Duration::from_millis(1),
                1.0,
            ))),
            PolicyOverride::Retry(Box::new(LimitedErrorCountRetryPolicy::new(1))),
        ]
        .into_iter()
        .collect();

        let mut resolved = policies.resolve(&Config::default());
        assert!(!resolved.retry.on_failure(&Status::unavailable("x")));
        assert_eq!(resolved.backoff.on_completion(), Duration::from_millis(1));
    }

    #[test]
    fn resolve_clones_prototypes() {
        let policies = Policies::new().with_retry(LimitedErrorCountRetryPolicy::new(1));
        let mut first = policies.resolve(&Config::default());
        assert!(!first.retry.on_failure(&Status::unavailable("x")));
        let second = policies.resolve(&Config::default());
        assert!(!second.retry.is_exhausted());
    }

    #[test]
    fn explicit_polling_period() {
        let cfg = Config {
            polling_period: Duration::from_secs(30),
            ..Config::default()
        };
        assert_eq!(cfg.effective_polling_period(), Duration::from_secs(30));
    }
}
