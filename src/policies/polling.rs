//! # Polling policies for long-running operations.
//!
//! A [`PollingPolicy`] bounds a "is it done yet?" loop: a retry budget caps the
//! number of checks (or their total time) and a backoff spaces them out.
//!
//! Each "still pending" answer is charged against the budget like a transient
//! failure, so a loop that never sees completion always terminates.

use std::fmt::Debug;
use std::time::Duration;

use crate::error::{Status, StatusCode};
use crate::policies::backoff::BackoffPolicy;
use crate::policies::retry::RetryPolicy;

/// Controls how long and how often a long-running operation is polled.
pub trait PollingPolicy: Send + Sync + Debug + 'static {
    /// Returns a fresh copy with budget and backoff reset.
    fn clone_box(&self) -> Box<dyn PollingPolicy>;

    /// Whether a failed check can never succeed on a later poll.
    fn is_permanent_error(&self, status: &Status) -> bool;

    /// Records a failed check; `true` if polling may continue.
    fn on_failure(&mut self, status: &Status) -> bool;

    /// Records a "not done yet" answer; `true` if polling may continue.
    fn on_pending(&mut self) -> bool {
        self.on_failure(&Status::new(StatusCode::Unavailable, "operation still pending"))
    }

    /// Whether the polling budget is consumed.
    fn is_exhausted(&self) -> bool;

    /// Delay before the next check.
    fn wait_period(&mut self) -> Duration;
}

impl Clone for Box<dyn PollingPolicy> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Polling policy composed of any retry and backoff policy.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use cloudretry::{
///     ExponentialBackoffPolicy, GenericPollingPolicy, LimitedErrorCountRetryPolicy, PollingPolicy,
/// };
///
/// let mut p = GenericPollingPolicy::new(
///     LimitedErrorCountRetryPolicy::new(2),
///     ExponentialBackoffPolicy::new(Duration::from_millis(5), Duration::from_millis(50), 2.0),
/// );
/// assert!(p.on_pending());
/// assert_eq!(p.wait_period(), Duration::from_millis(5));
/// assert!(!p.on_pending());
/// ```
#[derive(Debug)]
pub struct GenericPollingPolicy {
    retry: Box<dyn RetryPolicy>,
    backoff: Box<dyn BackoffPolicy>,
}

impl GenericPollingPolicy {
    pub fn new(retry: impl RetryPolicy, backoff: impl BackoffPolicy) -> Self {
        Self {
            retry: Box::new(retry),
            backoff: Box::new(backoff),
        }
    }

    /// Builds a policy from already-boxed prototypes (cloned, not moved).
    pub fn from_boxed(retry: &dyn RetryPolicy, backoff: &dyn BackoffPolicy) -> Self {
        Self {
            retry: retry.clone_box(),
            backoff: backoff.clone_box(),
        }
    }
}

impl PollingPolicy for GenericPollingPolicy {
    fn clone_box(&self) -> Box<dyn PollingPolicy> {
        Box::new(Self::from_boxed(self.retry.as_ref(), self.backoff.as_ref()))
    }

    fn is_permanent_error(&self, status: &Status) -> bool {
        self.retry.is_permanent_failure(status)
    }

    fn on_failure(&mut self, status: &Status) -> bool {
        self.retry.on_failure(status)
    }

    fn is_exhausted(&self) -> bool {
        self.retry.is_exhausted()
    }

    fn wait_period(&mut self) -> Duration {
        self.backoff.on_completion()
    }
}
