//! # Retry policies: when to give up.
//!
//! A [`RetryPolicy`] answers two questions after a failed attempt:
//! - is this error worth retrying at all ([`is_permanent_failure`](RetryPolicy::is_permanent_failure)),
//! - is there budget left ([`on_failure`](RetryPolicy::on_failure) / [`is_exhausted`](RetryPolicy::is_exhausted)).
//!
//! Two budgets are provided:
//! - [`LimitedErrorCountRetryPolicy`] bounds the number of attempts;
//! - [`LimitedTimeRetryPolicy`] bounds the time since the policy was cloned.
//!
//! ## Rules
//! - Permanent errors are rejected **before** any budget accounting.
//! - Policies are prototypes: executors call `clone_box()` per logical
//!   operation, and only the clone is ever mutated.

use std::fmt::Debug;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::Status;

/// Decides whether a failed attempt may be retried.
pub trait RetryPolicy: Send + Sync + Debug + 'static {
    /// Returns a fresh copy with its budget reset.
    fn clone_box(&self) -> Box<dyn RetryPolicy>;

    /// Records a failure and returns `true` if the caller should try again.
    ///
    /// Returns `false` immediately for permanent errors, without consuming budget.
    fn on_failure(&mut self, status: &Status) -> bool;

    /// Whether the budget is already consumed.
    fn is_exhausted(&self) -> bool;

    /// Whether `status` can never be fixed by retrying.
    fn is_permanent_failure(&self, status: &Status) -> bool {
        !status.is_transient()
    }
}

impl Clone for Box<dyn RetryPolicy> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Gives up after a fixed number of attempts.
///
/// `LimitedErrorCountRetryPolicy::new(n)` allows exactly `n` attempts when
/// every attempt fails with a transient error: the n-th failure returns
/// `false` from [`on_failure`](RetryPolicy::on_failure).
///
/// # Example
/// ```
/// use cloudretry::{LimitedErrorCountRetryPolicy, RetryPolicy, Status};
///
/// let mut p = LimitedErrorCountRetryPolicy::new(3);
/// let st = Status::unavailable("try again");
/// assert!(p.on_failure(&st));
/// assert!(p.on_failure(&st));
/// assert!(!p.on_failure(&st));
/// assert!(p.is_exhausted());
/// ```
#[derive(Clone, Copy, Debug)]
pub struct LimitedErrorCountRetryPolicy {
    maximum_attempts: u32,
    failures: u32,
}

impl LimitedErrorCountRetryPolicy {
    /// Creates a policy allowing up to `maximum_attempts` attempts.
    ///
    /// A value of `0` behaves like `1`: the first attempt is always made.
    pub fn new(maximum_attempts: u32) -> Self {
        Self {
            maximum_attempts: maximum_attempts.max(1),
            failures: 0,
        }
    }

    pub fn maximum_attempts(&self) -> u32 {
        self.maximum_attempts
    }
}

impl RetryPolicy for LimitedErrorCountRetryPolicy {
    fn clone_box(&self) -> Box<dyn RetryPolicy> {
        Box::new(Self::new(self.maximum_attempts))
    }

    fn on_failure(&mut self, status: &Status) -> bool {
        if self.is_permanent_failure(status) {
            return false;
        }
        self.failures = self.failures.saturating_add(1);
        !self.is_exhausted()
    }

    fn is_exhausted(&self) -> bool {
        self.failures >= self.maximum_attempts
    }
}

/// Gives up once a wall-clock budget has elapsed.
///
/// The deadline starts when the policy is created or cloned; executors clone
/// right before the first attempt, so the budget covers the whole operation
/// including backoff sleeps.
#[derive(Clone, Copy, Debug)]
pub struct LimitedTimeRetryPolicy {
    maximum_duration: Duration,
    deadline: Instant,
}

impl LimitedTimeRetryPolicy {
    pub fn new(maximum_duration: Duration) -> Self {
        Self {
            maximum_duration,
            deadline: deadline_after(maximum_duration),
        }
    }

    pub fn maximum_duration(&self) -> Duration {
        self.maximum_duration
    }

    /// Time left before the budget is consumed.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

fn deadline_after(d: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(d)
        .unwrap_or_else(|| now + Duration::from_secs(86400 * 365 * 30))
}

impl RetryPolicy for LimitedTimeRetryPolicy {
    fn clone_box(&self) -> Box<dyn RetryPolicy> {
        Box::new(Self::new(self.maximum_duration))
    }

    fn on_failure(&mut self, status: &Status) -> bool {
        if self.is_permanent_failure(status) {
            return false;
        }
        !self.is_exhausted()
    }

    fn is_exhausted(&self) -> bool {
        Instant::now() >= self.deadline
    }
}
