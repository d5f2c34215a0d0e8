//! # RetryExecutor: blocking retry loop.
//!
//! Executes one logical operation against a synchronous transport callable,
//! retrying per [`RetryPolicy`] and sleeping per [`BackoffPolicy`].
//!
//! ## Architecture
//! ```text
//! call(name, idempotent, op)
//!   ├─► clone retry + backoff prototypes (operation-local state)
//!   loop {
//!     ├─► attempt += 1
//!     ├─► run_once(op) ──► Ok ──► return
//!     └─► Err(status) ──► decide(idempotent, retry, status)
//!           ├─ Permanent      → Err(Permanent)
//!           ├─ NotIdempotent  → Err(NotIdempotent)
//!           ├─ Exhausted      → Err(RetryExhausted)
//!           └─ Retry          → sleep(backoff.on_completion()) → continue
//!   }
//! ```
//!
//! ## Rules
//! - Attempts run **sequentially** on the calling thread; no threads are spawned
//! - Concurrent `call`s on one executor never share policy state
//! - The calling thread blocks for the cumulative backoff

use std::time::Duration;

use crate::config::ResolvedPolicies;
use crate::core::decision::decide;
use crate::core::runner::{publish_backoff, publish_terminal, run_once};
use crate::error::{Error, Status};
use crate::policies::{BackoffPolicy, RetryPolicy};
use crate::subscribers::SubscriberSet;

/// Blocking retry loop over a transport callable.
///
/// The executor holds policy **prototypes**; it is cheap to share by reference
/// across threads and every call works on its own clones.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use cloudretry::{
///     ExponentialBackoffPolicy, LimitedErrorCountRetryPolicy, RetryExecutor, Status,
/// };
///
/// let exec = RetryExecutor::new(
///     LimitedErrorCountRetryPolicy::new(3),
///     ExponentialBackoffPolicy::new(Duration::from_millis(1), Duration::from_millis(2), 2.0),
/// );
///
/// let res = exec.call("GetObject", true, |attempt| {
///     if attempt < 2 { Err(Status::unavailable("reset")) } else { Ok("payload") }
/// });
/// assert_eq!(res.unwrap(), "payload");
/// ```
#[derive(Clone, Debug)]
pub struct RetryExecutor {
    retry: Box<dyn RetryPolicy>,
    backoff: Box<dyn BackoffPolicy>,
    subscribers: SubscriberSet,
}

impl RetryExecutor {
    /// Creates an executor from explicit policy prototypes.
    pub fn new(retry: impl RetryPolicy, backoff: impl BackoffPolicy) -> Self {
        Self {
            retry: Box::new(retry),
            backoff: Box::new(backoff),
            subscribers: SubscriberSet::default(),
        }
    }

    /// Creates an executor from resolved policies (retry + backoff are used).
    pub fn from_policies(policies: &ResolvedPolicies) -> Self {
        Self {
            retry: policies.retry.clone_box(),
            backoff: policies.backoff.clone_box(),
            subscribers: SubscriberSet::default(),
        }
    }

    /// Attaches the event sink.
    pub fn with_subscribers(mut self, subscribers: SubscriberSet) -> Self {
        self.subscribers = subscribers;
        self
    }

    pub fn subscribers(&self) -> &SubscriberSet {
        &self.subscribers
    }

    /// Runs `op` until it succeeds or the policies stop it.
    ///
    /// `op` receives the 1-based attempt number.
    ///
    /// ### Errors
    /// - [`Error::Permanent`] the last status was not retryable
    /// - [`Error::NotIdempotent`] the single attempt of a non-idempotent call failed
    /// - [`Error::RetryExhausted`] the retry budget ran out
    pub fn call<T, F>(&self, name: &str, idempotent: bool, mut op: F) -> Result<T, Error>
    where
        F: FnMut(u32) -> Result<T, Status>,
    {
        let mut retry = self.retry.clone_box();
        let mut backoff = self.backoff.clone_box();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let status = match run_once(&self.subscribers, name, attempt, &mut op) {
                Ok(v) => return Ok(v),
                Err(st) => st,
            };

            let decision = decide(idempotent, retry.as_mut(), &status);
            if let Some(err) = decision.into_error(status.clone(), attempt) {
                publish_terminal(&self.subscribers, name, attempt, decision, &status);
                return Err(err);
            }

            let delay = backoff.on_completion();
            publish_backoff(&self.subscribers, name, attempt, delay, &status);
            sleep(delay);
        }
    }
}

fn sleep(delay: Duration) {
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StatusCode;
    use crate::events::{Event, EventKind};
    use crate::policies::{ExponentialBackoffPolicy, LimitedErrorCountRetryPolicy, LimitedTimeRetryPolicy};
    use crate::subscribers::Subscribe;
    use std::sync::{Arc, Mutex};

    fn fast_backoff() -> ExponentialBackoffPolicy {
        ExponentialBackoffPolicy::new(Duration::from_millis(1), Duration::from_millis(2), 2.0)
    }

    #[derive(Default)]
    struct Kinds(Mutex<Vec<EventKind>>);

    impl Subscribe for Kinds {
        fn on_event(&self, event: &Event) {
            self.0.lock().unwrap().push(event.kind);
        }
    }

    #[test]
    fn exactly_n_attempts_then_exhausted() {
        for n in [1u32, 2, 5] {
            let exec = RetryExecutor::new(LimitedErrorCountRetryPolicy::new(n), fast_backoff());
            let mut calls = 0;
            let err = exec
                .call("op", true, |_| -> Result<(), Status> {
                    calls += 1;
                    Err(Status::unavailable("reset"))
                })
                .unwrap_err();
            assert_eq!(calls, n);
            assert!(matches!(err, Error::RetryExhausted { attempts, .. } if attempts == n));
        }
    }

    #[test]
    fn permanent_error_stops_on_that_attempt() {
        let exec = RetryExecutor::new(LimitedErrorCountRetryPolicy::new(10), fast_backoff());
        let mut calls = 0;
        let err = exec
            .call("op", true, |attempt| -> Result<(), Status> {
                calls += 1;
                if attempt < 3 {
                    Err(Status::unavailable("reset"))
                } else {
                    Err(Status::new(StatusCode::PermissionDenied, "denied"))
                }
            })
            .unwrap_err();
        assert_eq!(calls, 3);
        assert_eq!(err.as_label(), "permanent");
        assert_eq!(err.attempts(), 3);
    }

    #[test]
    fn non_idempotent_gets_one_attempt() {
        let exec = RetryExecutor::new(LimitedErrorCountRetryPolicy::new(10), fast_backoff());
        let mut calls = 0;
        let err = exec
            .call("InsertObject", false, |_| -> Result<(), Status> {
                calls += 1;
                Err(Status::unavailable("response lost"))
            })
            .unwrap_err();
        assert_eq!(calls, 1);
        assert!(matches!(err, Error::NotIdempotent { .. }));
    }

    #[test]
    fn success_after_transient_failures() {
        let exec = RetryExecutor::new(LimitedErrorCountRetryPolicy::new(5), fast_backoff());
        let v = exec
            .call("op", true, |attempt| {
                if attempt <= 2 {
                    Err(Status::from_http(503, "busy"))
                } else {
                    Ok(attempt)
                }
            })
            .unwrap();
        assert_eq!(v, 3);
    }

    #[test]
    fn time_bounded_policy_stops() {
        let exec = RetryExecutor::new(
            LimitedTimeRetryPolicy::new(Duration::from_millis(30)),
            ExponentialBackoffPolicy::new(Duration::from_millis(5), Duration::from_millis(5), 1.0),
        );
        let err = exec
            .call("op", true, |_| -> Result<(), Status> { Err(Status::unavailable("x")) })
            .unwrap_err();
        assert!(matches!(err, Error::RetryExhausted { .. }));
        assert!(err.attempts() >= 2);
    }

    #[test]
    fn each_call_gets_fresh_policies() {
        let exec = RetryExecutor::new(LimitedErrorCountRetryPolicy::new(2), fast_backoff());
        for _ in 0..3 {
            let mut calls = 0;
            let _ = exec.call("op", true, |_| -> Result<(), Status> {
                calls += 1;
                Err(Status::unavailable("x"))
            });
            assert_eq!(calls, 2);
        }
    }

    #[test]
    fn publishes_attempt_and_backoff_events() {
        let kinds = Arc::new(Kinds::default());
        let exec = RetryExecutor::new(LimitedErrorCountRetryPolicy::new(2), fast_backoff())
            .with_subscribers(SubscriberSet::new(vec![kinds.clone()]));
        let _ = exec.call("op", true, |_| -> Result<(), Status> { Err(Status::unavailable("x")) });
        assert_eq!(
            *kinds.0.lock().unwrap(),
            vec![
                EventKind::AttemptStarting,
                EventKind::AttemptFailed,
                EventKind::BackoffScheduled,
                EventKind::AttemptStarting,
                EventKind::AttemptFailed,
                EventKind::RetryExhausted,
            ]
        );
    }
}
