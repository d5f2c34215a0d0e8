//! # Retry decision shared by every loop.
//!
//! The synchronous executor, the asynchronous actor, the pollers and the token
//! cache all ask the same question after a failure. This module answers it as
//! a pure function of (idempotency, policy state, status); only the way each
//! loop waits differs.
//!
//! ## Decision table
//! ```text
//! status permanent?          ──yes──► Permanent
//!   └─no─► idempotent?       ──no───► NotIdempotent
//!            └─yes─► policy.on_failure(status)
//!                      ├─ true  ──► Retry
//!                      └─ false ──► Exhausted
//! ```

use crate::error::{Error, Status};
use crate::policies::{PollingPolicy, RetryPolicy};

/// What a loop should do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Back off and try again.
    Retry,
    /// The error can never be fixed by retrying.
    Permanent,
    /// The operation is not idempotent; report the first failure as-is.
    NotIdempotent,
    /// Budget consumed while only transient errors were seen.
    Exhausted,
}

impl RetryDecision {
    /// Converts a terminal decision into the error reported to the caller.
    ///
    /// Returns `None` for [`RetryDecision::Retry`].
    pub fn into_error(self, status: Status, attempts: u32) -> Option<Error> {
        match self {
            RetryDecision::Retry => None,
            RetryDecision::Permanent => Some(Error::Permanent { status, attempts }),
            RetryDecision::NotIdempotent => Some(Error::NotIdempotent { status }),
            RetryDecision::Exhausted => Some(Error::RetryExhausted {
                last: status,
                attempts,
            }),
        }
    }
}

/// Decides the next step after a failed attempt of a regular call.
///
/// The permanent-error check happens before idempotency and budget accounting,
/// so a permanent error never consumes budget.
pub fn decide(idempotent: bool, policy: &mut dyn RetryPolicy, status: &Status) -> RetryDecision {
    if policy.is_permanent_failure(status) {
        return RetryDecision::Permanent;
    }
    if !idempotent {
        return RetryDecision::NotIdempotent;
    }
    if policy.on_failure(status) {
        RetryDecision::Retry
    } else {
        RetryDecision::Exhausted
    }
}

/// Decides the next step after a failed check of a long-running operation.
///
/// Checks are reads, so they are always treated as idempotent.
pub fn decide_poll(policy: &mut dyn PollingPolicy, status: &Status) -> RetryDecision {
    if policy.is_permanent_error(status) {
        return RetryDecision::Permanent;
    }
    if policy.on_failure(status) {
        RetryDecision::Retry
    } else {
        RetryDecision::Exhausted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StatusCode;
    use crate::policies::{ExponentialBackoffPolicy, GenericPollingPolicy, LimitedErrorCountRetryPolicy};
    use std::time::Duration;

    #[test]
    fn permanent_beats_everything() {
        let mut p = LimitedErrorCountRetryPolicy::new(10);
        let st = Status::new(StatusCode::NotFound, "missing");
        assert_eq!(decide(true, &mut p, &st), RetryDecision::Permanent);
        assert_eq!(decide(false, &mut p, &st), RetryDecision::Permanent);
        assert!(!p.is_exhausted());
    }

    #[test]
    fn non_idempotent_never_retries() {
        let mut p = LimitedErrorCountRetryPolicy::new(10);
        let st = Status::unavailable("lost response");
        assert_eq!(decide(false, &mut p, &st), RetryDecision::NotIdempotent);
    }

    #[test]
    fn idempotent_retries_until_exhausted() {
        let mut p = LimitedErrorCountRetryPolicy::new(2);
        let st = Status::unavailable("reset");
        assert_eq!(decide(true, &mut p, &st), RetryDecision::Retry);
        assert_eq!(decide(true, &mut p, &st), RetryDecision::Exhausted);
    }

    #[test]
    fn into_error_maps_terminal_decisions() {
        let st = Status::unavailable("reset");
        assert!(RetryDecision::Retry.into_error(st.clone(), 1).is_none());
        assert_eq!(
            RetryDecision::Exhausted.into_error(st.clone(), 3),
            Some(Error::RetryExhausted { last: st.clone(), attempts: 3 })
        );
        assert_eq!(
            RetryDecision::NotIdempotent.into_error(st.clone(), 1),
            Some(Error::NotIdempotent { status: st })
        );
    }

    #[test]
    fn poll_decisions() {
        let mut p = GenericPollingPolicy::new(
            LimitedErrorCountRetryPolicy::new(2),
            ExponentialBackoffPolicy::new(Duration::from_millis(1), Duration::from_millis(1), 1.0),
        );
        assert_eq!(
            decide_poll(&mut p, &Status::from_http(403, "denied")),
            RetryDecision::Permanent
        );
        assert_eq!(decide_poll(&mut p, &Status::unavailable("x")), RetryDecision::Retry);
        assert_eq!(decide_poll(&mut p, &Status::unavailable("x")), RetryDecision::Exhausted);
    }
}
