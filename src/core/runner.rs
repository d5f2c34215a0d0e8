//! # Run a single attempt and report it.
//!
//! Executes one attempt of a transport callable and publishes its lifecycle
//! events to the [`SubscriberSet`].
//!
//! ## Event flow
//! ```text
//! Success:
//!   AttemptStarting → call() → Ok   → AttemptSucceeded
//!
//! Failure:
//!   AttemptStarting → call() → Err  → AttemptFailed
//!                                      ├─ Retry      → BackoffScheduled (published by the loop)
//!                                      ├─ Exhausted  → RetryExhausted
//!                                      └─ Permanent/NotIdempotent → PermanentFailure
//! ```
//!
//! ## Rules
//! - Always publishes **exactly one** of `AttemptSucceeded` / `AttemptFailed` per attempt
//! - A panicking async transport is converted into a permanent [`StatusCode::Unknown`] failure
//! - Derives a **child token** per async attempt; cancelling it never affects the parent

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::core::decision::RetryDecision;
use crate::error::{Status, StatusCode};
use crate::events::{Event, EventKind};
use crate::rpc::Rpc;
use crate::subscribers::SubscriberSet;

/// Runs one synchronous attempt, publishing start and outcome.
pub(crate) fn run_once<T, F>(
    subs: &SubscriberSet,
    name: &str,
    attempt: u32,
    op: &mut F,
) -> Result<T, Status>
where
    F: FnMut(u32) -> Result<T, Status>,
{
    publish_starting(subs, name, attempt);
    let res = op(attempt);
    publish_outcome(subs, name, attempt, &res);
    res
}

/// Runs one asynchronous attempt of `rpc` under a child of `parent`.
pub(crate) async fn run_once_async<R: Rpc + ?Sized>(
    rpc: &R,
    request: R::Request,
    parent: &CancellationToken,
    attempt: u32,
    subs: &SubscriberSet,
) -> Result<R::Response, Status> {
    let child = parent.child_token();
    publish_starting(subs, rpc.name(), attempt);

    let res = match AssertUnwindSafe(rpc.call(request, child.clone()))
        .catch_unwind()
        .await
    {
        Ok(r) => r,
        Err(_panic) => Err(Status::new(StatusCode::Unknown, "transport panicked")),
    };
    child.cancel();

    publish_outcome(subs, rpc.name(), attempt, &res);
    res
}

fn publish_starting(subs: &SubscriberSet, name: &str, attempt: u32) {
    subs.emit(
        &Event::new(EventKind::AttemptStarting)
            .with_operation(name)
            .with_attempt(attempt),
    );
}

fn publish_outcome<T>(subs: &SubscriberSet, name: &str, attempt: u32, res: &Result<T, Status>) {
    let ev = match res {
        Ok(_) => Event::new(EventKind::AttemptSucceeded),
        Err(st) => Event::new(EventKind::AttemptFailed)
            .with_code(st.code())
            .with_reason(st.to_string()),
    };
    subs.emit(&ev.with_operation(name).with_attempt(attempt));
}

/// Publishes `BackoffScheduled` before a retry sleep.
pub(crate) fn publish_backoff(
    subs: &SubscriberSet,
    name: &str,
    attempt: u32,
    delay: Duration,
    last: &Status,
) {
    subs.emit(
        &Event::new(EventKind::BackoffScheduled)
            .with_operation(name)
            .with_attempt(attempt)
            .with_delay(delay)
            .with_reason(last.to_string()),
    );
}

/// Publishes the terminal event for a non-retry decision.
pub(crate) fn publish_terminal(
    subs: &SubscriberSet,
    name: &str,
    attempt: u32,
    decision: RetryDecision,
    last: &Status,
) {
    let kind = match decision {
        RetryDecision::Retry => return,
        RetryDecision::Exhausted => EventKind::RetryExhausted,
        RetryDecision::Permanent | RetryDecision::NotIdempotent => EventKind::PermanentFailure,
    };
    subs.emit(
        &Event::new(kind)
            .with_operation(name)
            .with_attempt(attempt)
            .with_code(last.code())
            .with_reason(last.to_string()),
    );
}

/// Publishes `OperationCancelled`.
pub(crate) fn publish_cancelled(subs: &SubscriberSet, name: &str, attempt: u32) {
    subs.emit(
        &Event::new(EventKind::OperationCancelled)
            .with_operation(name)
            .with_attempt(attempt),
    );
}
