//! # Long-running operation polling.
//!
//! Repeatedly checks whether a server-side operation has completed, spacing
//! checks per the polling backoff and bounding them per the polling budget.
//!
//! ## Architecture
//! ```text
//! poll_until / AsyncPoller::poll
//!   ├─► clone polling prototype (operation-local state)
//!   loop {
//!     ├─► attempt += 1 → check(attempt)
//!     │     ├─ Ok(Some(v)) ──► PollCompleted ──► return Ok(v)
//!     │     ├─ Ok(None)    ──► policy.on_pending()
//!     │     │                    └─ false ──► PollDeadlineExceeded → Err(DeadlineExceeded)
//!     │     └─ Err(status) ──► decide_poll(policy, status)
//!     │                          ├─ Permanent ──► Err(Permanent)
//!     │                          └─ Exhausted ──► PollDeadlineExceeded → Err(DeadlineExceeded)
//!     └─► PollPending(delay) → sleep(policy.wait_period())
//!   }
//! ```
//!
//! ## Rules
//! - A check that never reports completion always terminates once the budget is spent
//! - A "pending" answer and a transient failure are charged the same way
//! - Checks are reads and are always treated as idempotent

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::config::ResolvedPolicies;
use crate::core::decision::{RetryDecision, decide_poll};
use crate::error::{Error, Status};
use crate::events::{Event, EventKind};
use crate::policies::PollingPolicy;
use crate::subscribers::SubscriberSet;

/// Outcome of one check, as seen by the loop.
enum Step<T> {
    Done(T),
    Wait(Duration),
}

/// Operation-local polling state shared by the sync and async loops.
struct PollState<'a> {
    name: &'a str,
    policy: Box<dyn PollingPolicy>,
    subs: &'a SubscriberSet,
    attempt: u32,
}

impl<'a> PollState<'a> {
    fn new(name: &'a str, policy: &dyn PollingPolicy, subs: &'a SubscriberSet) -> Self {
        Self {
            name,
            policy: policy.clone_box(),
            subs,
            attempt: 0,
        }
    }

    fn next_attempt(&mut self) -> u32 {
        self.attempt += 1;
        self.attempt
    }

    fn on_result<T>(&mut self, res: Result<Option<T>, Status>) -> Result<Step<T>, Error> {
        match res {
            Ok(Some(v)) => {
                self.emit(Event::new(EventKind::PollCompleted));
                return Ok(Step::Done(v));
            }
            Ok(None) => {
                if !self.policy.on_pending() {
                    return Err(self.deadline_exceeded(None));
                }
            }
            Err(status) => match decide_poll(self.policy.as_mut(), &status) {
                RetryDecision::Permanent | RetryDecision::NotIdempotent => {
                    self.emit(
                        Event::new(EventKind::PermanentFailure)
                            .with_code(status.code())
                            .with_reason(status.to_string()),
                    );
                    return Err(Error::Permanent {
                        status,
                        attempts: self.attempt,
                    });
                }
                RetryDecision::Exhausted => return Err(self.deadline_exceeded(Some(status))),
                RetryDecision::Retry => {}
            },
        }

        let delay = self.policy.wait_period();
        self.emit(Event::new(EventKind::PollPending).with_delay(delay));
        Ok(Step::Wait(delay))
    }

    fn deadline_exceeded(&self, last: Option<Status>) -> Error {
        let mut ev = Event::new(EventKind::PollDeadlineExceeded);
        if let Some(st) = &last {
            ev = ev.with_code(st.code()).with_reason(st.to_string());
        }
        self.emit(ev);
        Error::DeadlineExceeded {
            attempts: self.attempt,
            last,
        }
    }

    fn emit(&self, ev: Event) {
        self.subs
            .emit(&ev.with_operation(self.name).with_attempt(self.attempt));
    }
}

/// Blocks the calling thread until `check` reports completion or the policy gives up.
///
/// `check` receives the 1-based check number and returns `Ok(Some(result))` when
/// the operation is done, `Ok(None)` while it is still pending.
///
/// ### Errors
/// - [`Error::Permanent`] a check failed with a permanent status
/// - [`Error::DeadlineExceeded`] the polling budget ran out
///
/// # Example
/// ```
/// use std::time::Duration;
/// use cloudretry::{
///     poll_until, ExponentialBackoffPolicy, GenericPollingPolicy, LimitedErrorCountRetryPolicy,
///     SubscriberSet,
/// };
///
/// let policy = GenericPollingPolicy::new(
///     LimitedErrorCountRetryPolicy::new(10),
///     ExponentialBackoffPolicy::new(Duration::from_millis(1), Duration::from_millis(2), 2.0),
/// );
/// let done = poll_until("CreateTable", &policy, &SubscriberSet::default(), |n| {
///     Ok(if n == 3 { Some("table") } else { None })
/// });
/// assert_eq!(done.unwrap(), "table");
/// ```
pub fn poll_until<T, F>(
    name: &str,
    policy: &dyn PollingPolicy,
    subs: &SubscriberSet,
    mut check: F,
) -> Result<T, Error>
where
    F: FnMut(u32) -> Result<Option<T>, Status>,
{
    let mut state = PollState::new(name, policy, subs);
    loop {
        let attempt = state.next_attempt();
        match state.on_result(check(attempt))? {
            Step::Done(v) => return Ok(v),
            Step::Wait(delay) if !delay.is_zero() => std::thread::sleep(delay),
            Step::Wait(_) => {}
        }
    }
}

/// Blocks until a consistency check reports `true`.
///
/// Thin wrapper over [`poll_until`] for checks that only answer "consistent yet?".
pub fn wait_for_consistency<F>(
    name: &str,
    policy: &dyn PollingPolicy,
    subs: &SubscriberSet,
    mut check: F,
) -> Result<(), Error>
where
    F: FnMut(u32) -> Result<bool, Status>,
{
    poll_until(name, policy, subs, |attempt| {
        check(attempt).map(|consistent| consistent.then_some(()))
    })
}

/// Asynchronous polling loop driven by tokio timers.
///
/// Holds a polling prototype; every [`poll`](AsyncPoller::poll) works on its own clone,
/// so one poller can serve many concurrent operations.
#[derive(Clone, Debug)]
pub struct AsyncPoller {
    name: Arc<str>,
    policy: Box<dyn PollingPolicy>,
    subscribers: SubscriberSet,
}

impl AsyncPoller {
    pub fn new(name: impl Into<Arc<str>>, policy: impl PollingPolicy) -> Self {
        Self {
            name: name.into(),
            policy: Box::new(policy),
            subscribers: SubscriberSet::default(),
        }
    }

    /// Creates a poller from resolved policies (the polling prototype is used).
    pub fn from_policies(name: impl Into<Arc<str>>, policies: &ResolvedPolicies) -> Self {
        Self {
            name: name.into(),
            policy: policies.polling.clone_box(),
            subscribers: SubscriberSet::default(),
        }
    }

    /// Attaches the event sink.
    pub fn with_subscribers(mut self, subscribers: SubscriberSet) -> Self {
        self.subscribers = subscribers;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Polls until `check` reports completion, the budget runs out, or `token` is cancelled.
    ///
    /// ### Errors
    /// Same as [`poll_until`], plus [`Error::Cancelled`].
    pub async fn poll<T, F, Fut>(&self, token: CancellationToken, mut check: F) -> Result<T, Error>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<Option<T>, Status>>,
    {
        let mut state = PollState::new(&self.name, self.policy.as_ref(), &self.subscribers);
        loop {
            if token.is_cancelled() {
                return Err(self.cancelled(state.attempt));
            }
            let attempt = state.next_attempt();
            let res = select! {
                biased;
                _ = token.cancelled() => return Err(self.cancelled(attempt)),
                r = check(attempt) => r,
            };

            let delay = match state.on_result(res)? {
                Step::Done(v) => return Ok(v),
                Step::Wait(delay) => delay,
            };
            select! {
                _ = time::sleep(delay) => {}
                _ = token.cancelled() => return Err(self.cancelled(attempt)),
            }
        }
    }

    /// Waits until a consistency check reports `true`.
    pub async fn wait_for_consistency<F, Fut>(
        &self,
        token: CancellationToken,
        mut check: F,
    ) -> Result<(), Error>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<bool, Status>>,
    {
        self.poll(token, |attempt| {
            let fut = check(attempt);
            async move { fut.await.map(|consistent| consistent.then_some(())) }
        })
        .await
    }

    fn cancelled(&self, attempt: u32) -> Error {
        self.subscribers.emit(
            &Event::new(EventKind::OperationCancelled)
                .with_operation(&*self.name)
                .with_attempt(attempt),
        );
        Error::Cancelled
    }
}
