//! # AsyncRetry: per-operation retry state driven by tokio.
//!
//! One [`AsyncRetry`] owns everything a single logical operation needs:
//! the transport, the request, retry/backoff prototypes and the attempt
//! counter. The prototypes are cloned when [`AsyncRetry::run`] starts, so time
//! budgets count from the first attempt. It is driven either by awaiting [`AsyncRetry::run`] or by spawning
//! it with [`AsyncRetry::start`], which delivers the outcome to a callback.
//!
//! ## Architecture
//! ```text
//! AsyncRetry::start(callback) ──► tokio::spawn ──► run(token)
//!
//! retry, backoff = prototypes.clone_box()
//! loop {
//!   ├─► cancelled? → Err(Cancelled)
//!   ├─► attempt += 1
//!   ├─► run_once_async() ─────► rpc.call(request.clone(), child_token)
//!   │       ▼
//!   │     Ok  → return Ok(response)
//!   │     Err → decide(idempotent, retry, status)
//!   │             ├─ Permanent / NotIdempotent / Exhausted → return Err
//!   │             └─ Retry:
//!   │                  ├─► publish BackoffScheduled
//!   │                  └─► select! { sleep(delay), token.cancelled() → Err(Cancelled) }
//! }
//!
//! start(): Ok/Err ──► callback(result)   (exactly once)
//!          Cancelled ──► OperationCancelled event, callback dropped
//! ```
//!
//! ## Rules
//! - Exactly one transport call is in flight per operation (attempts are sequential)
//! - Cancellation prevents any further attempt and aborts a pending backoff sleep
//! - An in-flight transport call is abandoned on cancel (its token is cancelled; best-effort)
//! - The callback runs at most once and never after cancellation was observed

use std::fmt;
use std::sync::Arc;

use tokio::task::{JoinError, JoinHandle};
use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::config::ResolvedPolicies;
use crate::core::decision::{RetryDecision, decide};
use crate::core::runner::{publish_backoff, publish_cancelled, publish_terminal, run_once_async};
use crate::error::Error;
use crate::policies::{BackoffPolicy, RetryPolicy};
use crate::rpc::Rpc;
use crate::subscribers::SubscriberSet;

/// State of one asynchronous logical operation.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
/// use cloudretry::{
///     AsyncRetry, ExponentialBackoffPolicy, LimitedErrorCountRetryPolicy, RpcFn, Status,
/// };
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let rpc = RpcFn::arc("GetTable", |table: String, _ctx: CancellationToken| async move {
///     Ok::<_, Status>(format!("{table}: ok"))
/// });
///
/// let op = AsyncRetry::new(
///     rpc,
///     "t1".to_string(),
///     true,
///     LimitedErrorCountRetryPolicy::new(3),
///     ExponentialBackoffPolicy::new(Duration::from_millis(1), Duration::from_millis(4), 2.0),
/// );
/// let res = op.run(CancellationToken::new()).await;
/// assert_eq!(res.unwrap(), "t1: ok");
/// # }
/// ```
pub struct AsyncRetry<R: Rpc + ?Sized> {
    rpc: Arc<R>,
    request: R::Request,
    idempotent: bool,
    retry: Box<dyn RetryPolicy>,
    backoff: Box<dyn BackoffPolicy>,
    subscribers: SubscriberSet,
    attempt: u32,
}

impl<R: Rpc + ?Sized> fmt::Debug for AsyncRetry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncRetry")
            .field("rpc", &self.rpc.name())
            .field("idempotent", &self.idempotent)
            .field("attempt", &self.attempt)
            .field("retry", &self.retry)
            .field("backoff", &self.backoff)
            .finish()
    }
}

impl<R: Rpc + ?Sized> AsyncRetry<R> {
    /// Creates the operation state; the policies are kept as prototypes.
    pub fn new(
        rpc: Arc<R>,
        request: R::Request,
        idempotent: bool,
        retry: impl RetryPolicy,
        backoff: impl BackoffPolicy,
    ) -> Self {
        Self {
            rpc,
            request,
            idempotent,
            retry: Box::new(retry),
            backoff: Box::new(backoff),
            subscribers: SubscriberSet::default(),
            attempt: 0,
        }
    }

    /// Creates the operation state from resolved policy prototypes.
    pub fn from_policies(
        rpc: Arc<R>,
        request: R::Request,
        idempotent: bool,
        policies: &ResolvedPolicies,
    ) -> Self {
        Self {
            rpc,
            request,
            idempotent,
            retry: policies.retry.clone_box(),
            backoff: policies.backoff.clone_box(),
            subscribers: SubscriberSet::default(),
            attempt: 0,
        }
    }

    /// Attaches the event sink.
    pub fn with_subscribers(mut self, subscribers: SubscriberSet) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Number of attempts started so far.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    /// Drives the operation to completion, failure, or cancellation.
    ///
    /// ### Cancellation semantics
    /// `token` is checked before each attempt, raced against the in-flight
    /// attempt, and raced against every backoff sleep. Returns
    /// [`Error::Cancelled`] as soon as cancellation is observed.
    pub async fn run(mut self, token: CancellationToken) -> Result<R::Response, Error> {
        let mut retry = self.retry.clone_box();
        let mut backoff = self.backoff.clone_box();
        loop {
            if token.is_cancelled() {
                return Err(self.cancelled());
            }

            self.attempt += 1;
            let attempt = self.attempt;
            let res = select! {
                biased;
                _ = token.cancelled() => return Err(self.cancelled()),
                r = run_once_async(
                    self.rpc.as_ref(),
                    self.request.clone(),
                    &token,
                    attempt,
                    &self.subscribers,
                ) => r,
            };

            let status = match res {
                Ok(v) => return Ok(v),
                Err(st) => st,
            };

            let decision = decide(self.idempotent, retry.as_mut(), &status);
            if let Some(err) = decision.into_error(status.clone(), attempt) {
                publish_terminal(&self.subscribers, self.rpc.name(), attempt, decision, &status);
                return Err(err);
            }
            debug_assert_eq!(decision, RetryDecision::Retry);

            let delay = backoff.on_completion();
            publish_backoff(&self.subscribers, self.rpc.name(), attempt, delay, &status);

            let sleep = time::sleep(delay);
            tokio::pin!(sleep);
            select! {
                _ = &mut sleep => {}
                _ = token.cancelled() => return Err(self.cancelled()),
            }
        }
    }

    fn cancelled(&self) -> Error {
        publish_cancelled(&self.subscribers, self.rpc.name(), self.attempt);
        Error::Cancelled
    }
}

impl<R: Rpc + ?Sized> AsyncRetry<R> {
    /// Spawns the operation on the current tokio runtime.
    ///
    /// `callback` is invoked exactly once with the final result, unless the
    /// operation is cancelled through the returned handle, in which case it is
    /// never invoked.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime (as `tokio::spawn` does).
    pub fn start<C>(self, callback: C) -> OperationHandle
    where
        C: FnOnce(Result<R::Response, Error>) + Send + 'static,
    {
        let token = CancellationToken::new();
        let run_token = token.clone();

        let join = tokio::spawn(async move {
            let res = self.run(run_token.clone()).await;
            if matches!(res, Err(Error::Cancelled)) || run_token.is_cancelled() {
                return;
            }
            callback(res);
        });

        OperationHandle { token, join }
    }
}

/// Handle to an operation started with [`AsyncRetry::start`].
#[derive(Debug)]
pub struct OperationHandle {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl OperationHandle {
    /// Requests cancellation.
    ///
    /// No further attempt starts and a pending backoff is abandoned. A transport
    /// call already in flight is dropped on a best-effort basis. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the operation has finished (callback delivered or suppressed).
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Waits until the operation has finished.
    ///
    /// Returns the task's [`JoinError`] if a policy or the
    /// callback panicked; the callback is then not delivered.
    pub async fn join(self) -> Result<(), JoinError> {
        self.join.await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Status, StatusCode};
    use crate::policies::{
        ExponentialBackoffPolicy, LimitedErrorCountRetryPolicy, LimitedTimeRetryPolicy,
    };
    use crate::rpc::RpcFn;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn backoff(d: Duration) -> ExponentialBackoffPolicy {
        ExponentialBackoffPolicy::new(d, d, 1.0)
    }

    /// Transport failing with `Unavailable` until `ok_at`, counting calls.
    fn flaky(calls: Arc<AtomicU32>, ok_at: u32) -> Arc<impl Rpc<Request = u32, Response = u32>> {
        RpcFn::arc("flaky", move |req: u32, _ctx: CancellationToken| {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n >= ok_at {
                    Ok(req + n)
                } else {
                    Err(Status::unavailable("reset"))
                }
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn run_succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let op = AsyncRetry::new(
            flaky(calls.clone(), 3),
            10,
            true,
            LimitedErrorCountRetryPolicy::new(5),
            backoff(Duration::from_secs(1)),
        );
        let v = op.run(CancellationToken::new()).await.unwrap();
        assert_eq!(v, 13);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn run_exhausts_after_n_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let op = AsyncRetry::new(
            flaky(calls.clone(), u32::MAX),
            0,
            true,
            LimitedErrorCountRetryPolicy::new(4),
            backoff(Duration::from_millis(100)),
        );
        let err = op.run(CancellationToken::new()).await.unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert!(matches!(err, Error::RetryExhausted { attempts: 4, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn non_idempotent_is_attempted_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let op = AsyncRetry::new(
            flaky(calls.clone(), u32::MAX),
            0,
            false,
            LimitedErrorCountRetryPolicy::new(4),
            backoff(Duration::from_millis(100)),
        );
        let err = op.run(CancellationToken::new()).await.unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(err, Error::NotIdempotent { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_error_is_reported_without_retry() {
        let rpc = RpcFn::arc("get", |_: (), _ctx: CancellationToken| async {
            Err::<(), _>(Status::new(StatusCode::NotFound, "no such table"))
        });
        let op = AsyncRetry::new(
            rpc,
            (),
            true,
            LimitedErrorCountRetryPolicy::new(4),
            backoff(Duration::from_millis(100)),
        );
        let err = op.run(CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.attempts(), 1);
        assert_eq!(err.last_status().map(Status::code), Some(StatusCode::NotFound));
    }

    #[tokio::test(start_paused = true)]
    async fn start_delivers_result_exactly_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let (tx, rx) = oneshot::channel();
        let handle = AsyncRetry::new(
            flaky(calls.clone(), 2),
            1,
            true,
            LimitedErrorCountRetryPolicy::new(3),
            backoff(Duration::from_millis(50)),
        )
        .start(move |res| {
            let _ = tx.send(res);
        });

        let res = rx.await.unwrap();
        assert_eq!(res.unwrap(), 3);
        handle.join().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_backoff_stops_attempts_and_drops_callback() {
        let calls = Arc::new(AtomicU32::new(0));
        let delivered = Arc::new(AtomicU32::new(0));
        let d = delivered.clone();

        let handle = AsyncRetry::new(
            flaky(calls.clone(), u32::MAX),
            0,
            true,
            LimitedErrorCountRetryPolicy::new(100),
            backoff(Duration::from_secs(60)),
        )
        .start(move |_| {
            d.fetch_add(1, Ordering::SeqCst);
        });

        // Let the first attempt fail and the backoff sleep begin.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        handle.cancel();
        assert!(handle.is_cancelled());
        handle.join().await.unwrap();

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(delivered.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_token_prevents_first_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let token = CancellationToken::new();
        token.cancel();
        let op = AsyncRetry::new(
            flaky(calls.clone(), 1),
            0,
            true,
            LimitedErrorCountRetryPolicy::new(3),
            backoff(Duration::from_millis(1)),
        );
        assert_eq!(op.run(token).await.unwrap_err(), Error::Cancelled);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn time_budget_starts_at_first_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let op = AsyncRetry::new(
            flaky(calls.clone(), u32::MAX),
            0,
            true,
            LimitedTimeRetryPolicy::new(Duration::from_secs(10)),
            backoff(Duration::from_secs(1)),
        );

        // Idle time between building and running is not charged to the budget.
        tokio::time::sleep(Duration::from_secs(20)).await;
        let started = tokio::time::Instant::now();
        let err = op.run(CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, Error::RetryExhausted { .. }));
        assert!(calls.load(Ordering::SeqCst) >= 10);
        assert!(started.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_inflight_call_drops_callback() {
        let calls = Arc::new(AtomicU32::new(0));
        let delivered = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let d = delivered.clone();

        let rpc = RpcFn::arc("slow", move |_: (), _ctx: CancellationToken| {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<_, Status>(())
            }
        });
        let handle = AsyncRetry::new(
            rpc,
            (),
            true,
            LimitedErrorCountRetryPolicy::new(3),
            backoff(Duration::from_millis(10)),
        )
        .start(move |_| {
            d.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!handle.is_finished());

        handle.cancel();
        handle.join().await.unwrap();

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(delivered.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn join_reports_callback_panic() {
        let calls = Arc::new(AtomicU32::new(0));
        let handle = AsyncRetry::new(
            flaky(calls, 1),
            0,
            true,
            LimitedErrorCountRetryPolicy::new(1),
            backoff(Duration::from_millis(1)),
        )
        .start(|_| panic!("callback failed"));

        let err = handle.join().await.unwrap_err();
        assert!(err.is_panic());
    }
}
