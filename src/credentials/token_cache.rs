//! # TokenCache: shared access-token refresh.
//!
//! Caches the `Authorization` header and its expiration, and refreshes it
//! through a [`TokenEndpoint`] using the same retry machinery as every other
//! call. Many threads may ask for the header at once; only one of them talks
//! to the network.
//!
//! ## State machine
//! ```text
//!            expiration passed / empty
//!   Fresh ───────────────────────────────► Stale
//!     ▲                                      │ first caller flips `refreshing`
//!     │ header + expiration published       ▼
//!     └──────────────────────────────── Refreshing ──► FailedExhausted
//!                                            │            (error handed to
//!        other callers: condvar.wait ◄──────┘             every waiter)
//! ```
//!
//! ## Rules
//! - At most one refresh network call is in flight per cache
//! - The network call happens with the lock released; waiters block on the condvar
//! - Header and expiration are replaced together and only after the response parsed
//! - A failed refresh is reported to the callers that waited for it; the next
//!   caller starts a new refresh

use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use crate::config::{Config, Policies, ResolvedPolicies};
use crate::core::RetryExecutor;
use crate::credentials::endpoint::TokenEndpoint;
use crate::credentials::token::TokenResponse;
use crate::error::{Error, Status};
use crate::events::{Event, EventKind};
use crate::subscribers::SubscriberSet;

const OPERATION: &str = "token_refresh";

#[derive(Debug, Default)]
struct TokenState {
    header: String,
    expiration: Option<SystemTime>,
    refreshing: bool,
    /// Bumped every time a refresh ends, successfully or not.
    generation: u64,
    /// Failure of the refresh that ended at `generation`.
    failure: Option<Error>,
}

impl TokenState {
    fn is_fresh(&self, now: SystemTime) -> bool {
        self.expiration.is_some_and(|exp| now < exp)
    }
}

/// Thread-safe cache of an OAuth access token.
///
/// # Example
/// ```
/// use cloudretry::{Config, HttpResponse, Status, TokenCache};
///
/// let cache = TokenCache::new(
///     |_body: &str| -> Result<HttpResponse, Status> {
///         Ok(HttpResponse::new(
///             200,
///             r#"{"token_type":"Bearer","access_token":"abc","expires_in":3600}"#,
///         ))
///     },
///     "grant_type=refresh_token",
///     &Config::default(),
/// );
/// assert_eq!(cache.authorization_header().unwrap(), "Authorization: Bearer abc");
/// ```
pub struct TokenCache<E: TokenEndpoint> {
    endpoint: E,
    form: String,
    slack: Duration,
    executor: RetryExecutor,
    state: Mutex<TokenState>,
    cv: Condvar,
}

impl<E: TokenEndpoint> fmt::Debug for TokenCache<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCache")
            .field("slack", &self.slack)
            .field("executor", &self.executor)
            .field("expiration", &self.expiration())
            .finish_non_exhaustive()
    }
}

impl<E: TokenEndpoint> TokenCache<E> {
    /// Creates an empty cache; the first [`authorization_header`](Self::authorization_header)
    /// call performs the refresh.
    ///
    /// `form` is the complete form-encoded body posted to `endpoint`.
    pub fn new(endpoint: E, form: impl Into<String>, config: &Config) -> Self {
        Self {
            endpoint,
            form: form.into(),
            slack: config.token_expiration_slack,
            executor: RetryExecutor::from_policies(&Policies::new().resolve(config)),
            state: Mutex::new(TokenState::default()),
            cv: Condvar::new(),
        }
    }

    /// Replaces the retry and backoff prototypes used for refreshes.
    pub fn with_policies(mut self, policies: &ResolvedPolicies) -> Self {
        let subs = self.executor.subscribers().clone();
        self.executor = RetryExecutor::from_policies(policies).with_subscribers(subs);
        self
    }

    /// Attaches the event sink (refresh and per-attempt events).
    pub fn with_subscribers(mut self, subscribers: SubscriberSet) -> Self {
        self.executor = self.executor.with_subscribers(subscribers);
        self
    }

    /// Expiration of the cached token, if one was ever obtained.
    pub fn expiration(&self) -> Option<SystemTime> {
        self.lock().expiration
    }

    /// Returns a valid header, refreshing it first if needed.
    ///
    /// Blocks while another thread refreshes. Callers that waited for a
    /// refresh which failed receive that refresh's error.
    pub fn authorization_header(&self) -> Result<String, Error> {
        let mut st = self.lock();
        loop {
            if st.is_fresh(SystemTime::now()) {
                return Ok(st.header.clone());
            }
            if !st.refreshing {
                break;
            }
            let waited_for = st.generation;
            st = self
                .cv
                .wait_while(st, |s| s.refreshing && s.generation == waited_for)
                .unwrap_or_else(PoisonError::into_inner);
            if st.generation != waited_for {
                if let Some(err) = &st.failure {
                    return Err(err.clone());
                }
            }
        }

        st.refreshing = true;
        drop(st);

        let mut guard = RefreshGuard {
            cache: self,
            done: false,
        };
        let outcome = self.fetch();
        guard.done = true;
        self.publish(outcome)
    }

    /// Runs the retry loop against the endpoint and parses the token.
    ///
    /// Nothing shared is touched here.
    fn fetch(&self) -> Result<(String, SystemTime), Error> {
        self.emit(Event::new(EventKind::TokenRefreshStarting));
        let payload = self.executor.call(OPERATION, true, |_| {
            let resp = self.endpoint.post_form(&self.form)?;
            if resp.is_ok() {
                Ok(resp.payload)
            } else {
                Err(resp.to_status())
            }
        })?;
        let token = TokenResponse::parse(&payload)?;
        let expiration = token.expiration(SystemTime::now(), self.slack);
        Ok((token.authorization_header(), expiration))
    }

    /// Ends the refresh: publishes the outcome and wakes every waiter.
    fn publish(&self, outcome: Result<(String, SystemTime), Error>) -> Result<String, Error> {
        let mut st = self.lock();
        st.refreshing = false;
        st.generation = st.generation.wrapping_add(1);
        let (res, ev) = match outcome {
            Ok((header, expiration)) => {
                st.header = header;
                st.expiration = Some(expiration);
                st.failure = None;
                let valid_for = expiration
                    .duration_since(SystemTime::now())
                    .unwrap_or(Duration::ZERO);
                let ev = Event::new(EventKind::TokenRefreshed).with_delay(valid_for);
                (Ok(st.header.clone()), ev)
            }
            Err(err) => {
                st.failure = Some(err.clone());
                let ev = failed_event(&err);
                (Err(err), ev)
            }
        };
        drop(st);
        self.cv.notify_all();
        self.emit(ev);
        res
    }

    fn lock(&self) -> MutexGuard<'_, TokenState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, ev: Event) {
        self.executor
            .subscribers()
            .emit(&ev.with_operation(OPERATION));
    }
}

fn failed_event(err: &Error) -> Event {
    let ev = Event::new(EventKind::TokenRefreshFailed).with_reason(err.to_string());
    match err.last_status().map(Status::code) {
        Some(code) => ev.with_code(code),
        None => ev,
    }
}

/// Clears `refreshing` if the refresher unwinds before publishing.
struct RefreshGuard<'a, E: TokenEndpoint> {
    cache: &'a TokenCache<E>,
    done: bool,
}

impl<E: TokenEndpoint> Drop for RefreshGuard<'_, E> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let mut st = self.cache.lock();
        st.refreshing = false;
        st.generation = st.generation.wrapping_add(1);
        st.failure = Some(Error::Credentials("token refresh aborted".into()));
        drop(st);
        self.cache.cv.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::endpoint::HttpResponse;
    use crate::policies::{ExponentialBackoffPolicy, LimitedErrorCountRetryPolicy};
    use crate::subscribers::Subscribe;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Barrier};

    const TOKEN: &str = r#"{"token_type":"Bearer","access_token":"tok-1","expires_in":3600}"#;

    fn fast() -> ResolvedPolicies {
        Policies::new()
            .with_retry(LimitedErrorCountRetryPolicy::new(4))
            .with_backoff(ExponentialBackoffPolicy::new(
                Duration::from_millis(1),
                Duration::from_millis(2),
                2.0,
            ))
            .resolve(&Config::default())
    }

    /// Endpoint replaying `responses` in order (the last one repeats).
    fn scripted(
        calls: Arc<AtomicU32>,
        responses: Vec<HttpResponse>,
    ) -> impl Fn(&str) -> Result<HttpResponse, Status> + Send + Sync + 'static {
        move |_body: &str| {
            let n = calls.fetch_add(1, Ordering::SeqCst) as usize;
            Ok(responses[n.min(responses.len() - 1)].clone())
        }
    }

    #[test]
    fn fifty_threads_share_one_refresh() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let cache = TokenCache::new(
            move |_body: &str| -> Result<HttpResponse, Status> {
                c.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(50));
                Ok(HttpResponse::new(200, TOKEN))
            },
            "form",
            &Config::default(),
        );

        let barrier = Barrier::new(50);
        let headers: Vec<String> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..50)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        cache.authorization_header().unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(headers.iter().all(|h| h == "Authorization: Bearer tok-1"));
    }

    #[test]
    fn fresh_token_skips_the_network() {
        let calls = Arc::new(AtomicU32::new(0));
        let cache = TokenCache::new(
            scripted(calls.clone(), vec![HttpResponse::new(200, TOKEN)]),
            "form",
            &Config::default(),
        );
        cache.authorization_header().unwrap();
        for _ in 0..10 {
            cache.authorization_header().unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let exp = cache.expiration().unwrap();
        let lifetime = exp.duration_since(SystemTime::now()).unwrap();
        assert!(lifetime <= Duration::from_secs(3100));
        assert!(lifetime > Duration::from_secs(3000));
    }

    #[test]
    fn lifetime_shorter_than_slack_refreshes_every_time() {
        let calls = Arc::new(AtomicU32::new(0));
        let cache = TokenCache::new(
            scripted(
                calls.clone(),
                vec![HttpResponse::new(
                    200,
                    r#"{"token_type":"Bearer","access_token":"short","expires_in":10}"#,
                )],
            ),
            "form",
            &Config::default(),
        );
        cache.authorization_header().unwrap();
        cache.authorization_header().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn transient_http_errors_are_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let cache = TokenCache::new(
            scripted(
                calls.clone(),
                vec![
                    HttpResponse::new(503, "busy"),
                    HttpResponse::new(500, "oops"),
                    HttpResponse::new(200, TOKEN),
                ],
            ),
            "form",
            &Config::default(),
        )
        .with_policies(&fast());
        assert_eq!(
            cache.authorization_header().unwrap(),
            "Authorization: Bearer tok-1"
        );
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn exhausted_refresh_reports_error_and_next_call_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let cache = TokenCache::new(
            scripted(calls.clone(), vec![HttpResponse::new(503, "down")]),
            "form",
            &Config::default(),
        )
        .with_policies(&fast());
        let err = cache.authorization_header().unwrap_err();
        assert!(matches!(err, Error::RetryExhausted { attempts: 4, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 4);

        let _ = cache.authorization_header();
        assert_eq!(calls.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn malformed_body_is_not_retried_and_keeps_previous_token() {
        let calls = Arc::new(AtomicU32::new(0));
        let cache = TokenCache::new(
            scripted(
                calls.clone(),
                vec![
                    HttpResponse::new(
                        200,
                        r#"{"token_type":"Bearer","access_token":"old","expires_in":1}"#,
                    ),
                    HttpResponse::new(200, "{ not json"),
                ],
            ),
            "form",
            &Config::default(),
        )
        .with_policies(&fast());

        // Lifetime below the slack: cached but immediately stale.
        cache.authorization_header().unwrap();
        let before = cache.expiration();

        let err = cache.authorization_header().unwrap_err();
        assert_eq!(err.as_label(), "credentials");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.expiration(), before);
        assert_eq!(cache.lock().header, "Authorization: Bearer old");
    }

    #[test]
    fn permanent_http_error_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let cache = TokenCache::new(
            scripted(calls.clone(), vec![HttpResponse::new(400, "invalid_grant")]),
            "form",
            &Config::default(),
        )
        .with_policies(&fast());
        let err = cache.authorization_header().unwrap_err();
        assert_eq!(err.as_label(), "permanent");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn waiters_receive_the_failure_they_waited_for() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let cache = TokenCache::new(
            move |_body: &str| -> Result<HttpResponse, Status> {
                c.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(50));
                Ok(HttpResponse::new(403, "denied"))
            },
            "form",
            &Config::default(),
        );

        let barrier = Barrier::new(8);
        let results: Vec<Result<String, Error>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        cache.authorization_header()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(results.iter().all(|r| r.as_ref().is_err_and(|e| e.as_label() == "permanent")));
        assert!(calls.load(Ordering::SeqCst) < 8);
    }

    #[derive(Default)]
    struct Refreshes(Mutex<Vec<Option<u32>>>);

    impl Subscribe for Refreshes {
        fn on_event(&self, event: &Event) {
            if event.kind == EventKind::TokenRefreshed {
                self.0.lock().unwrap().push(event.delay_ms);
            }
        }
        fn name(&self) -> &'static str {
            "refreshes"
        }
    }

    #[test]
    fn refreshed_event_carries_remaining_lifetime() {
        let calls = Arc::new(AtomicU32::new(0));
        let seen = Arc::new(Refreshes::default());
        let cache = TokenCache::new(
            scripted(calls, vec![HttpResponse::new(200, TOKEN)]),
            "form",
            &Config::default(),
        )
        .with_subscribers(SubscriberSet::new(vec![seen.clone() as Arc<dyn Subscribe>]));

        cache.authorization_header().unwrap();

        let seen = seen.0.lock().unwrap();
        assert_eq!(seen.len(), 1);
        // 3600s lifetime minus the default 500s slack.
        let ms = seen[0].unwrap();
        assert!((3_099_000..=3_100_000).contains(&ms), "{ms}");
    }
}
