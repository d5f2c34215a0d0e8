//! # cloudretry
//!
//! **cloudretry** is the resilient remote-call layer of a cloud storage and
//! database client. It wraps individual remote operations with configurable
//! retry, backoff and idempotency semantics, waits on long-running operations,
//! and shares OAuth access tokens across threads without redundant refreshes.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   Policies { retry?, backoff?, polling? } ──resolve(&Config)──► ResolvedPolicies
//!                                                                   │ clone_box() per operation
//!            ┌──────────────────────┬────────────────────────┬──────┴──────────────┐
//!            ▼                      ▼                        ▼                     ▼
//!   ┌─────────────────┐   ┌──────────────────┐   ┌──────────────────────┐  ┌──────────────┐
//!   │  RetryExecutor  │   │    AsyncRetry    │   │ poll_until /         │  │  TokenCache  │
//!   │ (blocking loop) │   │ (tokio, cancel)  │   │ AsyncPoller          │  │ (mutex +     │
//!   └────────┬────────┘   └────────┬─────────┘   └──────────┬───────────┘  │  condvar)    │
//!            │                     │                        │              └──────┬───────┘
//!            └─────────────────────┴──── decide(...) ───────┘◄─────────────────────┘
//!                                          │             (refresh uses RetryExecutor)
//!                                          ▼
//!                             SubscriberSet::emit(&Event)
//!                                 ┌────────┼────────┐
//!                                 ▼        ▼        ▼
//!                             LogWriter  metrics  custom
//! ```
//!
//! ### Lifecycle of one logical operation
//! ```text
//! loop {
//!   ├─► attempt += 1 → publish AttemptStarting
//!   ├─► transport(request) ──► Ok  ──► AttemptSucceeded, return
//!   │                          Err ──► AttemptFailed
//!   │       decide(idempotent, retry, status)
//!   │         ├─ permanent status      ─► PermanentFailure, Err(Permanent)
//!   │         ├─ not idempotent        ─► PermanentFailure, Err(NotIdempotent)
//!   │         ├─ budget exhausted      ─► RetryExhausted,   Err(RetryExhausted)
//!   │         └─ retry ─► BackoffScheduled{ delay } → sleep(backoff.on_completion())
//! }
//! ```
//!
//! ## Features
//! | Area              | Description                                                        | Key types / traits                                   |
//! |-------------------|--------------------------------------------------------------------|------------------------------------------------------|
//! | **Policies**      | Retry budgets, exponential backoff, idempotency, polling.          | [`RetryPolicy`], [`BackoffPolicy`], [`PollingPolicy`] |
//! | **Execution**     | Blocking and tokio-driven retry loops sharing one decision.        | [`RetryExecutor`], [`AsyncRetry`], [`decide`]        |
//! | **Polling**       | Long-running operation and consistency waits.                      | [`poll_until`], [`AsyncPoller`]                      |
//! | **Credentials**   | Token refresh shared across threads, credentials files.            | [`TokenCache`], [`Credentials`]                      |
//! | **Integrity**     | Streaming hash validation of transfers.                            | [`HashValidator`]                                    |
//! | **Subscriber API**| Injectable event sinks (logging, metrics, custom).                 | [`Subscribe`], [`SubscriberSet`]                     |
//! | **Errors**        | Transport status and typed terminal errors.                        | [`Status`], [`Error`]                                |
//! | **Configuration** | Defaults and last-wins policy overrides.                           | [`Config`], [`Policies`]                             |
//!
//! ## Optional features
//! - `logging` (default): exports [`LogWriter`], a subscriber forwarding events to `tracing`.
//! - `http`: exports `ReqwestTokenEndpoint` and `google_default_credentials()`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use cloudretry::{
//!     Config, ExponentialBackoffPolicy, LimitedErrorCountRetryPolicy, Policies, RetryExecutor,
//!     Status, Subscribe, SubscriberSet,
//! };
//!
//! // Build subscribers (optional)
//! #[cfg(feature = "logging")]
//! let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(cloudretry::LogWriter::default())];
//! #[cfg(not(feature = "logging"))]
//! let subs: Vec<Arc<dyn Subscribe>> = Vec::new();
//!
//! // Later overrides of the same category win.
//! let policies = Policies::new()
//!     .with_retry(LimitedErrorCountRetryPolicy::new(10))
//!     .with_retry(LimitedErrorCountRetryPolicy::new(3))
//!     .with_backoff(ExponentialBackoffPolicy::new(
//!         Duration::from_millis(1),
//!         Duration::from_millis(10),
//!         2.0,
//!     ))
//!     .resolve(&Config::default());
//!
//! let exec = RetryExecutor::from_policies(&policies).with_subscribers(SubscriberSet::new(subs));
//!
//! let mut calls = 0;
//! let err = exec
//!     .call("GetBucketMetadata", true, |_attempt| -> Result<(), Status> {
//!         calls += 1;
//!         Err(Status::from_http(503, "backend unavailable"))
//!     })
//!     .unwrap_err();
//! assert_eq!(calls, 3);
//! assert_eq!(err.as_label(), "retry_exhausted");
//! ```
mod config;
mod core;
mod credentials;
mod error;
mod events;
mod hash;
mod policies;
mod rpc;
mod subscribers;

// ---- Public re-exports ----

pub use config::{Config, Policies, PolicyOverride, ResolvedPolicies};
pub use crate::core::{
    AsyncPoller, AsyncRetry, OperationHandle, RetryDecision, RetryExecutor, decide, decide_poll,
    poll_until, wait_for_consistency,
};
pub use credentials::{
    AnonymousCredentials, AuthorizedUserCredentials, AuthorizedUserInfo, Credentials,
    CredentialsFile, GOOGLE_ADC_ENV_VAR, GOOGLE_OAUTH_REFRESH_ENDPOINT, HttpResponse,
    ServiceAccountInfo, TokenCache, TokenEndpoint, TokenResponse, adc_path, credentials_from_file,
    google_default_credentials_with,
};
pub use error::{Error, Status, StatusCode};
pub use events::{Event, EventKind};
pub use hash::{HASH_HEADER, HashValidator, HashValues};
pub use policies::{
    BackoffPolicy, ConditionalRequest, ConstantIdempotencyPolicy, ExponentialBackoffPolicy,
    GenericPollingPolicy, IdempotencyPolicy, JitterPolicy, LimitedErrorCountRetryPolicy,
    LimitedTimeRetryPolicy, PollingPolicy, PreconditionIdempotencyPolicy, RetryPolicy,
};
pub use rpc::{Rpc, RpcFn, RpcRef};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: HTTPS token endpoint backed by reqwest.
// Enable with: `--features http`
#[cfg(feature = "http")]
pub use credentials::{ReqwestTokenEndpoint, google_default_credentials};

// Optional: built-in subscriber forwarding events to `tracing`.
// Enabled by default; disable with `default-features = false`.
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
