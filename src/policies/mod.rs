//! Retry, backoff, idempotency and polling policies.
//!
//! This module groups the knobs that decide **whether** an operation may be
//! retried, **when** to give up, and **how long** to wait between attempts.
//!
//! ## Contents
//! - [`RetryPolicy`] budget + retryability (count- or time-bounded)
//! - [`BackoffPolicy`] spacing between attempts (exponential, capped, optional jitter)
//! - [`IdempotencyPolicy`] whether a request may be sent more than once
//! - [`PollingPolicy`] retry + backoff bundle for long-running operation checks
//! - [`JitterPolicy`] randomization strategy to avoid thundering herd
//!
//! ## Quick wiring
//! ```text
//! Policies { retry?, backoff?, polling? } ──resolve(&Config)──► ResolvedPolicies
//!      └─► core::RetryExecutor / core::AsyncRetry:
//!           - retry.clone_box() + backoff.clone_box() per logical operation
//!           - idempotency decided per request at the call-site
//! ```
//!
//! ## Defaults
//! - `LimitedTimeRetryPolicy(15 min)`.
//! - `ExponentialBackoffPolicy(10 ms, 5 min, ×2.0)`, no jitter.
//! - Polling uses the same bounds with its own clones.

mod backoff;
mod idempotency;
mod jitter;
mod polling;
mod retry;

pub use backoff::{BackoffPolicy, ExponentialBackoffPolicy};
pub use idempotency::{
    ConditionalRequest, ConstantIdempotencyPolicy, IdempotencyPolicy,
    PreconditionIdempotencyPolicy,
};
pub use jitter::JitterPolicy;
pub use polling::{GenericPollingPolicy, PollingPolicy};
pub use retry::{LimitedErrorCountRetryPolicy, LimitedTimeRetryPolicy, RetryPolicy};
