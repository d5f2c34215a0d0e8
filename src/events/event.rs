//! # Events emitted by executors, pollers and the token cache.
//!
//! The [`EventKind`] enum classifies events across three categories:
//! - **Attempt events**: one transport call and the decision that followed
//! - **Polling events**: long-running operation checks
//! - **Credential events**: token refresh lifecycle
//!
//! The [`Event`] struct carries additional metadata such as the operation
//! name, attempt number, status code and backoff delay.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are recorded from several threads.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use cloudretry::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::BackoffScheduled)
//!     .with_operation("GetTable")
//!     .with_attempt(2)
//!     .with_delay(Duration::from_millis(20));
//!
//! assert_eq!(ev.kind, EventKind::BackoffScheduled);
//! assert_eq!(ev.operation.as_deref(), Some("GetTable"));
//! assert_eq!(ev.delay_ms, Some(20));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::error::StatusCode;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Attempt events ===
    /// A transport attempt is starting.
    ///
    /// Sets: `operation`, `attempt` (1-based)
    AttemptStarting,

    /// A transport attempt succeeded; the operation completes.
    ///
    /// Sets: `operation`, `attempt`
    AttemptSucceeded,

    /// A transport attempt failed.
    ///
    /// Sets: `operation`, `attempt`, `code`, `reason`
    AttemptFailed,

    /// Next attempt scheduled after a transient failure.
    ///
    /// Sets: `operation`, `attempt` (the failed one), `delay_ms`, `reason`
    BackoffScheduled,

    /// Retry budget consumed; the operation fails with the last status.
    ///
    /// Sets: `operation`, `attempt`, `code`, `reason`
    RetryExhausted,

    /// Failure that retrying cannot fix (permanent code or non-idempotent call).
    ///
    /// Sets: `operation`, `attempt`, `code`, `reason`
    PermanentFailure,

    /// An asynchronous operation was cancelled; no callback will fire.
    ///
    /// Sets: `operation`, `attempt`
    OperationCancelled,

    // === Polling events ===
    /// A check reported the operation as not done yet.
    ///
    /// Sets: `operation`, `attempt`, `delay_ms` (wait before next check)
    PollPending,

    /// A check reported completion.
    ///
    /// Sets: `operation`, `attempt`
    PollCompleted,

    /// Polling budget consumed before completion.
    ///
    /// Sets: `operation`, `attempt`, `reason`
    PollDeadlineExceeded,

    // === Credential events ===
    /// Cached token is stale; this thread performs the refresh.
    TokenRefreshStarting,

    /// A new token was published.
    ///
    /// Sets: `operation`, `delay_ms` (remaining lifetime after slack)
    TokenRefreshed,

    /// Refresh failed; waiters are woken with the error.
    ///
    /// Sets: `operation`, `reason`
    TokenRefreshFailed,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `operation` (subscriber name), `reason`
    SubscriberPanicked,
}

/// Event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the logical operation, if applicable.
    pub operation: Option<Arc<str>>,
    /// Attempt count (starting from 1).
    pub attempt: Option<u32>,
    /// Delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Status code of the failed attempt.
    pub code: Option<StatusCode>,
    /// Human-readable reason (error messages, panic info).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            operation: None,
            attempt: None,
            delay_ms: None,
            code: None,
            reason: None,
        }
    }

    #[inline]
    pub fn with_operation(mut self, operation: impl Into<Arc<str>>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a delay (stored as milliseconds, saturating).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    #[inline]
    pub fn with_code(mut self, code: StatusCode) -> Self {
        self.code = Some(code);
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_operation(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_panic(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberPanicked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::new(EventKind::AttemptStarting);
        let b = Event::new(EventKind::AttemptStarting);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn delay_saturates() {
        let ev = Event::new(EventKind::BackoffScheduled).with_delay(Duration::from_secs(u64::MAX));
        assert_eq!(ev.delay_ms, Some(u32::MAX));
    }
}
